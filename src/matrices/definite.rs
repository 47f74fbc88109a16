/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Definite matrices backed by a triangular factorization `M = sign * F @ F.T`.

use crate::{Differentiable, Gradient, Identity, Invertible, Matrix, Operator, PositiveDefinite, Result, Shape, Square, Symmetric};
use crate::{DenseRectangular, Triangular};
use crate::memo::{memoize, memoized_eigen, outer, require_square, triangle, Eigen};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use once_cell::sync::OnceCell;
use strumat_linalg as backend;

fn check_sign(sign: f64) -> Result<f64> {
    match sign {
        s if s == 1.0 || s == -1.0 => Ok(s),
        s => Err(invalid!("sign must be +1 or -1 (got {})", s)),
    }
}

/// Whether `factor` is lower triangular, or an error if it is not triangular.
fn factor_triangle(factor: &Matrix) -> Result<bool> {
    match factor {
        Matrix::Triangular(f) => Ok(f.is_lower()),
        Matrix::InverseTriangular(f) => Ok(f.is_lower()),
        other => Err(invalid!("factor must be triangular (got {})", other)),
    }
}

/// `sign * F @ F.T` for a triangular `F`, parameterised by `F`.
///
/// Positive definite when `sign == +1` and negative definite when `sign == -1`,
/// assuming `F` is nonsingular.  With a lower triangular `F` and positive sign
/// this is a Cholesky factorization.
#[derive(Debug)]
pub struct TriangularFactoredDefinite {
    factor: Matrix,
    lower: bool,
    sign: f64,
    array: OnceCell<Array2<f64>>,
    eigen: OnceCell<Eigen>,
}

impl TriangularFactoredDefinite {
    /// `factor` must be a `Triangular` or `InverseTriangular` matrix.
    pub fn new(factor: Matrix, sign: f64) -> Result<Matrix> {
        let lower = factor_triangle(&factor)?;
        let sign = check_sign(sign)?;
        Ok(TriangularFactoredDefinite::from_parts(factor, lower, sign))
    }

    /// `F @ F.T`.
    pub fn positive(factor: Matrix) -> Result<Matrix> {
        TriangularFactoredDefinite::new(factor, 1.0)
    }

    /// Factor given as a dense array, of which only one triangle is used.
    pub fn from_array(factor: Array2<f64>, lower: bool, sign: f64) -> Result<Matrix> {
        TriangularFactoredDefinite::new(Triangular::new(factor, lower)?, sign)
    }

    fn from_parts(factor: Matrix, lower: bool, sign: f64) -> Matrix {
        TriangularFactoredDefinite {
            factor, lower, sign,
            array: OnceCell::new(),
            eigen: OnceCell::new(),
        }.into()
    }

    pub fn factor(&self) -> &Matrix { &self.factor }

    pub fn is_positive(&self) -> bool { self.sign > 0.0 }
}

impl Operator for TriangularFactoredDefinite {
    fn kind(&self) -> &'static str {
        match self.is_positive() {
            true => "TriangularFactoredPositiveDefinite",
            false => "TriangularFactoredDefinite",
        }
    }

    fn shape(&self) -> Shape { self.factor.shape() }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "triangular factored array", || {
            let factor_t = self.factor.array()?.t();
            Ok(self.factor.dot(factor_t)? * self.sign)
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let inner = self.factor.transpose()?.dot(other)?;
        Ok(self.factor.dot(inner.view())? * self.sign)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let inner = self.factor.rdot(other)?;
        Ok(self.factor.transpose()?.rdot(inner.view())? * self.sign)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let factor = self.factor.scale(scalar.abs().sqrt())?;
        Ok(TriangularFactoredDefinite::from_parts(factor, self.lower, self.sign * scalar.signum()))
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", sign={}", self.sign)
    }
}

impl Square for TriangularFactoredDefinite {
    fn log_abs_det(&self) -> Result<f64> { Ok(2.0 * self.factor.log_abs_det()?) }
}

impl Invertible for TriangularFactoredDefinite {
    fn inv(&self) -> Result<Matrix> {
        let factor = self.factor.inv()?.transpose()?;
        Ok(TriangularFactoredDefinite::from_parts(factor, !self.lower, self.sign))
    }
}

impl Symmetric for TriangularFactoredDefinite {
    fn eigval(&self) -> Result<Array1<f64>> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigval.clone())
    }

    fn eigvec(&self) -> Result<Matrix> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigvec.clone())
    }
}

impl PositiveDefinite for TriangularFactoredDefinite {
    fn sqrt(&self) -> Result<Matrix> { Ok(self.factor.clone()) }
}

impl Differentiable for TriangularFactoredDefinite {
    /// Gradient with respect to the factor.
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        let grad_diag = self.factor.diagonal()?.mapv(|x| 2.0 / x);
        Ok(Gradient::Matrix(Array2::from_diag(&grad_diag)))
    }

    /// Gradient with respect to the factor.
    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        // with b = F^-1 v and a = F^-T b = (F F^T)^-1 v,
        //   v^T M^-1 v = sign * b^T b,  whose gradient is  -2 * sign * a b^T
        let factor_inv = self.factor.inv()?;
        let b = factor_inv.dot_vec(vector)?;
        let a = factor_inv.transpose()?.dot_vec(b.view())?;
        let grad = triangle(outer(a.view(), b.view()).view(), self.lower) * (-2.0 * self.sign);
        Ok(Gradient::Matrix(grad))
    }
}

//---------------------------------------------------------

/// A definite matrix given by its dense array.
///
/// Definiteness is trusted rather than checked; a matrix given the wrong sign only
/// fails once something asks for its Cholesky factor.
#[derive(Debug)]
pub struct DenseDefinite {
    array: Array2<f64>,
    sign: f64,
    factor: OnceCell<Matrix>,
    eigen: OnceCell<Eigen>,
}

impl DenseDefinite {
    pub fn new(array: Array2<f64>, positive: bool) -> Result<Matrix> {
        Ok(DenseDefinite::build(array, positive, None)?.into())
    }

    pub fn positive(array: Array2<f64>) -> Result<Matrix> { DenseDefinite::new(array, true) }

    /// With a precomputed triangular factor satisfying `array == ±factor @ factor.T`.
    pub fn with_factor(array: Array2<f64>, factor: Matrix, positive: bool) -> Result<Matrix> {
        Ok(DenseDefinite::build(array, positive, Some(factor))?.into())
    }

    fn build(array: Array2<f64>, positive: bool, factor: Option<Matrix>) -> Result<DenseDefinite> {
        let n = require_square("dense definite matrix", &array.view())?;
        let cell = OnceCell::new();
        if let Some(factor) = factor {
            factor_triangle(&factor)?;
            if factor.shape() != (Some(n), Some(n)) {
                return Err(invalid!("factor has shape {:?}, expected {}x{}", factor.shape(), n, n));
            }
            let _ = cell.set(factor);
        }
        Ok(DenseDefinite {
            array,
            sign: if positive { 1.0 } else { -1.0 },
            factor: cell,
            eigen: OnceCell::new(),
        })
    }

    pub fn is_positive(&self) -> bool { self.sign > 0.0 }

    /// Lower triangular `F` with `self == sign * F @ F.T`, computed on first use.
    pub fn factor(&self) -> Result<&Matrix> {
        memoize(&self.factor, "cholesky factor", || {
            let signed = &self.array * self.sign;
            let chol = backend::current().cholesky(signed.view())?;
            Triangular::new(chol, true)
        })
    }
}

impl Operator for DenseDefinite {
    fn kind(&self) -> &'static str {
        match self.is_positive() {
            true => "DensePositiveDefinite",
            false => "DenseDefinite",
        }
    }

    fn shape(&self) -> Shape {
        let n = self.array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let positive = (scalar > 0.0) == self.is_positive();
        let factor = match self.factor.get() {
            Some(factor) => Some(factor.scale(scalar.abs().sqrt())?),
            None => None,
        };
        Ok(DenseDefinite::build(&self.array * scalar, positive, factor)?.into())
    }
}

impl Square for DenseDefinite {
    fn log_abs_det(&self) -> Result<f64> { Ok(2.0 * self.factor()?.log_abs_det()?) }
}

impl Invertible for DenseDefinite {
    fn inv(&self) -> Result<Matrix> {
        TriangularFactoredDefinite::new(self.factor()?.inv()?.transpose()?, self.sign)
    }
}

impl Symmetric for DenseDefinite {
    fn eigval(&self) -> Result<Array1<f64>> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigval.clone())
    }

    fn eigvec(&self) -> Result<Matrix> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigvec.clone())
    }
}

impl PositiveDefinite for DenseDefinite {
    fn sqrt(&self) -> Result<Matrix> { Ok(self.factor()?.clone()) }
}

impl Differentiable for DenseDefinite {
    /// Gradient with respect to the array.
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        Ok(Gradient::Matrix(self.inv()?.array()?.clone()))
    }

    /// Gradient with respect to the array.
    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        let inv_vector = self.inv()?.dot_vec(vector)?;
        Ok(Gradient::Matrix(-outer(inv_vector.view(), inv_vector.view())))
    }
}

//---------------------------------------------------------

/// `R @ P @ R.T` for a rectangular `R` with more columns than rows and a positive
/// definite `P`, parameterised by `R`.
///
/// Positive definite provided `R` has full row rank.
#[derive(Debug)]
pub struct DensePositiveDefiniteProduct {
    rect: Matrix,
    inner: Matrix,
    dense: DenseDefinite,
}

impl DensePositiveDefiniteProduct {
    /// `inner` defaults to the identity.
    pub fn new(rect: Matrix, inner: Option<Matrix>) -> Result<Matrix> {
        let (rows, cols) = match rect.shape() {
            (Some(r), Some(c)) => (r, c),
            _ => return Err(crate::MatrixError::ImplicitSize { what: "product factor" }),
        };
        if !(rows < cols) {
            return Err(invalid!("rect_matrix must have more columns than rows (got {}x{})", rows, cols));
        }
        let inner = inner.unwrap_or_else(|| Identity::new(Some(cols)));
        if !inner.is_positive_definite() {
            return Err(invalid!("inner matrix must be positive definite (got {})", inner));
        }
        if inner.shape() != (Some(cols), Some(cols)) {
            return Err(invalid!("inner matrix must be {0}x{0} (got {1})", cols, inner));
        }

        let rect_t = rect.transpose()?;
        let array = rect.dot(inner.dot(rect_t.array()?.view())?.view())?;
        let dense = DenseDefinite::build(array, true, None)?;
        Ok(DensePositiveDefiniteProduct { rect, inner, dense }.into())
    }

    pub fn from_array(rect: Array2<f64>, inner: Option<Matrix>) -> Result<Matrix> {
        DensePositiveDefiniteProduct::new(DenseRectangular::new(rect), inner)
    }
}

impl Operator for DensePositiveDefiniteProduct {
    fn kind(&self) -> &'static str { "DensePositiveDefiniteProduct" }

    fn shape(&self) -> Shape { self.dense.shape() }

    fn array(&self) -> Result<&Array2<f64>> { self.dense.array() }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { self.dense.left_multiply(other) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { self.dense.right_multiply(other) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> { self.dense.scalar_multiply(scalar) }
}

impl Square for DensePositiveDefiniteProduct {
    fn log_abs_det(&self) -> Result<f64> { self.dense.log_abs_det() }
}

impl Invertible for DensePositiveDefiniteProduct {
    fn inv(&self) -> Result<Matrix> { self.dense.inv() }
}

impl Symmetric for DensePositiveDefiniteProduct {
    fn eigval(&self) -> Result<Array1<f64>> { self.dense.eigval() }

    fn eigvec(&self) -> Result<Matrix> { self.dense.eigvec() }
}

impl PositiveDefinite for DensePositiveDefiniteProduct {
    fn sqrt(&self) -> Result<Matrix> { self.dense.sqrt() }
}

impl Differentiable for DensePositiveDefiniteProduct {
    /// Gradient with respect to the rectangular factor.
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        let rect_inner = self.inner.rdot(self.rect.array()?.view())?;
        Ok(Gradient::Matrix(self.inv()?.dot(rect_inner.view())? * 2.0))
    }

    /// Gradient with respect to the rectangular factor.
    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        let inv_vector = self.inv()?.dot_vec(vector)?;
        let right = self.inner.dot_vec(self.rect.transpose()?.dot_vec(inv_vector.view())?.view())?;
        Ok(Gradient::Matrix(outer(inv_vector.view(), right.view()) * -2.0))
    }
}
