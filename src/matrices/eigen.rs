/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Symmetric matrices that are handled through their eigendecomposition.

use crate::{Diagonal, Differentiable, Gradient, Invertible, Matrix, Operator, PositiveDefinite, Result, ScaledIdentity, Shape, Square, Symmetric};
use crate::memo::{memoize, memoized_eigen, require_square, sum_log_abs, Eigen};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use once_cell::sync::OnceCell;

/// A dense nonsingular symmetric matrix.
///
/// Symmetry is assumed, not checked.
#[derive(Debug)]
pub struct DenseSymmetric {
    array: Array2<f64>,
    eigen: OnceCell<Eigen>,
}

impl DenseSymmetric {
    pub fn new(array: Array2<f64>) -> Result<Matrix> {
        require_square("dense symmetric matrix", &array.view())?;
        Ok(DenseSymmetric { array, eigen: OnceCell::new() }.into())
    }

    /// With a precomputed eigendecomposition; `eigvec` holds eigenvectors as columns.
    pub fn with_eigen(array: Array2<f64>, eigvec: Matrix, eigval: Array1<f64>) -> Result<Matrix> {
        let n = require_square("dense symmetric matrix", &array.view())?;
        check_eigen(&eigvec, &eigval)?;
        if eigval.len() != n {
            return Err(invalid!("expected {} eigenvalues (got {})", n, eigval.len()));
        }
        Ok(DenseSymmetric::from_parts(array, Some(Eigen { eigval, eigvec })))
    }

    fn from_parts(array: Array2<f64>, eigen: Option<Eigen>) -> Matrix {
        let cell = OnceCell::new();
        if let Some(eigen) = eigen {
            let _ = cell.set(eigen);
        }
        DenseSymmetric { array, eigen: cell }.into()
    }

    fn eigen(&self) -> Result<&Eigen> { memoized_eigen(&self.eigen, || Ok(&self.array)) }
}

impl Operator for DenseSymmetric {
    fn kind(&self) -> &'static str { "DenseSymmetric" }

    fn shape(&self) -> Shape {
        let n = self.array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let eigen = self.eigen.get().map(|eigen| eigen.scaled(scalar));
        Ok(DenseSymmetric::from_parts(&self.array * scalar, eigen))
    }
}

impl Square for DenseSymmetric {
    fn log_abs_det(&self) -> Result<f64> { Ok(sum_log_abs(self.eigen()?.eigval.iter().cloned())) }
}

impl Invertible for DenseSymmetric {
    fn inv(&self) -> Result<Matrix> {
        let eigen = self.eigen()?;
        Eigendecomposed::new(eigen.eigvec.clone(), eigen.eigval.mapv(|x| 1.0 / x))
    }
}

impl Symmetric for DenseSymmetric {
    fn eigval(&self) -> Result<Array1<f64>> { Ok(self.eigen()?.eigval.clone()) }

    fn eigvec(&self) -> Result<Matrix> { Ok(self.eigen()?.eigvec.clone()) }
}

//---------------------------------------------------------

fn check_eigen(eigvec: &Matrix, eigval: &Array1<f64>) -> Result<()> {
    let n = eigval.len();
    match eigvec.shape() {
        (Some(r), Some(c)) if r == n && c == n => Ok(()),
        shape => Err(invalid!("eigenvectors of shape {:?} do not match {} eigenvalues", shape, n)),
    }
}

/// `V @ diag(eigval) @ V.T` for an orthogonal `V` whose columns are eigenvectors.
#[derive(Debug)]
pub struct Eigendecomposed {
    eigvec: Matrix,
    eigval: Array1<f64>,
    positive: bool,
    // ScaledIdentity when all eigenvalues are equal, else Diagonal
    diag_eigval: Matrix,
    array: OnceCell<Array2<f64>>,
}

impl Eigendecomposed {
    /// `eigvec` is trusted to be orthogonal.
    pub fn new(eigvec: Matrix, eigval: Array1<f64>) -> Result<Matrix> {
        Ok(Eigendecomposed::build(eigvec, eigval, false)?.into())
    }

    /// Positive definite; all eigenvalues must be positive.
    pub fn positive(eigvec: Matrix, eigval: Array1<f64>) -> Result<Matrix> {
        Ok(Eigendecomposed::build(eigvec, eigval, true)?.into())
    }

    fn build(eigvec: Matrix, eigval: Array1<f64>, positive: bool) -> Result<Eigendecomposed> {
        check_eigen(&eigvec, &eigval)?;
        if positive && !eigval.iter().all(|&x| x > 0.0) {
            return Err(invalid!("eigenvalues must all be positive"));
        }
        let n = eigval.len();
        let diag_eigval = match eigval.iter().next() {
            Some(&first) if first != 0.0 && eigval.iter().all(|&x| x == first) => {
                ScaledIdentity::new(first, Some(n))?
            },
            _ => Diagonal::new(eigval.clone()),
        };
        Ok(Eigendecomposed { eigvec, eigval, positive, diag_eigval, array: OnceCell::new() })
    }

    pub fn is_positive(&self) -> bool { self.positive }

    fn size(&self) -> usize { self.eigval.len() }
}

impl Operator for Eigendecomposed {
    fn kind(&self) -> &'static str {
        match self.positive {
            true => "EigendecomposedPositiveDefinite",
            false => "EigendecomposedSymmetric",
        }
    }

    fn shape(&self) -> Shape { (Some(self.size()), Some(self.size())) }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "eigendecomposed array", || {
            self.left_multiply(Array2::eye(self.size()).view())
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        // V.T @ x == (x.T @ V).T
        let projected = self.eigvec.rdot(other.t())?.reversed_axes();
        let scaled = self.diag_eigval.dot(projected.view())?;
        self.eigvec.dot(scaled.view())
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let projected = self.eigvec.rdot(other)?;
        let scaled = self.diag_eigval.rdot(projected.view())?;
        Ok(self.eigvec.dot(scaled.t())?.reversed_axes())
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let positive = self.positive && scalar > 0.0;
        Ok(Eigendecomposed::build(self.eigvec.clone(), &self.eigval * scalar, positive)?.into())
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        let eigvec = self.eigvec.array()?;
        Ok((eigvec * eigvec).dot(&self.eigval))
    }
}

impl Square for Eigendecomposed {
    fn log_abs_det(&self) -> Result<f64> { Ok(sum_log_abs(self.eigval.iter().cloned())) }
}

impl Invertible for Eigendecomposed {
    fn inv(&self) -> Result<Matrix> {
        let eigval = self.eigval.mapv(|x| 1.0 / x);
        Ok(Eigendecomposed::build(self.eigvec.clone(), eigval, self.positive)?.into())
    }
}

impl Symmetric for Eigendecomposed {
    fn eigval(&self) -> Result<Array1<f64>> { Ok(self.eigval.clone()) }

    fn eigvec(&self) -> Result<Matrix> { Ok(self.eigvec.clone()) }
}

impl PositiveDefinite for Eigendecomposed {
    /// The symmetric square root.
    fn sqrt(&self) -> Result<Matrix> {
        Eigendecomposed::positive(self.eigvec.clone(), self.eigval.mapv(f64::sqrt))
    }
}

//---------------------------------------------------------

/// A positive definite matrix made from a symmetric one by passing its eigenvalues
/// through a smooth approximation to the absolute value,
///
/// ```text
/// softabs(x) = x / tanh(coeff * x)
/// ```
///
/// which tends to `|x|` as `coeff * |x|` grows and to `1 / coeff` as `x` shrinks.
/// The matrix is parameterised by the symmetric array.
#[derive(Debug)]
pub struct SoftAbsRegularised {
    softabs_coeff: f64,
    unreg_eigval: Array1<f64>,
    inner: Eigendecomposed,
}

impl SoftAbsRegularised {
    /// Only the lower triangle of `symmetric_array` is read.
    pub fn new(symmetric_array: Array2<f64>, softabs_coeff: f64) -> Result<Matrix> {
        if !(softabs_coeff > 0.0) {
            return Err(invalid!("softabs_coeff must be positive (got {})", softabs_coeff));
        }
        require_square("softabs parameter", &symmetric_array.view())?;
        let Eigen { eigval: unreg_eigval, eigvec } = Eigen::from_backend(symmetric_array.view())?;
        let eigval = unreg_eigval.mapv(|x| softabs(x, softabs_coeff));
        let inner = Eigendecomposed::build(eigvec, eigval, true)?;
        Ok(SoftAbsRegularised { softabs_coeff, unreg_eigval, inner }.into())
    }

    pub fn softabs_coeff(&self) -> f64 { self.softabs_coeff }

    pub fn softabs(&self, x: f64) -> f64 { softabs(x, self.softabs_coeff) }

    /// Derivative of `softabs`.
    pub fn grad_softabs(&self, x: f64) -> f64 { grad_softabs(x, self.softabs_coeff) }

}

fn softabs(x: f64, coeff: f64) -> f64 {
    match x * coeff {
        y if y == 0.0 => 1.0 / coeff,
        y => x / y.tanh(),
    }
}

fn grad_softabs(x: f64, coeff: f64) -> f64 {
    let y = x * coeff;
    match y.abs() {
        // series expansion; the closed form cancels catastrophically here
        a if a < 1e-3 => 2.0 * y / 3.0 - 4.0 * y.powi(3) / 45.0,
        _ => 1.0 / y.tanh() - y / y.sinh().powi(2),
    }
}

impl Operator for SoftAbsRegularised {
    fn kind(&self) -> &'static str { "SoftAbsRegularisedPositiveDefinite" }

    fn shape(&self) -> Shape { self.inner.shape() }

    fn array(&self) -> Result<&Array2<f64>> { self.inner.array() }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { self.inner.left_multiply(other) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { self.inner.right_multiply(other) }

    /// The result is a plain eigendecomposed matrix; it is no longer a function of
    /// the original parameter.
    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> { self.inner.scalar_multiply(scalar) }

    fn diagonal(&self) -> Result<Array1<f64>> { self.inner.diagonal() }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", softabs_coeff={}", self.softabs_coeff)
    }
}

impl Square for SoftAbsRegularised {
    fn log_abs_det(&self) -> Result<f64> { self.inner.log_abs_det() }
}

impl Invertible for SoftAbsRegularised {
    fn inv(&self) -> Result<Matrix> { self.inner.inv() }
}

impl Symmetric for SoftAbsRegularised {
    fn eigval(&self) -> Result<Array1<f64>> { self.inner.eigval() }

    fn eigvec(&self) -> Result<Matrix> { self.inner.eigvec() }
}

impl PositiveDefinite for SoftAbsRegularised {
    fn sqrt(&self) -> Result<Matrix> { self.inner.sqrt() }
}

impl Differentiable for SoftAbsRegularised {
    /// Gradient with respect to the symmetric array.
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        let grad_eigval = &self.unreg_eigval.mapv(|x| self.grad_softabs(x)) / &self.inner.eigval;
        let grad = Eigendecomposed::build(self.inner.eigvec.clone(), grad_eigval, false)?;
        Ok(Gradient::Matrix(grad.array()?.clone()))
    }

    /// Gradient with respect to the symmetric array.
    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        let eigval = &self.inner.eigval;
        let unreg = &self.unreg_eigval;
        let n = eigval.len();

        // divided differences of softabs, falling back to its derivative on ties
        let j_mtx = Array2::from_shape_fn((n, n), |(i, j)| match unreg[i] - unreg[j] {
            d if d == 0.0 => self.grad_softabs(unreg[i]),
            d => (eigval[i] - eigval[j]) / d,
        });

        let e_vct = &self.inner.eigvec.rdot_vec(vector)? / eigval;
        let e_col = e_vct.view().insert_axis(Axis(1));
        let e_row = e_vct.view().insert_axis(Axis(0));
        let inner = &(&e_col * &e_row) * &j_mtx;

        let eigvec = &self.inner.eigvec;
        let left = eigvec.dot(inner.view())?;
        let grad = eigvec.dot(left.t())?.reversed_axes();
        Ok(Gradient::Matrix(-grad))
    }
}

#[cfg(test)]
mod tests {
    use crate::{DenseSymmetric, Eigendecomposed, Orthogonal, SoftAbsRegularised};
    use crate::test_util::{random_array, random_orthogonal, random_symmetric, rng};
    use ndarray::{arr1, Array2};

    #[test]
    fn dense_symmetric_inverse() {
        let mut rng = rng(70);
        let a = random_symmetric(&mut rng, 4) + Array2::<f64>::eye(4) * 0.5;
        let m = DenseSymmetric::new(a.clone()).unwrap();
        assert!(m.is_symmetric());
        assert!(!m.is_positive_definite());

        let inv = m.inv().unwrap();
        assert_eq!(inv.kind(), "EigendecomposedSymmetric");
        assert_close!(abs=1e-9, inv.dot(a.view()).unwrap(), Array2::<f64>::eye(4));
        assert_close!(abs=1e-9, inv.rdot(a.view()).unwrap(), Array2::<f64>::eye(4));

        let lu = strumat_linalg::current().lu_factor(a.view()).unwrap();
        let expected: f64 = lu.u_diagonal().iter().map(|x| x.abs().ln()).sum();
        assert_close!(rel=1e-10, m.log_abs_det().unwrap(), expected);
        assert_close!(rel=1e-10, inv.log_abs_det().unwrap(), -expected);
    }

    #[test]
    fn dense_symmetric_keeps_computed_eigen_when_scaled() {
        let mut rng = rng(71);
        let a = random_symmetric(&mut rng, 3);
        let m = DenseSymmetric::new(a.clone()).unwrap();
        let eigvec = m.eigvec().unwrap();
        let scaled = m.scale(-2.0).unwrap();
        assert!(scaled.eigvec().unwrap().ptr_eq(&eigvec));
        assert_close!(abs=1e-12, scaled.eigval().unwrap(), m.eigval().unwrap() * -2.0);
    }

    #[test]
    fn dense_symmetric_with_eigen() {
        let mut rng = rng(72);
        let q = random_orthogonal(&mut rng, 3);
        let eigval = arr1(&[1.0, -2.0, 3.0]);
        let a = q.dot(&Array2::from_diag(&eigval)).dot(&q.t());
        let eigvec = Orthogonal::new(q).unwrap();
        let m = DenseSymmetric::with_eigen(a, eigvec.clone(), eigval.clone()).unwrap();
        assert!(m.eigvec().unwrap().ptr_eq(&eigvec));
        assert_close!(m.log_abs_det().unwrap(), 6f64.ln());
        assert!(DenseSymmetric::with_eigen(Array2::eye(2), eigvec, eigval).is_err());
    }

    #[test]
    fn eigendecomposed_matches_dense() {
        let mut rng = rng(73);
        let q = random_orthogonal(&mut rng, 4);
        let eigval = arr1(&[0.5, 1.0, 2.0, 3.0]);
        let dense = q.dot(&Array2::from_diag(&eigval)).dot(&q.t());
        let m = Eigendecomposed::positive(Orthogonal::new(q).unwrap(), eigval).unwrap();
        assert_eq!(m.kind(), "EigendecomposedPositiveDefinite");

        let x = random_array(&mut rng, (4, 3));
        assert_close!(abs=1e-10, m.array().unwrap().view(), dense.view());
        assert_close!(abs=1e-10, m.dot(x.view()).unwrap(), dense.dot(&x));
        assert_close!(abs=1e-10, m.rdot(x.t()).unwrap(), x.t().dot(&dense));
        assert_close!(abs=1e-10, m.diagonal().unwrap(), dense.diag());
        assert_close!(abs=1e-9, m.inv().unwrap().dot(dense.view()).unwrap(), Array2::<f64>::eye(4));

        let sqrt = m.sqrt().unwrap();
        let rebuilt = sqrt.dot(sqrt.transpose().unwrap().array().unwrap().view()).unwrap();
        assert_close!(abs=1e-10, rebuilt, dense.view());
    }

    #[test]
    fn eigendecomposed_positivity() {
        let mut rng = rng(74);
        let q = Orthogonal::new(random_orthogonal(&mut rng, 2)).unwrap();
        assert!(Eigendecomposed::positive(q.clone(), arr1(&[1.0, -1.0])).is_err());
        assert!(Eigendecomposed::positive(q.clone(), arr1(&[1.0])).is_err());

        let m = Eigendecomposed::positive(q.clone(), arr1(&[1.0, 2.0])).unwrap();
        assert!(m.scale(3.0).unwrap().is_positive_definite());
        assert!(!m.scale(-3.0).unwrap().is_positive_definite());
        assert!(!Eigendecomposed::new(q, arr1(&[1.0, 2.0])).unwrap().is_positive_definite());
    }

    #[test]
    fn repeated_eigenvalues() {
        let mut rng = rng(75);
        let q = random_orthogonal(&mut rng, 3);
        let m = Eigendecomposed::new(Orthogonal::new(q).unwrap(), arr1(&[-2.0, -2.0, -2.0])).unwrap();
        assert_close!(abs=1e-10, m.array().unwrap().view(), Array2::<f64>::eye(3) * -2.0);
        assert_close!(m.log_abs_det().unwrap(), 3.0 * 2f64.ln());
    }

    #[test]
    fn softabs_limits() {
        let m = SoftAbsRegularised::new(Array2::eye(2), 1e6).unwrap();
        let m = match &m {
            crate::Matrix::SoftAbsRegularised(m) => m.clone(),
            other => panic!("unexpected: {}", other),
        };
        assert_close!(rel=1e-2, m.softabs(1e-8), 1e-6);
        assert_close!(rel=1e-4, m.softabs(10.0), 10.0);
        assert_close!(rel=1e-4, m.softabs(-10.0), 10.0);
        assert_eq!(m.softabs(0.0), 1e-6);
        assert_eq!(m.grad_softabs(0.0), 0.0);
        assert_close!(rel=1e-10, m.grad_softabs(10.0), 1.0);
        assert_close!(rel=1e-10, m.grad_softabs(-10.0), -1.0);
    }

    #[test]
    fn softabs_grad_matches_finite_difference() {
        let m = SoftAbsRegularised::new(Array2::eye(1), 1.5).unwrap();
        let m = match &m {
            crate::Matrix::SoftAbsRegularised(m) => m.clone(),
            other => panic!("unexpected: {}", other),
        };
        for &x in &[-1.0, -1e-4, 1e-4, 0.3, 2.0] {
            let numerical = crate::numerical::slope(1e-5, None, x, |x| m.softabs(x));
            assert_close!(rel=1e-6, abs=1e-9, m.grad_softabs(x), numerical);
        }
    }

    #[test]
    fn softabs_is_positive_definite() {
        let mut rng = rng(76);
        let a = random_symmetric(&mut rng, 4);
        let m = SoftAbsRegularised::new(a.clone(), 3.0).unwrap();
        assert!(m.is_positive_definite());
        assert!(m.is_differentiable());
        assert!(m.eigval().unwrap().iter().all(|&x| x > 0.0));
        assert_eq!(m.to_string(), "SoftAbsRegularisedPositiveDefinite(shape=(4, 4), softabs_coeff=3)");

        let scaled = m.scale(2.0).unwrap();
        assert_eq!(scaled.kind(), "EigendecomposedPositiveDefinite");
        assert!(SoftAbsRegularised::new(a, 0.0).is_err());
    }
}
