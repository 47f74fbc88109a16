/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Invertible, Matrix, Operator, Result, Shape, Square, Transpose};
use crate::memo::{memoize, require_square, sum_log_abs, triangle};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView2};
use once_cell::sync::OnceCell;
use strumat_linalg as backend;

/// A lower or upper triangular matrix.
#[derive(Debug)]
pub struct Triangular {
    // entries outside the triangle are zeroed on construction
    array: Array2<f64>,
    lower: bool,
}

impl Triangular {
    /// Only the selected triangle of `array` is used.
    pub fn new(array: Array2<f64>, lower: bool) -> Result<Matrix> {
        require_square("triangular matrix", &array.view())?;
        let array = triangle(array.view(), lower);
        Ok(Triangular { array, lower }.into())
    }

    pub fn is_lower(&self) -> bool { self.lower }
}

impl Operator for Triangular {
    fn kind(&self) -> &'static str { "Triangular" }

    fn shape(&self) -> Shape {
        let n = self.array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Ok(Triangular { array: &self.array * scalar, lower: self.lower }.into())
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", lower={}", self.lower)
    }
}

impl Transpose for Triangular {
    fn transpose(&self) -> Result<Matrix> {
        Ok(Triangular { array: self.array.t().to_owned(), lower: !self.lower }.into())
    }
}

impl Square for Triangular {
    fn log_abs_det(&self) -> Result<f64> { Ok(sum_log_abs(self.array.diag().iter().cloned())) }
}

impl Invertible for Triangular {
    fn inv(&self) -> Result<Matrix> {
        Ok(InverseTriangular {
            inverse_array: self.array.clone(),
            lower: self.lower,
            array: OnceCell::new(),
        }.into())
    }
}

//---------------------------------------------------------

/// A triangular matrix specified by its (triangular) inverse.
///
/// Multiplication solves against the inverse rather than forming this matrix.
#[derive(Debug)]
pub struct InverseTriangular {
    inverse_array: Array2<f64>,
    lower: bool,
    array: OnceCell<Array2<f64>>,
}

impl InverseTriangular {
    /// Only the selected triangle of `inverse_array` is used.
    pub fn new(inverse_array: Array2<f64>, lower: bool) -> Result<Matrix> {
        require_square("inverse triangular matrix", &inverse_array.view())?;
        let inverse_array = triangle(inverse_array.view(), lower);
        Ok(InverseTriangular { inverse_array, lower, array: OnceCell::new() }.into())
    }

    pub fn is_lower(&self) -> bool { self.lower }
}

impl Operator for InverseTriangular {
    fn kind(&self) -> &'static str { "InverseTriangular" }

    fn shape(&self) -> Shape {
        let n = self.inverse_array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "inverse triangular array", || {
            self.left_multiply(Array2::eye(self.inverse_array.nrows()).view())
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let backend = backend::current();
        Ok(backend.solve_triangular(self.inverse_array.view(), other, self.lower, false)?)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        // x @ A^-1 == (A^-T @ x^T)^T
        let backend = backend::current();
        let solved = backend.solve_triangular(self.inverse_array.view(), other.t(), self.lower, true)?;
        Ok(solved.reversed_axes())
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Ok(InverseTriangular {
            inverse_array: &self.inverse_array / scalar,
            lower: self.lower,
            array: OnceCell::new(),
        }.into())
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        Ok(self.inverse_array.diag().mapv(|x| 1.0 / x))
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", lower={}", self.lower)
    }
}

impl Transpose for InverseTriangular {
    fn transpose(&self) -> Result<Matrix> {
        Ok(InverseTriangular {
            inverse_array: self.inverse_array.t().to_owned(),
            lower: !self.lower,
            array: OnceCell::new(),
        }.into())
    }
}

impl Square for InverseTriangular {
    fn log_abs_det(&self) -> Result<f64> {
        Ok(-sum_log_abs(self.inverse_array.diag().iter().cloned()))
    }
}

impl Invertible for InverseTriangular {
    fn inv(&self) -> Result<Matrix> {
        Ok(Triangular { array: self.inverse_array.clone(), lower: self.lower }.into())
    }
}
