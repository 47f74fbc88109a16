/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Matrix, Result};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// `(rows, cols)`, where either may be unknown for shape-erased matrices.
pub type Shape = (Option<usize>, Option<usize>);

/// Gradient of a scalar function of a matrix with respect to the parameter that
/// defines the matrix, in the same form as that parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl Gradient {
    pub fn as_scalar(&self) -> Option<f64> {
        match *self {
            Gradient::Scalar(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            Gradient::Vector(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Array2<f64>> {
        match self {
            Gradient::Matrix(x) => Some(x),
            _ => None,
        }
    }
}

/// The contract shared by every matrix.
///
/// Implementations may assume that operands have already been checked against
/// their shape; [`Matrix`] does this before delegating.
pub trait Operator: fmt::Debug + Send + Sync {
    /// Name used in error messages and `Display`.
    fn kind(&self) -> &'static str;

    fn shape(&self) -> Shape;

    /// Dense representation.
    ///
    /// Explicit matrices hand out the array they own; implicit ones build it on
    /// first request and keep it.  Either way, prefer structure-aware operations.
    fn array(&self) -> Result<&Array2<f64>>;

    /// `self @ other`.
    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// `other @ self`.
    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// `scalar * self`, for a nonzero scalar.
    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix>;

    fn diagonal(&self) -> Result<Array1<f64>> {
        Ok(self.array()?.diag().to_owned())
    }

    /// Extra parameters to show after the shape in `Display`.
    fn fmt_params(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result { Ok(()) }
}

/// Matrices whose transpose is a different matrix.
///
/// Symmetric matrices do not need this; their transpose is themselves.
pub trait Transpose: Operator {
    fn transpose(&self) -> Result<Matrix>;
}

pub trait Square: Operator {
    /// Logarithm of the absolute value of the determinant.
    fn log_abs_det(&self) -> Result<f64>;
}

pub trait Invertible: Square {
    /// The inverse, which need not be formed explicitly; many inverses multiply
    /// by solving against their originating matrix.
    fn inv(&self) -> Result<Matrix>;
}

pub trait Symmetric: Square {
    /// Eigenvalues in the order matching the columns of `eigvec`.
    fn eigval(&self) -> Result<Array1<f64>>;

    /// Orthonormal eigenvectors, as the columns of a matrix.
    fn eigvec(&self) -> Result<Matrix>;
}

pub trait PositiveDefinite: Symmetric + Invertible {
    /// Any `R` satisfying `R @ R.T == self`.
    ///
    /// This is generally not the symmetric square root.
    fn sqrt(&self) -> Result<Matrix>;
}

/// Matrices defined as a function of a parameter, which can report gradients
/// of two scalar functions of the matrix with respect to that parameter.
pub trait Differentiable: Invertible {
    /// Gradient of `log |det M|`.
    fn grad_log_abs_det(&self) -> Result<Gradient>;

    /// Gradient of `vector @ M.inv @ vector`.
    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient>;
}
