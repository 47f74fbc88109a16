/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Differentiable, Invertible, Operator, PositiveDefinite, Square, Symmetric, Transpose};
use crate::{Gradient, MatrixError, Result, Shape};
use crate::{BlockColumn, BlockDiagonal, BlockRow, DenseRectangular};
use crate::{DenseDefinite, DensePositiveDefiniteProduct, TriangularFactoredDefinite};
use crate::{DenseSquare, InverseLuFactoredSquare};
use crate::{DenseSymmetric, Eigendecomposed, SoftAbsRegularised};
use crate::{Diagonal, Identity, ScaledIdentity};
use crate::{InverseTriangular, Triangular};
use crate::{Orthogonal, ScaledOrthogonal};
use crate::{LowRankUpdate, Product};
use crate::memo::fmt_shape;

use std::fmt;
use std::ops::{Div, Mul, Neg};
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

macro_rules! matrix_variants {
    ($($Variant:ident,)*) => {
        /// A structured matrix.
        ///
        /// Each variant holds a shared handle to one kind of structure, so clones are
        /// cheap and share any memoized factorizations.  Capabilities beyond the
        /// basic [`Operator`] contract are resolved per variant; asking a matrix for
        /// something its structure does not support is a `MissingCapability` error.
        #[derive(Debug, Clone)]
        pub enum Matrix {
            $($Variant(Arc<$Variant>),)*
        }

        $(
            impl From<$Variant> for Matrix {
                fn from(m: $Variant) -> Matrix { Matrix::$Variant(Arc::new(m)) }
            }
        )*

        impl Matrix {
            fn as_operator(&self) -> &dyn Operator {
                match self {
                    $(Matrix::$Variant(m) => &**m as &dyn Operator,)*
                }
            }

            /// Whether both handles refer to the very same matrix.
            ///
            /// This is identity, not equality; equal values built separately are not
            /// `ptr_eq`.
            pub fn ptr_eq(&self, other: &Matrix) -> bool {
                match (self, other) {
                    $((Matrix::$Variant(a), Matrix::$Variant(b)) => Arc::ptr_eq(a, b),)*
                    _ => false,
                }
            }
        }
    };
}

matrix_variants! {
    Identity,
    ScaledIdentity,
    Diagonal,
    Triangular,
    InverseTriangular,
    Orthogonal,
    ScaledOrthogonal,
    TriangularFactoredDefinite,
    DenseDefinite,
    DensePositiveDefiniteProduct,
    DenseSquare,
    InverseLuFactoredSquare,
    DenseSymmetric,
    Eigendecomposed,
    SoftAbsRegularised,
    BlockDiagonal,
    DenseRectangular,
    BlockRow,
    BlockColumn,
    LowRankUpdate,
    Product,
}

// capability resolution
impl Matrix {
    fn as_transpose(&self) -> Option<&dyn Transpose> {
        let out: &dyn Transpose = match self {
            Matrix::Triangular(m) => &**m,
            Matrix::InverseTriangular(m) => &**m,
            Matrix::Orthogonal(m) => &**m,
            Matrix::ScaledOrthogonal(m) => &**m,
            Matrix::DenseSquare(m) => &**m,
            Matrix::InverseLuFactoredSquare(m) => &**m,
            Matrix::BlockDiagonal(m) => &**m,
            Matrix::DenseRectangular(m) => &**m,
            Matrix::BlockRow(m) => &**m,
            Matrix::BlockColumn(m) => &**m,
            Matrix::LowRankUpdate(m) => &**m,
            Matrix::Product(m) => &**m,
            _ => return None,
        };
        Some(out)
    }

    fn as_square(&self) -> Option<&dyn Square> {
        let out: &dyn Square = match self {
            Matrix::Identity(m) => &**m,
            Matrix::ScaledIdentity(m) => &**m,
            Matrix::Diagonal(m) => &**m,
            Matrix::Triangular(m) => &**m,
            Matrix::InverseTriangular(m) => &**m,
            Matrix::Orthogonal(m) => &**m,
            Matrix::ScaledOrthogonal(m) => &**m,
            Matrix::TriangularFactoredDefinite(m) => &**m,
            Matrix::DenseDefinite(m) => &**m,
            Matrix::DensePositiveDefiniteProduct(m) => &**m,
            Matrix::DenseSquare(m) => &**m,
            Matrix::InverseLuFactoredSquare(m) => &**m,
            Matrix::DenseSymmetric(m) => &**m,
            Matrix::Eigendecomposed(m) => &**m,
            Matrix::SoftAbsRegularised(m) => &**m,
            Matrix::BlockDiagonal(m) => &**m,
            Matrix::LowRankUpdate(m) => &**m,
            Matrix::DenseRectangular(_) |
            Matrix::BlockRow(_) |
            Matrix::BlockColumn(_) |
            Matrix::Product(_) => return None,
        };
        Some(out)
    }

    fn as_invertible(&self) -> Option<&dyn Invertible> {
        let out: &dyn Invertible = match self {
            Matrix::Identity(m) => &**m,
            Matrix::ScaledIdentity(m) => &**m,
            Matrix::Diagonal(m) => &**m,
            Matrix::Triangular(m) => &**m,
            Matrix::InverseTriangular(m) => &**m,
            Matrix::Orthogonal(m) => &**m,
            Matrix::ScaledOrthogonal(m) => &**m,
            Matrix::TriangularFactoredDefinite(m) => &**m,
            Matrix::DenseDefinite(m) => &**m,
            Matrix::DensePositiveDefiniteProduct(m) => &**m,
            Matrix::DenseSquare(m) => &**m,
            Matrix::InverseLuFactoredSquare(m) => &**m,
            Matrix::DenseSymmetric(m) => &**m,
            Matrix::Eigendecomposed(m) => &**m,
            Matrix::SoftAbsRegularised(m) => &**m,
            Matrix::BlockDiagonal(m) if m.is_invertible() => &**m,
            Matrix::LowRankUpdate(m) => &**m,
            _ => return None,
        };
        Some(out)
    }

    fn as_symmetric(&self) -> Option<&dyn Symmetric> {
        let out: &dyn Symmetric = match self {
            Matrix::Identity(m) => &**m,
            Matrix::ScaledIdentity(m) => &**m,
            Matrix::Diagonal(m) => &**m,
            Matrix::TriangularFactoredDefinite(m) => &**m,
            Matrix::DenseDefinite(m) => &**m,
            Matrix::DensePositiveDefiniteProduct(m) => &**m,
            Matrix::DenseSymmetric(m) => &**m,
            Matrix::Eigendecomposed(m) => &**m,
            Matrix::SoftAbsRegularised(m) => &**m,
            Matrix::BlockDiagonal(m) if m.structure() >= crate::Structure::Symmetric => &**m,
            Matrix::LowRankUpdate(m) if m.structure() >= crate::Structure::Symmetric => &**m,
            _ => return None,
        };
        Some(out)
    }

    fn as_positive_definite(&self) -> Option<&dyn PositiveDefinite> {
        let out: &dyn PositiveDefinite = match self {
            Matrix::Identity(m) => &**m,
            Matrix::ScaledIdentity(m) if m.is_positive() => &**m,
            Matrix::Diagonal(m) if m.is_positive() => &**m,
            Matrix::TriangularFactoredDefinite(m) if m.is_positive() => &**m,
            Matrix::DenseDefinite(m) if m.is_positive() => &**m,
            Matrix::DensePositiveDefiniteProduct(m) => &**m,
            Matrix::Eigendecomposed(m) if m.is_positive() => &**m,
            Matrix::SoftAbsRegularised(m) => &**m,
            Matrix::BlockDiagonal(m) if m.structure() == crate::Structure::PositiveDefinite => &**m,
            Matrix::LowRankUpdate(m) if m.structure() == crate::Structure::PositiveDefinite => &**m,
            _ => return None,
        };
        Some(out)
    }

    fn as_differentiable(&self) -> Option<&dyn Differentiable> {
        let out: &dyn Differentiable = match self {
            Matrix::ScaledIdentity(m) => &**m,
            Matrix::Diagonal(m) => &**m,
            Matrix::TriangularFactoredDefinite(m) => &**m,
            Matrix::DenseDefinite(m) => &**m,
            Matrix::DensePositiveDefiniteProduct(m) => &**m,
            Matrix::SoftAbsRegularised(m) => &**m,
            _ => return None,
        };
        Some(out)
    }

    fn missing(&self, capability: &'static str) -> MatrixError {
        MatrixError::MissingCapability { kind: self.kind(), capability }
    }

    pub fn is_square(&self) -> bool { self.as_square().is_some() }
    pub fn is_invertible(&self) -> bool { self.as_invertible().is_some() }
    pub fn is_symmetric(&self) -> bool { self.as_symmetric().is_some() }
    pub fn is_positive_definite(&self) -> bool { self.as_positive_definite().is_some() }
    pub fn is_differentiable(&self) -> bool { self.as_differentiable().is_some() }
}

impl Matrix {
    pub fn kind(&self) -> &'static str { self.as_operator().kind() }

    pub fn shape(&self) -> Shape { self.as_operator().shape() }

    pub fn rows(&self) -> Option<usize> { self.shape().0 }

    pub fn cols(&self) -> Option<usize> { self.shape().1 }

    /// Dense representation.  For implicit matrices this is computed once and kept.
    pub fn array(&self) -> Result<&Array2<f64>> { self.as_operator().array() }

    pub fn diagonal(&self) -> Result<Array1<f64>> { self.as_operator().diagonal() }

    /// `self @ other`.
    pub fn dot(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if let Some(cols) = self.cols() {
            if other.nrows() != cols {
                return Err(MatrixError::DimensionMismatch {
                    left: self.shape(),
                    right: (Some(other.nrows()), Some(other.ncols())),
                });
            }
        }
        self.as_operator().left_multiply(other)
    }

    /// `other @ self`.
    pub fn rdot(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if let Some(rows) = self.rows() {
            if other.ncols() != rows {
                return Err(MatrixError::DimensionMismatch {
                    left: (Some(other.nrows()), Some(other.ncols())),
                    right: self.shape(),
                });
            }
        }
        self.as_operator().right_multiply(other)
    }

    /// `self @ vector`.
    pub fn dot_vec(&self, vector: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let out = self.dot(vector.insert_axis(Axis(1)))?;
        Ok(out.index_axis_move(Axis(1), 0))
    }

    /// `vector @ self`.
    pub fn rdot_vec(&self, vector: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let out = self.rdot(vector.insert_axis(Axis(0)))?;
        Ok(out.index_axis_move(Axis(0), 0))
    }

    /// `self @ other`, as a lazy product.
    ///
    /// Products are flattened, so multiplying chains never nests them.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        if let Some(cols) = self.cols() {
            if other.rows() != Some(cols) {
                return Err(MatrixError::DimensionMismatch {
                    left: self.shape(),
                    right: other.shape(),
                });
            }
        }
        let mut factors = vec![];
        for m in &[self, other] {
            match m {
                Matrix::Product(product) => factors.extend(product.factors().iter().cloned()),
                _ => factors.push((*m).clone()),
            }
        }
        Product::new(factors)
    }

    /// `scalar * self`.
    pub fn scale(&self, scalar: f64) -> Result<Matrix> {
        if scalar == 0.0 {
            return Err(MatrixError::ZeroScalar { op: "multiplication" });
        }
        self.as_operator().scalar_multiply(scalar)
    }

    /// `self / scalar`.
    pub fn div(&self, scalar: f64) -> Result<Matrix> {
        if scalar == 0.0 {
            return Err(MatrixError::ZeroScalar { op: "division" });
        }
        self.as_operator().scalar_multiply(1.0 / scalar)
    }

    pub fn neg(&self) -> Result<Matrix> { self.scale(-1.0) }

    pub fn transpose(&self) -> Result<Matrix> {
        if self.is_symmetric() {
            return Ok(self.clone());
        }
        self.as_transpose().ok_or_else(|| self.missing("transposable"))?.transpose()
    }

    pub fn log_abs_det(&self) -> Result<f64> {
        self.as_square().ok_or_else(|| self.missing("square"))?.log_abs_det()
    }

    pub fn inv(&self) -> Result<Matrix> {
        self.as_invertible().ok_or_else(|| self.missing("invertible"))?.inv()
    }

    pub fn eigval(&self) -> Result<Array1<f64>> {
        self.as_symmetric().ok_or_else(|| self.missing("symmetric"))?.eigval()
    }

    pub fn eigvec(&self) -> Result<Matrix> {
        self.as_symmetric().ok_or_else(|| self.missing("symmetric"))?.eigvec()
    }

    /// A matrix `R` with `R @ R.T == self`.
    pub fn sqrt(&self) -> Result<Matrix> {
        self.as_positive_definite().ok_or_else(|| self.missing("positive definite"))?.sqrt()
    }

    pub fn grad_log_abs_det(&self) -> Result<Gradient> {
        self.as_differentiable().ok_or_else(|| self.missing("differentiable"))?.grad_log_abs_det()
    }

    pub fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        self.as_differentiable().ok_or_else(|| self.missing("differentiable"))?
            .grad_quadratic_form_inv(vector)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.as_operator();
        write!(f, "{}(shape={}", op.kind(), fmt_shape(op.shape()))?;
        op.fmt_params(f)?;
        write!(f, ")")
    }
}

impl<'a> Mul<f64> for &'a Matrix {
    type Output = Result<Matrix>;

    fn mul(self, scalar: f64) -> Result<Matrix> { self.scale(scalar) }
}

impl<'a> Mul<&'a Matrix> for f64 {
    type Output = Result<Matrix>;

    fn mul(self, matrix: &'a Matrix) -> Result<Matrix> { matrix.scale(self) }
}

impl<'a> Div<f64> for &'a Matrix {
    type Output = Result<Matrix>;

    fn div(self, scalar: f64) -> Result<Matrix> { Matrix::div(self, scalar) }
}

impl<'a> Neg for &'a Matrix {
    type Output = Result<Matrix>;

    fn neg(self) -> Result<Matrix> { Matrix::neg(self) }
}
