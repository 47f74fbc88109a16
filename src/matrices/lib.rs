/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Structured matrices.
//!
//! A [`Matrix`] is a linear operator that knows something about its own structure
//! (diagonal, triangular, block diagonal, a low-rank update of something simpler...)
//! and uses that knowledge to multiply, invert, take log-determinants, square roots
//! and parametric gradients without forming a dense array wherever it can.
//!
//! The dense kernels it eventually falls back on live in `strumat-linalg`.

#[macro_use]
extern crate log;
#[cfg(test)]
#[macro_use]
extern crate strumat_assert_close;

pub use crate::error::{MatrixError, Result};
#[macro_use]
mod error;

pub use crate::traits::{Differentiable, Gradient, Invertible, Operator, PositiveDefinite, Shape, Square, Symmetric, Transpose};
mod traits;

pub use crate::matrix::Matrix;
mod matrix;

mod memo;

pub use crate::product::Product;
mod product;

pub use crate::identity::{Identity, ScaledIdentity};
mod identity;

pub use crate::diagonal::Diagonal;
mod diagonal;

pub use crate::triangular::{InverseTriangular, Triangular};
mod triangular;

pub use crate::orthogonal::{Orthogonal, ScaledOrthogonal};
mod orthogonal;

pub use crate::definite::{DenseDefinite, DensePositiveDefiniteProduct, TriangularFactoredDefinite};
mod definite;

pub use crate::lu::{DenseSquare, InverseLuFactoredSquare};
mod lu;

pub use crate::eigen::{DenseSymmetric, Eigendecomposed, SoftAbsRegularised};
mod eigen;

pub use crate::block::{BlockColumn, BlockDiagonal, BlockRow, DenseRectangular};
mod block;

pub use crate::low_rank::LowRankUpdate;
mod low_rank;

/// Which capabilities a composite (block diagonal, low-rank update) carries.
///
/// Each level implies the ones before it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Structure {
    Square,
    Symmetric,
    PositiveDefinite,
}

impl Structure {
    /// The structure left after multiplying by a (nonzero) scalar.
    pub(crate) fn scaled(self, scalar: f64) -> Structure {
        match self {
            Structure::PositiveDefinite if scalar < 0.0 => Structure::Symmetric,
            other => other,
        }
    }
}

pub mod config;
pub mod numerical;

#[cfg(test)]
mod test_util;
