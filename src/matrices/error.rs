/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::Shape;

use strumat_linalg::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("inconsistent dimensions for matrix multiplication: {left:?} and {right:?}")]
    DimensionMismatch { left: Shape, right: Shape },

    /// A constructor rejected its arguments.
    #[error("{0}")]
    Invalid(String),

    #[error("scalar {op} by zero is not supported")]
    ZeroScalar { op: &'static str },

    #[error("cannot compute the {what} of a matrix with implicit size")]
    ImplicitSize { what: &'static str },

    #[error("{kind} matrix is not {capability}")]
    MissingCapability { kind: &'static str, capability: &'static str },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("bad matrix config: {0}")]
    Config(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, MatrixError>;

macro_rules! invalid {
    ($($arg:tt)+) => { crate::MatrixError::Invalid(format!($($arg)+)) };
}
