/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Structured matrices.
//!
//! This is a facade over the workspace crates; see [`strumat_matrices`] for the
//! matrix types and [`linalg`] for the dense backend they fall back on.

pub use strumat_matrices::*;

pub use strumat_linalg as linalg;
