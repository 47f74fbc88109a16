/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The dense numeric kernels that `strumat` treats as an external collaborator.
//!
//! Everything structural lives in `strumat-matrices`; this crate only knows how to
//! factorize and solve with plain dense arrays.  The kernels sit behind the [`Backend`]
//! trait so that the structural code can be run against a wrapped or mocked backend
//! (see [`with_backend`]).

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[cfg(test)]
#[macro_use]
extern crate strumat_assert_close;

pub use crate::lapack::LapackBackend;
mod lapack;

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array1, Array2, ArrayView2};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("matrix is singular")]
    Singular,
    #[error("{op} requires a square matrix (got shape {shape:?})")]
    NotSquare { op: &'static str, shape: (usize, usize) },
    #[error("error in {op}: {message}")]
    Lapack { op: &'static str, message: String },
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Pivoted LU factorization, in the packed form produced by `getrf`.
///
/// `lu` holds the upper triangular factor `U` on and above the diagonal and the
/// strictly-lower part of the unit lower triangular factor `L` below it.
#[derive(Debug, Clone, PartialEq)]
pub struct LuFactor {
    pub lu: Array2<f64>,
    // one-based row interchanges, as reported by LAPACK
    pub pivots: Vec<i32>,
}

impl LuFactor {
    /// Diagonal of the `U` factor.
    pub fn u_diagonal(&self) -> Array1<f64> { self.lu.diag().to_owned() }

    /// The factorization of `s * A`, given that `self` is the factorization of `A`.
    ///
    /// Scaling the rows uniformly leaves `P` and `L` untouched, so only the upper
    /// triangle is rescaled.
    pub fn scaled(&self, scalar: f64) -> LuFactor {
        let mut lu = self.lu.clone();
        for ((r, c), x) in lu.indexed_iter_mut() {
            if c >= r {
                *x *= scalar;
            }
        }
        LuFactor { lu, pivots: self.pivots.clone() }
    }
}

/// The dense kernels needed by the structured matrix types.
///
/// All inputs are logical views; implementations must not depend on memory order.
pub trait Backend: fmt::Debug + Send + Sync {
    /// Symmetric eigendecomposition. Eigenvalues are ascending, and the eigenvectors
    /// are the (orthonormal) columns of the second output.
    fn eigh(&self, a: ArrayView2<'_, f64>) -> BackendResult<(Array1<f64>, Array2<f64>)>;

    /// Lower triangular `L` such that `a = L L^T`.
    fn cholesky(&self, a: ArrayView2<'_, f64>) -> BackendResult<Array2<f64>>;

    fn lu_factor(&self, a: ArrayView2<'_, f64>) -> BackendResult<LuFactor>;

    /// Solves `A x = b` (or `A^T x = b` when `transposed`) for the factorized `A`.
    fn lu_solve(&self, lu: &LuFactor, b: ArrayView2<'_, f64>, transposed: bool) -> BackendResult<Array2<f64>>;

    /// Solves `T x = b` (or `T^T x = b`) where `T` is the lower or upper triangle of `a`.
    ///
    /// Elements outside of the selected triangle are ignored.
    fn solve_triangular(
        &self,
        a: ArrayView2<'_, f64>,
        b: ArrayView2<'_, f64>,
        lower: bool,
        transposed: bool,
    ) -> BackendResult<Array2<f64>>;

    /// Principal square root of a symmetric positive semi-definite matrix.
    fn sqrtm(&self, a: ArrayView2<'_, f64>) -> BackendResult<Array2<f64>>;
}

lazy_static! {
    static ref DEFAULT_BACKEND: Arc<dyn Backend> = Arc::new(LapackBackend);
}

thread_local! {
    static BACKEND_OVERRIDES: RefCell<Vec<Arc<dyn Backend>>> = RefCell::new(vec![]);
}

/// The backend in effect on this thread.
pub fn current() -> Arc<dyn Backend> {
    BACKEND_OVERRIDES.with(|stack| stack.borrow().last().cloned())
        .unwrap_or_else(|| DEFAULT_BACKEND.clone())
}

/// Run a closure with `backend` replacing the default on the current thread.
///
/// Calls may be nested; the innermost backend wins.
pub fn with_backend<R>(backend: Arc<dyn Backend>, func: impl FnOnce() -> R) -> R {
    struct PopOnDrop;
    impl Drop for PopOnDrop {
        fn drop(&mut self) {
            BACKEND_OVERRIDES.with(|stack| { stack.borrow_mut().pop(); });
        }
    }

    BACKEND_OVERRIDES.with(|stack| stack.borrow_mut().push(backend));
    let _guard = PopOnDrop;
    func()
}

/// Dense block diagonal matrix built from the given blocks (which need not be square).
pub fn block_diag(blocks: &[ArrayView2<'_, f64>]) -> Array2<f64> {
    let rows = blocks.iter().map(|b| b.nrows()).sum();
    let cols = blocks.iter().map(|b| b.ncols()).sum();

    let mut out = Array2::zeros((rows, cols));
    let (mut r, mut c) = (0, 0);
    for block in blocks {
        let (h, w) = block.dim();
        out.slice_mut(s![r..r + h, c..c + w]).assign(block);
        r += h;
        c += w;
    }
    out
}

pub(crate) fn check_square(op: &'static str, a: &ArrayView2<'_, f64>) -> BackendResult<usize> {
    match a.dim() {
        (n, m) if n == m => Ok(n),
        shape => Err(BackendError::NotSquare { op, shape }),
    }
}
