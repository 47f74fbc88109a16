/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Low-rank updates `S + sign * L @ K @ R` of an invertible matrix `S`.
//!
//! Inverses and determinants go through the Woodbury identity and the matrix
//! determinant lemma, so they cost `O(k^3 + k^2 n)` on top of whatever the same
//! operation costs for `S` (where `n x n` is the outer and `k x k` the inner size).

use crate::{DenseDefinite, DenseRectangular, DenseSquare, DenseSymmetric, Identity};
use crate::{Invertible, Matrix, MatrixError, Operator, PositiveDefinite, Result, Shape, Square, Structure, Symmetric, Transpose};
use crate::memo::{memoize, memoized_eigen, Eigen};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use once_cell::sync::OnceCell;
use strumat_linalg as backend;

/// `base + sign * left @ inner @ right`.
///
/// `left` is `n x k`, `right` is `k x n`, `base` is `n x n` and `inner` is `k x k`.
/// Both `base` and `inner` must be invertible.  A `sign` of `-1` makes this a
/// downdate.
///
/// The capacitance matrix `inner.inv + sign * right @ base.inv @ left` is formed on
/// first use and kept; it is the only dense `k x k` work needed for `inv` and
/// `log_abs_det`.
#[derive(Debug)]
pub struct LowRankUpdate {
    base: Matrix,
    left: Matrix,
    right: Matrix,
    inner: Matrix,
    sign: f64,
    structure: Structure,
    capacitance: OnceCell<Matrix>,
    array: OnceCell<Array2<f64>>,
    eigen: OnceCell<Eigen>,
}

struct Parts {
    base: Matrix,
    left: Matrix,
    right: Matrix,
    inner: Matrix,
    sign: f64,
    structure: Structure,
    capacitance: Option<Matrix>,
}

impl LowRankUpdate {
    /// Update of a square matrix with independent left and right factors.
    ///
    /// `inner` defaults to the identity.  A precomputed `capacitance` may be given.
    pub fn square(
        left: Matrix,
        right: Matrix,
        base: Matrix,
        inner: Option<Matrix>,
        capacitance: Option<Matrix>,
        sign: f64,
    ) -> Result<Matrix> {
        LowRankUpdate::validated(left, right, base, inner, capacitance, sign, Structure::Square)
    }

    /// `base + sign * factor @ inner @ factor.T` for symmetric `base` and `inner`.
    ///
    /// Symmetry is judged by identity: `base.transpose()` (and likewise for `inner`)
    /// must hand back the very same matrix.
    pub fn symmetric(
        factor: Matrix,
        base: Matrix,
        inner: Option<Matrix>,
        capacitance: Option<Matrix>,
        sign: f64,
    ) -> Result<Matrix> {
        let right = factor.transpose()?;
        LowRankUpdate::validated(factor, right, base, inner, capacitance, sign, Structure::Symmetric)
    }

    /// `base + sign * factor @ inner @ factor.T` for positive definite `base` and `inner`.
    ///
    /// With `sign == -1` the result must still be positive definite; this is trusted.
    pub fn positive_definite(
        factor: Matrix,
        base: Matrix,
        inner: Option<Matrix>,
        capacitance: Option<Matrix>,
        sign: f64,
    ) -> Result<Matrix> {
        let right = factor.transpose()?;
        LowRankUpdate::validated(factor, right, base, inner, capacitance, sign, Structure::PositiveDefinite)
    }

    fn validated(
        left: Matrix,
        right: Matrix,
        base: Matrix,
        inner: Option<Matrix>,
        capacitance: Option<Matrix>,
        sign: f64,
        structure: Structure,
    ) -> Result<Matrix> {
        if !(sign == 1.0 || sign == -1.0) {
            return Err(invalid!("sign must be +1 or -1 (got {})", sign));
        }
        let (outer, rank) = match left.shape() {
            (Some(n), Some(k)) => (n, k),
            _ => return Err(MatrixError::ImplicitSize { what: "low-rank factor" }),
        };
        if base.shape() != (Some(outer), Some(outer)) {
            return Err(invalid!("base matrix {} does not match outer size {}", base, outer));
        }
        if right.shape() != (Some(rank), Some(outer)) {
            return Err(invalid!("inconsistent factor shapes: {} and {}", left, right));
        }
        let inner = inner.unwrap_or_else(|| Identity::new(Some(rank)));
        if inner.shape() != (Some(rank), Some(rank)) {
            return Err(invalid!("inner matrix {} must be {}x{}", inner, rank, rank));
        }

        for (what, m) in &[("base", &base), ("inner", &inner)] {
            if !m.is_invertible() {
                return Err(invalid!("{} matrix must be invertible (got {})", what, m));
            }
            match structure {
                Structure::Square => {},
                Structure::Symmetric => {
                    if !m.is_symmetric() {
                        return Err(invalid!("{} matrix must be symmetric (got {})", what, m));
                    }
                },
                Structure::PositiveDefinite => {
                    if !m.is_positive_definite() {
                        return Err(invalid!("{} matrix must be positive definite (got {})", what, m));
                    }
                },
            }
        }

        if let Some(capacitance) = &capacitance {
            if capacitance.shape() != (Some(rank), Some(rank)) {
                return Err(invalid!("capacitance matrix {} must be {}x{}", capacitance, rank, rank));
            }
            let ok = match structure {
                Structure::Square => capacitance.is_invertible(),
                Structure::Symmetric => capacitance.is_symmetric() && capacitance.is_invertible(),
                Structure::PositiveDefinite => capacitance.is_positive_definite(),
            };
            if !ok {
                return Err(invalid!("capacitance matrix {} lacks the structure of the update", capacitance));
            }
        }

        Ok(LowRankUpdate::from_parts(Parts { base, left, right, inner, sign, structure, capacitance }))
    }

    fn from_parts(parts: Parts) -> Matrix {
        let Parts { base, left, right, inner, sign, structure, capacitance } = parts;
        let cell = OnceCell::new();
        if let Some(capacitance) = capacitance {
            let _ = cell.set(capacitance);
        }
        LowRankUpdate {
            base, left, right, inner, sign, structure,
            capacitance: cell,
            array: OnceCell::new(),
            eigen: OnceCell::new(),
        }.into()
    }

    pub fn structure(&self) -> Structure { self.structure }

    pub fn sign(&self) -> f64 { self.sign }

    pub fn base(&self) -> &Matrix { &self.base }

    pub fn left(&self) -> &Matrix { &self.left }

    pub fn right(&self) -> &Matrix { &self.right }

    pub fn inner(&self) -> &Matrix { &self.inner }

    /// `inner.inv + sign * right @ base.inv @ left`, computed on first use.
    pub fn capacitance(&self) -> Result<&Matrix> {
        memoize(&self.capacitance, "capacitance matrix", || {
            let base_inv_left = self.base.inv()?.dot(self.left.array()?.view())?;
            let array = self.inner.inv()?.array()? + &(self.right.dot(base_inv_left.view())? * self.sign);
            match self.structure {
                Structure::Square => DenseSquare::new(array),
                Structure::Symmetric => DenseSymmetric::new(array),
                Structure::PositiveDefinite => DenseDefinite::positive(array),
            }
        })
    }

    fn size(&self) -> Option<usize> { self.base.rows() }
}

impl Operator for LowRankUpdate {
    fn kind(&self) -> &'static str {
        match self.structure {
            Structure::Square => "SquareLowRankUpdate",
            Structure::Symmetric => "SymmetricLowRankUpdate",
            Structure::PositiveDefinite => "PositiveDefiniteLowRankUpdate",
        }
    }

    fn shape(&self) -> Shape { (self.size(), self.size()) }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "low-rank update array", || {
            let update = self.left.dot(self.inner.dot(self.right.array()?.view())?.view())?;
            Ok(self.base.array()? + &(update * self.sign))
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let update = self.left.dot(self.inner.dot(self.right.dot(other)?.view())?.view())?;
        Ok(self.base.dot(other)? + &(update * self.sign))
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let update = self.right.rdot(self.inner.rdot(self.left.rdot(other)?.view())?.view())?;
        Ok(self.base.rdot(other)? + &(update * self.sign))
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let capacitance = match self.capacitance.get() {
            Some(c) => Some(c.div(scalar)?),
            None => None,
        };
        Ok(LowRankUpdate::from_parts(Parts {
            base: self.base.scale(scalar)?,
            left: self.left.clone(),
            right: self.right.clone(),
            inner: self.inner.scale(scalar)?,
            sign: self.sign,
            structure: self.structure.scaled(scalar),
            capacitance,
        }))
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        let left_inner = self.inner.rdot(self.left.array()?.view())?;
        let update = (&left_inner * &self.right.array()?.t()).sum_axis(Axis(1));
        Ok(self.base.diagonal()? + &(update * self.sign))
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.rows() {
            Some(rank) => write!(f, ", rank={}, sign={}", rank, self.sign),
            None => write!(f, ", sign={}", self.sign),
        }
    }
}

impl Transpose for LowRankUpdate {
    fn transpose(&self) -> Result<Matrix> {
        let capacitance = match self.capacitance.get() {
            Some(c) => Some(c.transpose()?),
            None => None,
        };
        Ok(LowRankUpdate::from_parts(Parts {
            base: self.base.transpose()?,
            left: self.right.transpose()?,
            right: self.left.transpose()?,
            inner: self.inner.transpose()?,
            sign: self.sign,
            structure: self.structure,
            capacitance,
        }))
    }
}

impl Square for LowRankUpdate {
    fn log_abs_det(&self) -> Result<f64> {
        Ok(self.base.log_abs_det()? + self.inner.log_abs_det()? + self.capacitance()?.log_abs_det()?)
    }
}

impl Invertible for LowRankUpdate {
    /// Another low-rank update, of `base.inv`, by way of the Woodbury identity.
    fn inv(&self) -> Result<Matrix> {
        let base_inv = self.base.inv()?;
        let left = base_inv.matmul(&self.left)?;
        let right = match self.structure {
            Structure::Square => self.right.matmul(&base_inv)?,
            Structure::Symmetric |
            Structure::PositiveDefinite => left.transpose()?,
        };
        Ok(LowRankUpdate::from_parts(Parts {
            base: base_inv,
            left,
            right,
            inner: self.capacitance()?.inv()?,
            sign: -self.sign,
            structure: self.structure,
            capacitance: Some(self.inner.inv()?),
        }))
    }
}

impl Symmetric for LowRankUpdate {
    fn eigval(&self) -> Result<Array1<f64>> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigval.clone())
    }

    fn eigvec(&self) -> Result<Matrix> {
        Ok(memoized_eigen(&self.eigen, || self.array())?.eigvec.clone())
    }
}

impl PositiveDefinite for LowRankUpdate {
    /// A square root in `O(k^3 + k^2 n)` on top of the square root of `base`.
    ///
    /// Follows Algorithm 1 of Ambikasaran, O'Neill & Singh (2016), "Fast symmetric
    /// factorization of hierarchical matrices with applications" (arXiv:1405.0223).
    /// With `W = base.sqrt` and `U = W.inv @ left`, the result is
    /// `W @ (I + U @ X @ U.T)` for a small symmetric `X`.
    fn sqrt(&self) -> Result<Matrix> {
        let outer = self.size().ok_or(MatrixError::ImplicitSize { what: "square root" })?;
        let rank = self.left.cols().ok_or(MatrixError::ImplicitSize { what: "square root" })?;
        debug!("low-rank square root (outer size {}, rank {})", outer, rank);

        let backend = backend::current();
        let w = self.base.sqrt()?;
        let u = w.inv()?.dot(self.left.array()?.view())?;
        let lc = backend.cholesky(u.t().dot(&u).view())?;

        let eye = Array2::<f64>::eye(rank);
        let lc_inner = self.inner.rdot(lc.t())?.dot(&lc);
        let mid = backend.sqrtm((&eye + &(lc_inner * self.sign)).view())?;
        let lc_inv = backend.solve_triangular(lc.view(), eye.view(), true, false)?;
        let x = lc_inv.t().dot(&(mid - &eye)).dot(&lc_inv);

        let update = LowRankUpdate::symmetric(
            DenseRectangular::new(u),
            Identity::new(Some(outer)),
            Some(DenseSymmetric::new(x)?),
            None,
            1.0,
        )?;
        w.matmul(&update)
    }
}
