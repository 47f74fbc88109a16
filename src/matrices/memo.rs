/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Compute-once caches and small dense helpers shared by the matrix types.

use crate::{Matrix, MatrixError, Orthogonal, Result, Shape};

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use once_cell::sync::OnceCell;
use strumat_linalg as backend;

/// Fill `cell` on first access.  Caches are never invalidated.
pub(crate) fn memoize<'a, T>(
    cell: &'a OnceCell<T>,
    what: &'static str,
    init: impl FnOnce() -> Result<T>,
) -> Result<&'a T> {
    cell.get_or_try_init(|| {
        trace!("computing {}", what);
        init()
    })
}

/// A symmetric eigendecomposition.
#[derive(Debug, Clone)]
pub(crate) struct Eigen {
    pub eigval: Array1<f64>,
    // always an Orthogonal
    pub eigvec: Matrix,
}

impl Eigen {
    pub fn from_backend(array: ArrayView2<'_, f64>) -> Result<Eigen> {
        let (eigval, eigvec) = backend::current().eigh(array)?;
        Ok(Eigen { eigval, eigvec: Orthogonal::new(eigvec)? })
    }

    pub fn scaled(&self, scalar: f64) -> Eigen {
        Eigen { eigval: &self.eigval * scalar, eigvec: self.eigvec.clone() }
    }
}

pub(crate) fn memoized_eigen<'a>(
    cell: &'a OnceCell<Eigen>,
    array: impl FnOnce() -> Result<&'a Array2<f64>>,
) -> Result<&'a Eigen> {
    memoize(cell, "eigendecomposition", || Eigen::from_backend(array()?.view()))
}

/// Sum of `log |x|`.
pub(crate) fn sum_log_abs(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().map(|x| x.abs().ln()).sum()
}

pub(crate) fn require_square(what: &str, array: &ArrayView2<'_, f64>) -> Result<usize> {
    match array.dim() {
        (n, m) if n == m => Ok(n),
        (n, m) => Err(invalid!("{} must be square (got {}x{})", what, n, m)),
    }
}

pub(crate) fn known_size(shape: Shape, what: &'static str) -> Result<usize> {
    shape.0.ok_or(MatrixError::ImplicitSize { what })
}

/// Lower (or upper) triangle of an array, zeroing everything else.
pub(crate) fn triangle(array: ArrayView2<'_, f64>, lower: bool) -> Array2<f64> {
    Array2::from_shape_fn(array.dim(), |(r, c)| {
        let keep = if lower { c <= r } else { c >= r };
        if keep { array[(r, c)] } else { 0.0 }
    })
}

pub(crate) fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    let a = a.insert_axis(Axis(1));
    let b = b.insert_axis(Axis(0));
    &a * &b
}

/// Applies `func` to consecutive row ranges of `other` (with the given heights)
/// and stacks the results vertically.
pub(crate) fn stack_rows(
    heights: &[usize],
    other: ArrayView2<'_, f64>,
    out_cols: usize,
    mut func: impl FnMut(usize, ArrayView2<'_, f64>) -> Result<Array2<f64>>,
) -> Result<Array2<f64>> {
    let mut out = Array2::zeros((heights.iter().sum(), out_cols));
    let mut start = 0;
    for (index, &height) in heights.iter().enumerate() {
        let part = func(index, other.slice(s![start..start + height, ..]))?;
        out.slice_mut(s![start..start + height, ..]).assign(&part);
        start += height;
    }
    Ok(out)
}

/// Column-wise counterpart of `stack_rows`.
pub(crate) fn stack_cols(
    widths: &[usize],
    other: ArrayView2<'_, f64>,
    out_rows: usize,
    mut func: impl FnMut(usize, ArrayView2<'_, f64>) -> Result<Array2<f64>>,
) -> Result<Array2<f64>> {
    let mut out = Array2::zeros((out_rows, widths.iter().sum()));
    let mut start = 0;
    for (index, &width) in widths.iter().enumerate() {
        let part = func(index, other.slice(s![.., start..start + width]))?;
        out.slice_mut(s![.., start..start + width]).assign(&part);
        start += width;
    }
    Ok(out)
}

pub(crate) fn fmt_shape(shape: Shape) -> String {
    match shape {
        (Some(r), Some(c)) => format!("({}, {})", r, c),
        (r, c) => format!("({:?}, {:?})", r, c),
    }
}
