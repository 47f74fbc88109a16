/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Utilities for numeric differentiation.
//!
//! These are public so that code building on the matrix types can check its own
//! gradients the same way the matrix gradients are checked here.

use ndarray::{Array, ArrayView, Dimension, NdIndex};

/// Approximation method for a numerical 1D derivative.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivativeKind {
    /// n-point stencil. `n` must be odd. Only implemented for `n = 3, 5, 7, 9`.
    Stencil(u32),
}

impl DerivativeKind {
    /// Alias for `DerivativeKind::Stencil(3)`.
    #[allow(bad_style)]
    pub const CentralDifference: Self = DerivativeKind::Stencil(3);
}

impl Default for DerivativeKind {
    fn default() -> DerivativeKind {
        DerivativeKind::Stencil(5)
    }
}

enum Never {}

/// Compute a numerical derivative using finite differences.
pub fn slope(
    interval_width: f64,
    kind: Option<DerivativeKind>,
    point: f64,
    mut value_fn: impl FnMut(f64) -> f64,
) -> f64 {
    try_slope::<Never, _>(interval_width, kind, point, |x| Ok(value_fn(x)))
        .unwrap_or_else(|e| match e {})
}

#[inline(always)]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(&a, &b)| a * b).sum()
}

macro_rules! stencil_sum {
    ($value_fn:expr, $point:expr, $step:expr, [
        $((offset: $sign:tt $offset:expr, coeff: $(+)?$coeff:expr),)*
    ]) => {{
        let mut value_fn = $value_fn;
        let point = $point;
        let step = $step;
        let values = [
            $(value_fn(point $sign $offset * step)?,)+
        ];
        let coeffs = [$($coeff),*];
        dot(&values, &coeffs)
    }};
}

/// `slope` for functions that can fail.
pub fn try_slope<E, F>(
    step: f64,
    kind: Option<DerivativeKind>,
    point: f64,
    value_fn: F,
) -> Result<f64, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    // http://www.holoborodko.com/pavel/numerical-methods/numerical-derivative/central-differences/
    match kind.unwrap_or_default() {
        DerivativeKind::Stencil(3) => {
            let numer = stencil_sum!(value_fn, point, step, [
                (offset: -1.0, coeff: -1.0),
                (offset: +1.0, coeff: +1.0),
            ]);
            Ok(numer / (2.0 * step))
        },

        DerivativeKind::Stencil(5) => {
            let numer = stencil_sum!(value_fn, point, step, [
                (offset: -2.0, coeff: +1.0),
                (offset: -1.0, coeff: -8.0),
                (offset: +1.0, coeff: +8.0),
                (offset: +2.0, coeff: -1.0),
            ]);
            Ok(numer / (12.0 * step))
        },

        DerivativeKind::Stencil(7) => {
            let numer = stencil_sum!(value_fn, point, step, [
                (offset: -3.0, coeff: -1.0),
                (offset: -2.0, coeff: +9.0),
                (offset: -1.0, coeff: -45.0),
                (offset: +1.0, coeff: +45.0),
                (offset: +2.0, coeff: -9.0),
                (offset: +3.0, coeff: +1.0),
            ]);
            Ok(numer / (60.0 * step))
        },

        DerivativeKind::Stencil(9) => {
            let numer = stencil_sum!(value_fn, point, step, [
                (offset: -4.0, coeff: +3.0),
                (offset: -3.0, coeff: -32.0),
                (offset: -2.0, coeff: +168.0),
                (offset: -1.0, coeff: -672.0),
                (offset: +1.0, coeff: +672.0),
                (offset: +2.0, coeff: -168.0),
                (offset: +3.0, coeff: +32.0),
                (offset: +4.0, coeff: -3.0),
            ]);
            Ok(numer / (840.0 * step))
        },

        DerivativeKind::Stencil(n@0) |
        DerivativeKind::Stencil(n@1) |
        DerivativeKind::Stencil(n) if n % 2 == 0 => {
            panic!("{}-point stencil does not exist", n);
        },

        DerivativeKind::Stencil(n) => {
            panic!("{}-point stencil is not implemented", n);
        },
    }
}

/// Numerically compute the gradient of a function of an array.
///
/// Each element is perturbed independently, so the cost is one `slope` per element.
/// The output has the same shape as `point`.
pub fn gradient<D>(
    interval_width: f64,
    kind: Option<DerivativeKind>,
    point: ArrayView<'_, f64, D>,
    mut value_fn: impl FnMut(ArrayView<'_, f64, D>) -> f64,
) -> Array<f64, D>
where
    D: Dimension,
    D::Pattern: NdIndex<D>,
{
    try_gradient::<Never, _, _>(interval_width, kind, point, |x| Ok(value_fn(x)))
        .unwrap_or_else(|e| match e {})
}

/// `gradient` for functions that can fail.
pub fn try_gradient<E, D, F>(
    interval_width: f64,
    kind: Option<DerivativeKind>,
    point: ArrayView<'_, f64, D>,
    mut value_fn: F,
) -> Result<Array<f64, D>, E>
where
    D: Dimension,
    D::Pattern: NdIndex<D>,
    F: FnMut(ArrayView<'_, f64, D>) -> Result<f64, E>,
{
    let kind = kind.unwrap_or_default();
    let mut work = point.to_owned();
    let mut out = Array::zeros(point.raw_dim());
    for (index, &center) in point.indexed_iter() {
        let slope = try_slope(interval_width, Some(kind), center, |x| {
            work[index.clone()] = x;
            value_fn(work.view())
        });
        work[index.clone()] = center; // reset modifications
        out[index] = slope?;
    }
    Ok(out)
}

//---------------------------------------------------------
