//! `assert_close!`, for comparing floating point data (scalars, slices, ndarray arrays)
//! up to relative and absolute tolerances.

use std::fmt;

use ndarray::{ArrayBase, Data, Dimension};

pub const DEFAULT_NONZERO_TOL: f64 = 1e-9;

#[macro_export]
macro_rules! assert_close {
    ($($t:tt)*) => {assert_close_impl!{@parsing [$($t)*] [[@rel $crate::DEFAULT_NONZERO_TOL] [@abs 0.0]]}};
}

#[macro_export]
macro_rules! debug_assert_close {
    ($($t:tt)*) => {{
        #[cfg(debug_assertions)] {
            assert_close!{$($t)*}
        }
    }};
}

#[macro_export]
macro_rules! assert_close_impl {
    (@parsing [rel=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@rel $tol]]);
    };
    (@parsing [abs=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@abs $tol]]);
    };
    (@parsing [$a:expr, $b:expr $(,)*] $assignments:tt) => {
        assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt "not nearly equal!"])
    };
    (@parsing [$a:expr, $b:expr, $($fmt:tt)+] $assignments:tt) => {
        assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt $($fmt)+])
    };
    (@expand [$($assignment:tt)*] [@comp $a:expr, $b:expr] [@fmt $($fmt:tt)+] ) => {
        #[allow(unused_mut)]
        #[allow(unused_assignments)]
        {
            let a = $a;
            let b = $b;

            let mut abs;
            let mut rel;
            $(
                assert_close_impl!{@stmt::assign [abs, rel] $assignment}
            )*

            if let Err(e) = $crate::CheckClose::check_close(&a, &b, $crate::Tolerances { abs, rel }) {
                panic!(
                "{} (tolerances: rel={}, abs={})\n left: {:?}\nright: {:?}\n{}",
                 format!($($fmt)*), rel, abs, a, b, e);
            }
        }
    };
    (@stmt::assign [$abs:ident, $rel:ident] [@abs $tol:expr]) => { $abs = $tol; };
    (@stmt::assign [$abs:ident, $rel:ident] [@rel $tol:expr]) => { $rel = $tol; };
}

#[doc(hidden)]
#[allow(non_snake_case)]
#[inline]
pub fn __is_close(a: f64, b: f64, Tolerances { abs, rel }: Tolerances) -> bool {
    // Implementation from Python 3.5.
    // https://hg.python.org/cpython/file/tip/Modules/mathmodule.c#l1993
    assert!(rel >= 0.0);
    assert!(abs >= 0.0);

    // catch infinities of same sign
    if a == b { return true; }

    // catch infinities of opposite sign, avoiding infinite relative tolerance
    if a.is_infinite() || b.is_infinite() { return false; }

    // case for general values and NaN.
    (a - b).abs() < abs.max(rel * a.abs()).max(rel * b.abs())
}

#[derive(Debug, Copy, Clone)]
pub struct Tolerances<T = f64> {
    pub abs: T,
    pub rel: T
}

#[derive(Debug, thiserror::Error)]
pub struct CheckCloseError<T: fmt::Debug = f64> {
    pub values: (T, T),
    pub tol: Tolerances<T>,
}

impl<T: fmt::Debug> fmt::Display for CheckCloseError<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (ref left, ref right) = self.values;
        write!(f, "failed at:
  left: {:?}
 right: {:?}
   tol: {:?}", left, right, self.tol)
    }
}

pub trait CheckClose<Rhs: ?Sized = Self> {
    type Scalar: fmt::Debug;

    /// Test that all values of self and other are close.
    fn check_close(&self, other: &Rhs, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>;
}

impl CheckClose for f64 {
    type Scalar = f64;

    #[inline]
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        if __is_close(*self, *other, tol) {
            Ok(())
        } else {
            Err(CheckCloseError {
                values: (*self, *other),
                tol,
            })
        }
    }
}

impl<'a, 'b, T, U> CheckClose<&'b U> for &'a T
where
    T: ?Sized + CheckClose<U>,
    U: ?Sized,
{
    type Scalar = T::Scalar;

    fn check_close(&self, other: &&'b U, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { CheckClose::check_close(*self, *other, tol) }
}

impl<T: CheckClose> CheckClose for [T] {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        assert_eq!(self.len(), other.len());
        self.iter().zip(other)
            .map(|(a, b)| a.check_close(b, tol))
            .collect()
    }
}

impl<T: CheckClose> CheckClose for Vec<T> {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { (&self[..]).check_close(&other[..], tol) }
}

impl<T: CheckClose> CheckClose<[T]> for Vec<T> {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &[T], tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { (&self[..]).check_close(&other[..], tol) }
}

/// Arrays of any storage may be compared as long as their shapes agree.
/// (a mismatch in shape is a bug in the test, and panics)
impl<S1, S2, D> CheckClose<ArrayBase<S2, D>> for ArrayBase<S1, D>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    type Scalar = f64;

    fn check_close(&self, other: &ArrayBase<S2, D>, tol: Tolerances) -> Result<(), CheckCloseError<f64>>
    {
        assert_eq!(self.shape(), other.shape(), "arrays have different shapes");
        self.iter().zip(other.iter())
            .map(|(a, b)| a.check_close(b, tol))
            .collect()
    }
}
