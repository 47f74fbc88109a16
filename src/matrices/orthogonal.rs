/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Invertible, Matrix, Operator, Result, Shape, Square, Transpose};
use crate::memo::{memoize, require_square};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView2};
use once_cell::sync::OnceCell;

/// A square matrix whose rows and columns are orthonormal.
///
/// Orthogonality is assumed, not checked.
#[derive(Debug)]
pub struct Orthogonal {
    array: Array2<f64>,
}

impl Orthogonal {
    pub fn new(array: Array2<f64>) -> Result<Matrix> {
        require_square("orthogonal matrix", &array.view())?;
        Ok(Orthogonal { array }.into())
    }
}

impl Operator for Orthogonal {
    fn kind(&self) -> &'static str { "Orthogonal" }

    fn shape(&self) -> Shape {
        let n = self.array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Ok(ScaledOrthogonal::from_parts(scalar, self.array.clone()))
    }
}

impl Transpose for Orthogonal {
    fn transpose(&self) -> Result<Matrix> {
        Ok(Orthogonal { array: self.array.t().to_owned() }.into())
    }
}

impl Square for Orthogonal {
    fn log_abs_det(&self) -> Result<f64> { Ok(0.0) }
}

impl Invertible for Orthogonal {
    fn inv(&self) -> Result<Matrix> { self.transpose() }
}

//---------------------------------------------------------

/// `scalar * Q` for an orthogonal `Q`.
#[derive(Debug)]
pub struct ScaledOrthogonal {
    scalar: f64,
    orth_array: Array2<f64>,
    array: OnceCell<Array2<f64>>,
}

impl ScaledOrthogonal {
    pub fn new(scalar: f64, orth_array: Array2<f64>) -> Result<Matrix> {
        if scalar == 0.0 {
            return Err(invalid!("scalar must be nonzero"));
        }
        require_square("orthogonal matrix", &orth_array.view())?;
        Ok(ScaledOrthogonal::from_parts(scalar, orth_array))
    }

    fn from_parts(scalar: f64, orth_array: Array2<f64>) -> Matrix {
        ScaledOrthogonal { scalar, orth_array, array: OnceCell::new() }.into()
    }
}

impl Operator for ScaledOrthogonal {
    fn kind(&self) -> &'static str { "ScaledOrthogonal" }

    fn shape(&self) -> Shape {
        let n = self.orth_array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "scaled orthogonal array", || Ok(&self.orth_array * self.scalar))
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(self.orth_array.dot(&other) * self.scalar)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(other.dot(&self.orth_array) * self.scalar)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Ok(ScaledOrthogonal::from_parts(scalar * self.scalar, self.orth_array.clone()))
    }

    fn diagonal(&self) -> Result<Array1<f64>> { Ok(&self.orth_array.diag() * self.scalar) }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", scalar={}", self.scalar)
    }
}

impl Transpose for ScaledOrthogonal {
    fn transpose(&self) -> Result<Matrix> {
        Ok(ScaledOrthogonal::from_parts(self.scalar, self.orth_array.t().to_owned()))
    }
}

impl Square for ScaledOrthogonal {
    fn log_abs_det(&self) -> Result<f64> {
        Ok(self.orth_array.nrows() as f64 * self.scalar.abs().ln())
    }
}

impl Invertible for ScaledOrthogonal {
    fn inv(&self) -> Result<Matrix> {
        Ok(ScaledOrthogonal::from_parts(1.0 / self.scalar, self.orth_array.t().to_owned()))
    }
}
