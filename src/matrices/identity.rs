/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Differentiable, Gradient, Invertible, Matrix, Operator, PositiveDefinite, Result, Shape, Square, Symmetric};
use crate::memo::{known_size, memoize};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use once_cell::sync::OnceCell;

/// The identity operator.
///
/// The size may be left unspecified, in which case only the operations that do not
/// depend on it (multiplication, inversion, ...) are available.
#[derive(Debug)]
pub struct Identity {
    size: Option<usize>,
    array: OnceCell<Array2<f64>>,
}

impl Identity {
    pub fn new(size: Option<usize>) -> Matrix {
        Identity { size, array: OnceCell::new() }.into()
    }
}

impl Operator for Identity {
    fn kind(&self) -> &'static str { "Identity" }

    fn shape(&self) -> Shape { (self.size, self.size) }

    fn array(&self) -> Result<&Array2<f64>> {
        let n = known_size(self.shape(), "array")?;
        memoize(&self.array, "identity array", || Ok(Array2::eye(n)))
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.to_owned()) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.to_owned()) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        match scalar > 0.0 {
            true => ScaledIdentity::positive(scalar, self.size),
            false => ScaledIdentity::new(scalar, self.size),
        }
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        Ok(Array1::ones(known_size(self.shape(), "diagonal")?))
    }
}

impl Square for Identity {
    fn log_abs_det(&self) -> Result<f64> { Ok(0.0) }
}

impl Invertible for Identity {
    fn inv(&self) -> Result<Matrix> { Ok(Identity::new(self.size)) }
}

impl Symmetric for Identity {
    fn eigval(&self) -> Result<Array1<f64>> { self.diagonal() }

    fn eigvec(&self) -> Result<Matrix> { Ok(Identity::new(self.size)) }
}

impl PositiveDefinite for Identity {
    fn sqrt(&self) -> Result<Matrix> { Ok(Identity::new(self.size)) }
}

//---------------------------------------------------------

/// `scalar * I`, parameterised by the (nonzero) scalar.
#[derive(Debug)]
pub struct ScaledIdentity {
    scalar: f64,
    size: Option<usize>,
    positive: bool,
    array: OnceCell<Array2<f64>>,
}

impl ScaledIdentity {
    pub fn new(scalar: f64, size: Option<usize>) -> Result<Matrix> {
        if scalar == 0.0 {
            return Err(invalid!("scalar must be nonzero"));
        }
        Ok(ScaledIdentity { scalar, size, positive: false, array: OnceCell::new() }.into())
    }

    /// Positive definite scaled identity; the scalar must be positive.
    pub fn positive(scalar: f64, size: Option<usize>) -> Result<Matrix> {
        if !(scalar > 0.0) {
            return Err(invalid!("scalar multiplier must be positive (got {})", scalar));
        }
        Ok(ScaledIdentity { scalar, size, positive: true, array: OnceCell::new() }.into())
    }

    pub fn scalar(&self) -> f64 { self.scalar }

    pub fn is_positive(&self) -> bool { self.positive }

    fn with_scalar(&self, scalar: f64, positive: bool) -> Result<Matrix> {
        match positive {
            true => ScaledIdentity::positive(scalar, self.size),
            false => ScaledIdentity::new(scalar, self.size),
        }
    }
}

impl Operator for ScaledIdentity {
    fn kind(&self) -> &'static str {
        match self.positive {
            true => "PositiveScaledIdentity",
            false => "ScaledIdentity",
        }
    }

    fn shape(&self) -> Shape { (self.size, self.size) }

    fn array(&self) -> Result<&Array2<f64>> {
        let n = known_size(self.shape(), "array")?;
        memoize(&self.array, "scaled identity array", || Ok(Array2::eye(n) * self.scalar))
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(&other * self.scalar) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(&other * self.scalar) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        self.with_scalar(scalar * self.scalar, self.positive && scalar > 0.0)
    }

    fn diagonal(&self) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(known_size(self.shape(), "diagonal")?, self.scalar))
    }

    fn fmt_params(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", scalar={}", self.scalar)
    }
}

impl Square for ScaledIdentity {
    fn log_abs_det(&self) -> Result<f64> {
        let n = known_size(self.shape(), "log determinant")?;
        Ok(n as f64 * self.scalar.abs().ln())
    }
}

impl Invertible for ScaledIdentity {
    fn inv(&self) -> Result<Matrix> { self.with_scalar(1.0 / self.scalar, self.positive) }
}

impl Symmetric for ScaledIdentity {
    fn eigval(&self) -> Result<Array1<f64>> { self.diagonal() }

    fn eigvec(&self) -> Result<Matrix> { Ok(Identity::new(self.size)) }
}

impl PositiveDefinite for ScaledIdentity {
    fn sqrt(&self) -> Result<Matrix> { ScaledIdentity::positive(self.scalar.sqrt(), self.size) }
}

impl Differentiable for ScaledIdentity {
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        let n = known_size(self.shape(), "log determinant gradient")?;
        Ok(Gradient::Scalar(n as f64 / self.scalar))
    }

    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        let norm_sq = vector.dot(&vector);
        Ok(Gradient::Scalar(-norm_sq / (self.scalar * self.scalar)))
    }
}
