/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Differentiable, Gradient, Identity, Invertible, Matrix, Operator, PositiveDefinite, Result, Shape, Square, Symmetric};
use crate::memo::{memoize, sum_log_abs};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use once_cell::sync::OnceCell;

/// A matrix with nonzero entries only on its diagonal, parameterised by that diagonal.
#[derive(Debug)]
pub struct Diagonal {
    diagonal: Array1<f64>,
    positive: bool,
    array: OnceCell<Array2<f64>>,
}

impl Diagonal {
    pub fn new(diagonal: Array1<f64>) -> Matrix {
        Diagonal { diagonal, positive: false, array: OnceCell::new() }.into()
    }

    /// Positive definite diagonal matrix; every entry must be positive.
    pub fn positive(diagonal: Array1<f64>) -> Result<Matrix> {
        if !diagonal.iter().all(|&x| x > 0.0) {
            return Err(invalid!("diagonal values must all be positive"));
        }
        Ok(Diagonal { diagonal, positive: true, array: OnceCell::new() }.into())
    }

    pub fn is_positive(&self) -> bool { self.positive }

    fn with_diagonal(diagonal: Array1<f64>, positive: bool) -> Result<Matrix> {
        match positive {
            true => Diagonal::positive(diagonal),
            false => Ok(Diagonal::new(diagonal)),
        }
    }
}

impl Operator for Diagonal {
    fn kind(&self) -> &'static str {
        match self.positive {
            true => "PositiveDiagonal",
            false => "Diagonal",
        }
    }

    fn shape(&self) -> Shape {
        let n = self.diagonal.len();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "diagonal array", || Ok(Array2::from_diag(&self.diagonal)))
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(&self.diagonal.view().insert_axis(Axis(1)) * &other)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(&other * &self.diagonal)
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        Diagonal::with_diagonal(&self.diagonal * scalar, self.positive && scalar > 0.0)
    }

    fn diagonal(&self) -> Result<Array1<f64>> { Ok(self.diagonal.clone()) }
}

impl Square for Diagonal {
    fn log_abs_det(&self) -> Result<f64> { Ok(sum_log_abs(self.diagonal.iter().cloned())) }
}

impl Invertible for Diagonal {
    fn inv(&self) -> Result<Matrix> {
        Diagonal::with_diagonal(self.diagonal.mapv(|x| 1.0 / x), self.positive)
    }
}

impl Symmetric for Diagonal {
    fn eigval(&self) -> Result<Array1<f64>> { Ok(self.diagonal.clone()) }

    fn eigvec(&self) -> Result<Matrix> { Ok(Identity::new(Some(self.diagonal.len()))) }
}

impl PositiveDefinite for Diagonal {
    fn sqrt(&self) -> Result<Matrix> { Diagonal::positive(self.diagonal.mapv(f64::sqrt)) }
}

impl Differentiable for Diagonal {
    fn grad_log_abs_det(&self) -> Result<Gradient> {
        Ok(Gradient::Vector(self.diagonal.mapv(|x| 1.0 / x)))
    }

    fn grad_quadratic_form_inv(&self, vector: ArrayView1<'_, f64>) -> Result<Gradient> {
        let inv_vector = &vector / &self.diagonal;
        Ok(Gradient::Vector(-(&inv_vector * &inv_vector)))
    }
}

#[cfg(test)]
mod tests {
    use crate::Diagonal;
    use crate::test_util::{random_array, rng};
    use ndarray::{arr1, Array2};

    #[test]
    fn inverse_and_log_det() {
        let m = Diagonal::new(arr1(&[1.0, 2.0, 4.0]));
        let inv = m.inv().unwrap();
        assert_eq!(inv.kind(), "Diagonal");
        assert_close!(inv.diagonal().unwrap(), arr1(&[1.0, 0.5, 0.25]));
        assert_close!(m.log_abs_det().unwrap(), 8f64.ln());
    }

    #[test]
    fn multiply_matches_dense() {
        let mut rng = rng(20);
        let m = Diagonal::new(arr1(&[1.5, -2.0, 0.5]));
        let dense = m.array().unwrap().clone();
        let x = random_array(&mut rng, (3, 2));
        let y = random_array(&mut rng, (4, 3));
        assert_close!(abs=1e-12, m.dot(x.view()).unwrap(), dense.dot(&x));
        assert_close!(abs=1e-12, m.rdot(y.view()).unwrap(), y.dot(&dense));
        assert_eq!(dense, Array2::from_diag(&arr1(&[1.5, -2.0, 0.5])));
    }

    #[test]
    fn positivity() {
        assert!(Diagonal::positive(arr1(&[1.0, 0.0])).is_err());
        assert!(Diagonal::positive(arr1(&[1.0, -1.0])).is_err());

        let m = Diagonal::positive(arr1(&[4.0, 9.0])).unwrap();
        assert!(m.is_positive_definite());
        assert!(m.inv().unwrap().is_positive_definite());
        assert!(m.scale(2.0).unwrap().is_positive_definite());
        assert!(!m.scale(-2.0).unwrap().is_positive_definite());
        assert_close!(m.sqrt().unwrap().diagonal().unwrap(), arr1(&[2.0, 3.0]));
        assert!(!Diagonal::new(arr1(&[4.0, 9.0])).is_positive_definite());
    }

    #[test]
    fn gradients() {
        let m = Diagonal::new(arr1(&[2.0, -4.0]));
        let grad = m.grad_log_abs_det().unwrap();
        assert_close!(grad.as_vector().unwrap(), &arr1(&[0.5, -0.25]));
        let grad = m.grad_quadratic_form_inv(arr1(&[1.0, 2.0]).view()).unwrap();
        assert_close!(grad.as_vector().unwrap(), &arr1(&[-0.25, -0.25]));
    }
}
