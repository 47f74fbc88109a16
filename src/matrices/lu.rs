/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{Invertible, Matrix, Operator, Result, Shape, Square, Transpose};
use crate::memo::{memoize, require_square, sum_log_abs};

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use once_cell::sync::OnceCell;
use strumat_linalg::{self as backend, LuFactor};

/// A pivoted LU factorization shared between a matrix, its inverse and transposes.
#[derive(Debug, Clone)]
struct SharedLu {
    factor: Arc<LuFactor>,
    // whether this is the factorization of the transpose
    transposed: bool,
}

impl SharedLu {
    fn flipped(&self) -> SharedLu {
        SharedLu { factor: self.factor.clone(), transposed: !self.transposed }
    }

    fn scaled(&self, scalar: f64) -> SharedLu {
        SharedLu { factor: Arc::new(self.factor.scaled(scalar)), transposed: self.transposed }
    }

    fn log_abs_det(&self) -> f64 {
        sum_log_abs(self.factor.lu.diag().iter().cloned())
    }

    fn check_size(&self, n: usize) -> Result<()> {
        match self.factor.lu.dim() {
            (r, c) if r == n && c == n && self.factor.pivots.len() == n => Ok(()),
            (r, c) => Err(invalid!("LU factors are {}x{}, expected {}x{}", r, c, n, n)),
        }
    }
}

/// A dense nonsingular square matrix.
///
/// Its LU factorization is computed on first use and then shared with its inverse.
#[derive(Debug)]
pub struct DenseSquare {
    array: Array2<f64>,
    lu: OnceCell<SharedLu>,
}

impl DenseSquare {
    pub fn new(array: Array2<f64>) -> Result<Matrix> {
        require_square("dense square matrix", &array.view())?;
        Ok(DenseSquare { array, lu: OnceCell::new() }.into())
    }

    /// With a precomputed factorization of `array` (or of `array.T`, if `transposed`).
    pub fn with_lu(array: Array2<f64>, lu: LuFactor, transposed: bool) -> Result<Matrix> {
        let n = require_square("dense square matrix", &array.view())?;
        let lu = SharedLu { factor: Arc::new(lu), transposed };
        lu.check_size(n)?;
        Ok(DenseSquare::from_parts(array, Some(lu)))
    }

    fn from_parts(array: Array2<f64>, lu: Option<SharedLu>) -> Matrix {
        let cell = OnceCell::new();
        if let Some(lu) = lu {
            let _ = cell.set(lu);
        }
        DenseSquare { array, lu: cell }.into()
    }

    fn shared_lu(&self) -> Result<&SharedLu> {
        memoize(&self.lu, "LU factorization", || {
            let factor = backend::current().lu_factor(self.array.view())?;
            Ok(SharedLu { factor: Arc::new(factor), transposed: false })
        })
    }

    /// The LU factorization, and whether it is of the transpose.
    pub fn lu(&self) -> Result<(&LuFactor, bool)> {
        let lu = self.shared_lu()?;
        Ok((&lu.factor, lu.transposed))
    }
}

impl Operator for DenseSquare {
    fn kind(&self) -> &'static str { "DenseSquare" }

    fn shape(&self) -> Shape {
        let n = self.array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> { Ok(&self.array) }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(self.array.dot(&other)) }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> { Ok(other.dot(&self.array)) }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let lu = self.lu.get().map(|lu| lu.scaled(scalar));
        Ok(DenseSquare::from_parts(&self.array * scalar, lu))
    }
}

impl Transpose for DenseSquare {
    /// Shares the factorization only if it has already been computed.
    fn transpose(&self) -> Result<Matrix> {
        let lu = self.lu.get().map(SharedLu::flipped);
        Ok(DenseSquare::from_parts(self.array.t().to_owned(), lu))
    }
}

impl Square for DenseSquare {
    fn log_abs_det(&self) -> Result<f64> { Ok(self.shared_lu()?.log_abs_det()) }
}

impl Invertible for DenseSquare {
    fn inv(&self) -> Result<Matrix> {
        let lu = self.shared_lu()?.clone();
        Ok(InverseLuFactoredSquare::from_parts(self.array.clone(), lu))
    }
}

//---------------------------------------------------------

/// The inverse of a dense square matrix, applied by solving with its LU factors.
#[derive(Debug)]
pub struct InverseLuFactoredSquare {
    inv_array: Array2<f64>,
    inv_lu: SharedLu,
    array: OnceCell<Array2<f64>>,
}

impl InverseLuFactoredSquare {
    /// `inv_lu` factorizes `inv_array` (or its transpose, if `transposed`).
    pub fn new(inv_array: Array2<f64>, inv_lu: LuFactor, transposed: bool) -> Result<Matrix> {
        let n = require_square("inverse matrix", &inv_array.view())?;
        let inv_lu = SharedLu { factor: Arc::new(inv_lu), transposed };
        inv_lu.check_size(n)?;
        Ok(InverseLuFactoredSquare::from_parts(inv_array, inv_lu))
    }

    fn from_parts(inv_array: Array2<f64>, inv_lu: SharedLu) -> Matrix {
        InverseLuFactoredSquare { inv_array, inv_lu, array: OnceCell::new() }.into()
    }
}

impl Operator for InverseLuFactoredSquare {
    fn kind(&self) -> &'static str { "InverseLuFactoredSquare" }

    fn shape(&self) -> Shape {
        let n = self.inv_array.nrows();
        (Some(n), Some(n))
    }

    fn array(&self) -> Result<&Array2<f64>> {
        memoize(&self.array, "inverse LU array", || {
            self.left_multiply(Array2::eye(self.inv_array.nrows()).view())
        })
    }

    fn left_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let lu = &self.inv_lu;
        Ok(backend::current().lu_solve(&lu.factor, other, lu.transposed)?)
    }

    fn right_multiply(&self, other: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let lu = &self.inv_lu;
        let solved = backend::current().lu_solve(&lu.factor, other.t(), !lu.transposed)?;
        Ok(solved.reversed_axes())
    }

    fn scalar_multiply(&self, scalar: f64) -> Result<Matrix> {
        let inv_lu = self.inv_lu.scaled(1.0 / scalar);
        Ok(InverseLuFactoredSquare::from_parts(&self.inv_array / scalar, inv_lu))
    }
}

impl Transpose for InverseLuFactoredSquare {
    fn transpose(&self) -> Result<Matrix> {
        Ok(InverseLuFactoredSquare::from_parts(self.inv_array.t().to_owned(), self.inv_lu.flipped()))
    }
}

impl Square for InverseLuFactoredSquare {
    fn log_abs_det(&self) -> Result<f64> { Ok(-self.inv_lu.log_abs_det()) }
}

impl Invertible for InverseLuFactoredSquare {
    fn inv(&self) -> Result<Matrix> {
        Ok(DenseSquare::from_parts(self.inv_array.clone(), Some(self.inv_lu.clone())))
    }
}

#[cfg(test)]
mod tests {
    use crate::{DenseSquare, InverseLuFactoredSquare, Matrix};
    use crate::test_util::{random_array, rng};
    use ndarray::{arr2, Array2};

    fn lu_of(m: &Matrix) -> *const strumat_linalg::LuFactor {
        match m {
            Matrix::DenseSquare(m) => m.lu().unwrap().0,
            other => panic!("unexpected: {}", other),
        }
    }

    #[test]
    fn inverse_round_trip() {
        let mut rng = rng(60);
        let a = random_array(&mut rng, (5, 5)) + Array2::<f64>::eye(5) * 3.0;
        let m = DenseSquare::new(a.clone()).unwrap();
        let inv = m.inv().unwrap();
        assert_eq!(inv.kind(), "InverseLuFactoredSquare");

        let eye = Array2::<f64>::eye(5);
        assert_close!(abs=1e-10, inv.dot(a.view()).unwrap(), eye.view());
        assert_close!(abs=1e-10, inv.rdot(a.view()).unwrap(), eye.view());
        assert_close!(abs=1e-10, m.dot(inv.array().unwrap().view()).unwrap(), eye.view());
        assert_close!(abs=1e-10, inv.inv().unwrap().array().unwrap().to_owned(), a.view());
        assert_close!(abs=1e-10, m.log_abs_det().unwrap(), -inv.log_abs_det().unwrap());
    }

    #[test]
    fn log_det_of_known_matrix() {
        let m = DenseSquare::new(arr2(&[[0.0, 2.0], [3.0, 1.0]])).unwrap();
        assert_close!(m.log_abs_det().unwrap(), 6f64.ln());
    }

    #[test]
    fn transposes_share_computed_factors() {
        let mut rng = rng(61);
        let a = random_array(&mut rng, (4, 4)) + Array2::<f64>::eye(4) * 3.0;
        let m = DenseSquare::new(a.clone()).unwrap();
        let inv = m.inv().unwrap();
        let t = m.transpose().unwrap();
        assert_eq!(lu_of(&t), lu_of(&m));

        let inv_t = inv.transpose().unwrap();
        let expected = a.t().to_owned();
        assert_close!(abs=1e-10, inv_t.dot(expected.view()).unwrap(), Array2::<f64>::eye(4));
        assert_close!(abs=1e-10, t.inv().unwrap().dot(expected.view()).unwrap(), Array2::<f64>::eye(4));
        assert_close!(abs=1e-10, t.log_abs_det().unwrap(), m.log_abs_det().unwrap());
    }

    #[test]
    fn scaling_rescales_factors() {
        let mut rng = rng(62);
        let a = random_array(&mut rng, (4, 4)) + Array2::<f64>::eye(4) * 3.0;
        let m = DenseSquare::new(a.clone()).unwrap();
        let inv = m.inv().unwrap();

        let scaled = m.scale(-2.0).unwrap();
        let expected = &a * -2.0;
        assert_close!(abs=1e-10, scaled.log_abs_det().unwrap(), m.log_abs_det().unwrap() + 4.0 * 2f64.ln());
        assert_close!(abs=1e-10, scaled.inv().unwrap().dot(expected.view()).unwrap(), Array2::<f64>::eye(4));

        let scaled_inv = inv.scale(-2.0).unwrap();
        let expected = &a * -0.5;
        assert_close!(abs=1e-10, scaled_inv.dot(expected.view()).unwrap(), Array2::<f64>::eye(4));
        assert_close!(abs=1e-10, scaled_inv.log_abs_det().unwrap(), inv.log_abs_det().unwrap() + 4.0 * 2f64.ln());
    }

    #[test]
    fn singular_matrices_fail_on_use() {
        let m = DenseSquare::new(arr2(&[[1.0, 2.0], [2.0, 4.0]])).unwrap();
        assert!(m.inv().is_err());
        assert!(m.log_abs_det().is_err());
    }

    #[test]
    fn precomputed_factors() {
        let mut rng = rng(63);
        let a = random_array(&mut rng, (3, 3)) + Array2::<f64>::eye(3) * 3.0;
        let lu = strumat_linalg::current().lu_factor(a.view()).unwrap();
        let m = DenseSquare::with_lu(a.t().to_owned(), lu.clone(), true).unwrap();
        let expected = a.t().to_owned();
        assert_close!(abs=1e-10, m.inv().unwrap().dot(expected.view()).unwrap(), Array2::<f64>::eye(3));

        let inv = InverseLuFactoredSquare::new(a.clone(), lu.clone(), false).unwrap();
        assert_close!(abs=1e-10, inv.dot(a.view()).unwrap(), Array2::<f64>::eye(3));
        assert!(DenseSquare::with_lu(Array2::eye(2), lu, false).is_err());
    }
}
