/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::{check_square, Backend, BackendError, BackendResult, LuFactor};

use ndarray::{Array1, Array2, ArrayView2, Axis, ShapeBuilder};
use ndarray_linalg::{Cholesky, Diag, Eigh, Factorize, LUFactorized, Solve, SolveTriangular, UPLO};

/// LAPACK-backed kernels, through `ndarray-linalg`.
#[derive(Debug, Default, Copy, Clone)]
pub struct LapackBackend;

fn lapack_err(op: &'static str) -> impl FnOnce(ndarray_linalg::error::LinalgError) -> BackendError {
    move |e| BackendError::Lapack { op, message: e.to_string() }
}

// getrf stores its output in the memory order of the input, and syev reads
// the transpose of a row-major input.  Working in column-major keeps `Lower`
// meaning the lower triangle of the array we were given.
fn fortran_copy(a: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = Array2::zeros(a.raw_dim().f());
    out.assign(&a);
    out
}

fn c_copy(a: ArrayView2<'_, f64>) -> Array2<f64> {
    a.as_standard_layout().into_owned()
}

impl Backend for LapackBackend {
    fn eigh(&self, a: ArrayView2<'_, f64>) -> BackendResult<(Array1<f64>, Array2<f64>)> {
        let n = check_square("eigh", &a)?;
        debug!("eigh: {0}x{0}", n);
        if n == 0 {
            return Ok((Array1::zeros(0), Array2::zeros((0, 0))));
        }
        fortran_copy(a).eigh(UPLO::Lower).map_err(lapack_err("eigh"))
    }

    fn cholesky(&self, a: ArrayView2<'_, f64>) -> BackendResult<Array2<f64>> {
        let n = check_square("cholesky", &a)?;
        debug!("cholesky: {0}x{0}", n);
        if n == 0 {
            return Ok(Array2::zeros((0, 0)));
        }
        // potrf reports a non-positive leading minor as a computational failure;
        // there is no other way for it to fail on a well-formed square input.
        c_copy(a).cholesky(UPLO::Lower).map_err(|_| BackendError::NotPositiveDefinite)
    }

    fn lu_factor(&self, a: ArrayView2<'_, f64>) -> BackendResult<LuFactor> {
        let n = check_square("lu_factor", &a)?;
        debug!("lu_factor: {0}x{0}", n);
        let factorized = fortran_copy(a).factorize().map_err(lapack_err("getrf"))?;
        if factorized.a.diag().iter().any(|&x| x == 0.0) {
            return Err(BackendError::Singular);
        }
        Ok(LuFactor { lu: factorized.a, pivots: factorized.ipiv })
    }

    fn lu_solve(&self, lu: &LuFactor, b: ArrayView2<'_, f64>, transposed: bool) -> BackendResult<Array2<f64>> {
        let factorized = LUFactorized {
            a: fortran_copy(lu.lu.view()),
            ipiv: lu.pivots.clone(),
        };

        let mut out = Array2::zeros(b.raw_dim());
        for (col_in, mut col_out) in b.axis_iter(Axis(1)).zip(out.axis_iter_mut(Axis(1))) {
            let x = match transposed {
                false => factorized.solve(&col_in),
                true => factorized.solve_t(&col_in),
            }.map_err(lapack_err("getrs"))?;
            col_out.assign(&x);
        }
        Ok(out)
    }

    fn solve_triangular(
        &self,
        a: ArrayView2<'_, f64>,
        b: ArrayView2<'_, f64>,
        lower: bool,
        transposed: bool,
    ) -> BackendResult<Array2<f64>> {
        check_square("solve_triangular", &a)?;
        if b.is_empty() {
            return Ok(b.to_owned());
        }
        // the transpose of a lower triangle is an upper triangle
        let (a, uplo) = match (transposed, lower) {
            (false, true) => (c_copy(a), UPLO::Lower),
            (false, false) => (c_copy(a), UPLO::Upper),
            (true, true) => (c_copy(a.t()), UPLO::Upper),
            (true, false) => (c_copy(a.t()), UPLO::Lower),
        };
        a.solve_triangular(uplo, Diag::NonUnit, &c_copy(b))
            .map_err(lapack_err("trtrs"))
    }

    fn sqrtm(&self, a: ArrayView2<'_, f64>) -> BackendResult<Array2<f64>> {
        check_square("sqrtm", &a)?;
        let (eigval, eigvec) = self.eigh(a)?;

        let scale = eigval.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let tol = scale * 1e-12;
        if eigval.iter().any(|&x| x < -tol) {
            return Err(BackendError::NotPositiveDefinite);
        }
        let root = eigval.mapv(|x| x.max(0.0).sqrt());
        Ok((&eigvec * &root).dot(&eigvec.t()))
    }
}
