// Not every test file uses every helper.
#![allow(dead_code)]

pub mod random;

/// Initialize logging for a test; safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

use ndarray::Array2;

/// Dense inverse, straight from the backend.
pub fn dense_inv(a: &Array2<f64>) -> Array2<f64> {
    let backend = strumat::linalg::current();
    let lu = backend.lu_factor(a.view()).unwrap();
    backend.lu_solve(&lu, Array2::eye(a.nrows()).view(), false).unwrap()
}

/// Dense `log |det a|`, straight from the backend.
pub fn dense_log_abs_det(a: &Array2<f64>) -> f64 {
    let lu = strumat::linalg::current().lu_factor(a.view()).unwrap();
    lu.u_diagonal().iter().map(|x| x.abs().ln()).sum()
}
