/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Random operands for unit tests.

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub fn rng(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

pub fn random_array(rng: &mut StdRng, shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| rng.gen_range(-1.0..1.0))
}

pub fn random_vector(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0))
}

pub fn random_spd(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = random_array(rng, (n, n));
    a.dot(&a.t()) + Array2::<f64>::eye(n) * n as f64
}

pub fn random_symmetric(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = random_array(rng, (n, n));
    (&a + &a.t()) / 2.0
}

/// Lower triangular, with a diagonal kept away from zero.
pub fn random_lower(rng: &mut StdRng, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(r, c)| match r.cmp(&c) {
        std::cmp::Ordering::Less => 0.0,
        std::cmp::Ordering::Equal => rng.gen_range(1.0..2.0),
        std::cmp::Ordering::Greater => rng.gen_range(-1.0..1.0),
    })
}

/// Orthogonal matrix from the eigenvectors of a random symmetric matrix.
pub fn random_orthogonal(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = random_symmetric(rng, n);
    let (_, v) = strumat_linalg::current().eigh(a.view()).unwrap();
    v
}
