//! Seeded random operands.

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub fn rng(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

pub fn array(rng: &mut StdRng, shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| rng.gen_range(-1.0..1.0))
}

pub fn vector(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0))
}

/// Entries of magnitude in `[0.5, 2)` with random signs.
pub fn nonzero_vector(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |_| {
        let x = rng.gen_range(0.5..2.0);
        if rng.gen::<bool>() { x } else { -x }
    })
}

pub fn positive_vector(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |_| rng.gen_range(0.5..2.0))
}

pub fn spd(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = array(rng, (n, n));
    a.dot(&a.t()) + Array2::<f64>::eye(n) * n as f64
}

pub fn symmetric(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = array(rng, (n, n));
    (&a + &a.t()) / 2.0
}

/// Diagonally dominant, so comfortably nonsingular.
pub fn square(rng: &mut StdRng, n: usize) -> Array2<f64> {
    array(rng, (n, n)) + Array2::<f64>::eye(n) * n as f64
}

/// Lower triangular, with a diagonal kept away from zero.
pub fn lower(rng: &mut StdRng, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(r, c)| match r.cmp(&c) {
        std::cmp::Ordering::Less => 0.0,
        std::cmp::Ordering::Equal => rng.gen_range(1.0..2.0),
        std::cmp::Ordering::Greater => rng.gen_range(-1.0..1.0),
    })
}

pub fn orthogonal(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let a = symmetric(rng, n);
    let (_, v) = strumat::linalg::current().eigh(a.view()).unwrap();
    v
}

/// Symmetric and indefinite, with eigenvalues kept away from zero.
pub fn indefinite(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let shift = Array1::from_shape_fn(n, |i| match i % 2 {
        0 => n as f64 + 1.0,
        _ => -(n as f64 + 1.0),
    });
    symmetric(rng, n) + Array2::from_diag(&shift)
}
