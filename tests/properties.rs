//! Algebraic properties that every structure must agree with its dense array on.

#[macro_use]
extern crate strumat_assert_close;

mod shared;
use self::shared::random;

use ndarray::{arr1, Array1, Array2};
use rand::rngs::StdRng;

use strumat::{BlockColumn, BlockDiagonal, BlockRow, DenseDefinite, DensePositiveDefiniteProduct, DenseRectangular};
use strumat::{DenseSquare, DenseSymmetric, Diagonal, Eigendecomposed, Identity, InverseTriangular, LowRankUpdate};
use strumat::{Matrix, Orthogonal, ScaledIdentity, ScaledOrthogonal, SoftAbsRegularised, Triangular, TriangularFactoredDefinite};

const N: usize = 5;

fn square_zoo(rng: &mut StdRng) -> Vec<Matrix> {
    let mut out = vec![
        Identity::new(Some(N)),
        ScaledIdentity::new(-1.5, Some(N)).unwrap(),
        ScaledIdentity::positive(2.5, Some(N)).unwrap(),
        Diagonal::new(random::nonzero_vector(rng, N)),
        Diagonal::positive(random::positive_vector(rng, N)).unwrap(),
        Triangular::new(random::lower(rng, N), true).unwrap(),
        Triangular::new(random::lower(rng, N).reversed_axes(), false).unwrap(),
        InverseTriangular::new(random::lower(rng, N), true).unwrap(),
        Orthogonal::new(random::orthogonal(rng, N)).unwrap(),
        ScaledOrthogonal::new(-2.0, random::orthogonal(rng, N)).unwrap(),
        TriangularFactoredDefinite::from_array(random::lower(rng, N), true, 1.0).unwrap(),
        TriangularFactoredDefinite::from_array(random::lower(rng, N), true, -1.0).unwrap(),
        DenseDefinite::positive(random::spd(rng, N)).unwrap(),
        DenseDefinite::new(-random::spd(rng, N), false).unwrap(),
        DensePositiveDefiniteProduct::from_array(
            random::array(rng, (N, N + 2)),
            Some(Diagonal::positive(random::positive_vector(rng, N + 2)).unwrap()),
        ).unwrap(),
        DenseSymmetric::new(random::indefinite(rng, N)).unwrap(),
        Eigendecomposed::new(
            Orthogonal::new(random::orthogonal(rng, N)).unwrap(),
            random::nonzero_vector(rng, N),
        ).unwrap(),
        Eigendecomposed::positive(
            Orthogonal::new(random::orthogonal(rng, N)).unwrap(),
            random::positive_vector(rng, N),
        ).unwrap(),
        SoftAbsRegularised::new(random::indefinite(rng, N), 1.0).unwrap(),
    ];

    let dense_square = DenseSquare::new(random::square(rng, N)).unwrap();
    out.push(dense_square.inv().unwrap());
    out.push(dense_square);

    out.push(BlockDiagonal::square(vec![
        Triangular::new(random::lower(rng, 2), true).unwrap(),
        DenseSquare::new(random::square(rng, 3)).unwrap(),
    ]).unwrap());
    out.push(BlockDiagonal::symmetric(vec![
        Diagonal::new(random::nonzero_vector(rng, 2)),
        DenseSymmetric::new(random::indefinite(rng, 3)).unwrap(),
    ]).unwrap());
    out.push(BlockDiagonal::positive_definite(vec![
        DenseDefinite::positive(random::spd(rng, 3)).unwrap(),
        ScaledIdentity::positive(0.5, Some(2)).unwrap(),
    ]).unwrap());

    out.push(LowRankUpdate::square(
        DenseRectangular::new(random::array(rng, (N, 2)) * 0.3),
        DenseRectangular::new(random::array(rng, (2, N)) * 0.3),
        DenseSquare::new(random::square(rng, N)).unwrap(),
        None, None, 1.0,
    ).unwrap());
    out.push(LowRankUpdate::symmetric(
        DenseRectangular::new(random::array(rng, (N, 2)) * 0.3),
        Diagonal::new(random::nonzero_vector(rng, N) * 2.0),
        Some(Diagonal::new(arr1(&[1.0, -1.0]))),
        None, 1.0,
    ).unwrap());
    out.push(LowRankUpdate::positive_definite(
        DenseRectangular::new(random::array(rng, (N, 2))),
        DenseDefinite::positive(random::spd(rng, N)).unwrap(),
        Some(Diagonal::positive(random::positive_vector(rng, 2)).unwrap()),
        None, 1.0,
    ).unwrap());
    out
}

fn rectangular_zoo(rng: &mut StdRng) -> Vec<Matrix> {
    vec![
        DenseRectangular::new(random::array(rng, (N, 3))),
        BlockRow::new(vec![
            DenseRectangular::new(random::array(rng, (N, 2))),
            Diagonal::new(random::nonzero_vector(rng, N)),
        ]).unwrap(),
        BlockColumn::new(vec![
            DenseRectangular::new(random::array(rng, (2, 4))),
            Triangular::new(random::lower(rng, 4), true).unwrap(),
        ]).unwrap(),
        Diagonal::new(random::nonzero_vector(rng, N))
            .matmul(&DenseRectangular::new(random::array(rng, (N, 3)))).unwrap(),
        DenseSquare::new(random::square(rng, N)).unwrap()
            .matmul(&Triangular::new(random::lower(rng, N), false).unwrap()).unwrap()
            .matmul(&DenseRectangular::new(random::array(rng, (N, 2)))).unwrap(),
    ]
}

fn dims(m: &Matrix) -> (usize, usize) {
    (m.rows().unwrap(), m.cols().unwrap())
}

fn check_multiply(m: &Matrix, rng: &mut StdRng) {
    let (rows, cols) = dims(m);
    let dense = m.array().unwrap();

    let x = random::array(rng, (cols, 3));
    assert_close!(abs=1e-9, m.dot(x.view()).unwrap(), dense.dot(&x), "{} @ x", m);
    let y = random::array(rng, (2, rows));
    assert_close!(abs=1e-9, m.rdot(y.view()).unwrap(), y.dot(dense), "y @ {}", m);
    let v = random::vector(rng, cols);
    assert_close!(abs=1e-9, m.dot_vec(v.view()).unwrap(), dense.dot(&v), "{} @ v", m);

    assert_close!(abs=1e-9, m.diagonal().unwrap(), dense.diag().to_owned(), "diagonal of {}", m);
}

fn check_transpose(m: &Matrix) {
    let dense = m.array().unwrap();
    let t = m.transpose().unwrap();
    assert_eq!(t.shape(), (m.cols(), m.rows()));
    assert_close!(abs=1e-9, t.array().unwrap(), &dense.t().to_owned(), "{}.T", m);
    let tt = t.transpose().unwrap();
    assert_close!(abs=1e-9, tt.array().unwrap(), dense, "{}.T.T", m);
}

fn check_scaling(m: &Matrix) {
    let (a, b) = (-2.5, 0.3);
    let dense = m.array().unwrap();
    let ab = m.scale(b).unwrap().scale(a).unwrap();
    assert_close!(abs=1e-9, ab.array().unwrap(), &(dense * (a * b)), "(a*b)*{}", m);
    let round_trip = (&m.scale(a).unwrap() / a).unwrap();
    assert_close!(abs=1e-9, round_trip.array().unwrap(), dense, "(1/a)*(a*{})", m);
}

fn check_inverse(m: &Matrix) {
    let (n, _) = dims(m);
    let dense = m.array().unwrap();
    let inv = m.inv().unwrap();
    assert_close!(abs=1e-8, inv.array().unwrap(), &shared::dense_inv(dense), "{}.inv", m);
    let inv_inv = inv.inv().unwrap();
    assert_close!(abs=1e-8, inv_inv.array().unwrap(), dense, "{}.inv.inv", m);
    assert_close!(abs=1e-8, m.dot(inv.array().unwrap().view()).unwrap(), Array2::<f64>::eye(n), "{} @ inv", m);
    assert_close!(abs=1e-8, inv.log_abs_det().unwrap(), -m.log_abs_det().unwrap(), "{}.inv log det", m);
}

fn check_symmetric(m: &Matrix) {
    let dense = m.array().unwrap();
    let eigval = m.eigval().unwrap();
    let eigvec = m.eigvec().unwrap();
    let eigvec = eigvec.array().unwrap();
    let rebuilt = eigvec.dot(&Array2::from_diag(&eigval)).dot(&eigvec.t());
    assert_close!(abs=1e-8, rebuilt, dense.clone(), "eigendecomposition of {}", m);
}

fn check_sqrt(m: &Matrix) {
    let root = m.sqrt().unwrap();
    let root_t = root.transpose().unwrap();
    let product = root.dot(root_t.array().unwrap().view()).unwrap();
    assert_close!(abs=1e-8, product, m.array().unwrap().clone(), "sqrt of {}", m);
}

#[test]
fn square_structures_agree_with_their_arrays() {
    shared::init_logger();
    let mut rng = random::rng(1);
    for m in square_zoo(&mut rng) {
        check_multiply(&m, &mut rng);
        check_transpose(&m);
        check_scaling(&m);
        assert_close!(abs=1e-8, m.log_abs_det().unwrap(), shared::dense_log_abs_det(m.array().unwrap()), "log det of {}", m);
        if m.is_invertible() {
            check_inverse(&m);
        }
        if m.is_symmetric() {
            check_symmetric(&m);
        }
        if m.is_positive_definite() {
            check_sqrt(&m);
        }
    }
}

#[test]
fn rectangular_structures_agree_with_their_arrays() {
    shared::init_logger();
    let mut rng = random::rng(2);
    for m in rectangular_zoo(&mut rng) {
        check_multiply(&m, &mut rng);
        check_transpose(&m);
        check_scaling(&m);
        assert!(!m.is_square(), "{}", m);
        assert!(m.inv().is_err());
    }
}

#[test]
fn capabilities_are_consistent() {
    let mut rng = random::rng(3);
    for m in square_zoo(&mut rng) {
        if m.is_positive_definite() {
            assert!(m.is_symmetric() && m.is_invertible(), "{}", m);
        }
        if m.is_invertible() || m.is_symmetric() {
            assert!(m.is_square(), "{}", m);
        }
        if m.is_differentiable() {
            assert!(m.is_invertible(), "{}", m);
        }
        if !m.is_positive_definite() {
            assert!(m.sqrt().is_err(), "{}", m);
        }
    }
}

#[test]
fn diagonal_inverse_and_log_det() {
    let m = Diagonal::new(arr1(&[1.0, 2.0, 4.0]));
    let inv = m.inv().unwrap();
    match &inv {
        Matrix::Diagonal(_) => {},
        other => panic!("expected a diagonal inverse, got {}", other),
    }
    assert_close!(inv.diagonal().unwrap(), arr1(&[1.0, 0.5, 0.25]));
    assert_close!(m.log_abs_det().unwrap(), 8f64.ln());
}

#[test]
fn block_diagonal_log_det_is_a_sum() {
    let mut rng = random::rng(4);
    let a = DenseDefinite::positive(random::spd(&mut rng, 3)).unwrap();
    let b = DenseDefinite::positive(random::spd(&mut rng, 4)).unwrap();
    let m = BlockDiagonal::positive_definite(vec![a.clone(), b.clone()]).unwrap();

    assert_eq!(m.shape(), (Some(7), Some(7)));
    let expected = a.log_abs_det().unwrap() + b.log_abs_det().unwrap();
    assert_close!(m.log_abs_det().unwrap(), expected);
    assert_close!(abs=1e-10, m.log_abs_det().unwrap(), shared::dense_log_abs_det(m.array().unwrap()));
    check_sqrt(&m);
    check_inverse(&m);
}

#[test]
fn softabs_limits() {
    let m = SoftAbsRegularised::new(Array2::eye(2), 1e6).unwrap();
    let m = match &m {
        Matrix::SoftAbsRegularised(m) => m.clone(),
        other => panic!("unexpected {}", other),
    };
    assert_close!(rel=1e-2, m.softabs(1e-8), 1e-6);
    assert_close!(rel=1e-4, m.softabs(10.0), 10.0);
    assert_close!(rel=1e-4, m.softabs(-10.0), 10.0);
    assert_close!(m.softabs(0.0), 1e-6);
}

#[test]
fn softabs_eigenvalues() {
    let array = Array2::from_diag(&arr1(&[-3.0, 1e-12, 2.0]));
    let m = SoftAbsRegularised::new(array, 100.0).unwrap();
    let mut eigval = m.eigval().unwrap().to_vec();
    eigval.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_close!(rel=1e-6, eigval, vec![1e-2, 2.0, 3.0]);
    assert!(m.is_positive_definite());
}

#[test]
fn scaling_positive_definite_by_a_negative() {
    let mut rng = random::rng(5);
    let m = DenseDefinite::positive(random::spd(&mut rng, 3)).unwrap();
    let neg = m.neg().unwrap();
    assert!(neg.is_symmetric());
    assert!(!neg.is_positive_definite());
    assert_close!(neg.log_abs_det().unwrap(), m.log_abs_det().unwrap());

    let eigval: Array1<f64> = m.eigval().unwrap();
    assert_close!(abs=1e-10, neg.eigval().unwrap().mapv(f64::abs).sum(), eigval.sum());
}
