/* ************************************************************************ **
** This file is part of strumat, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Describing structured matrices in YAML.
//!
//! ```yaml
//! low-rank-update:
//!   base:
//!     diagonal: { diagonal: [1.0, 2.0, 3.0], positive: true }
//!   factor: [[1.0], [0.5], [0.0]]
//! ```

use crate::{BlockDiagonal, DenseDefinite, DenseRectangular, DenseSquare, DenseSymmetric, Diagonal};
use crate::{Identity, LowRankUpdate, Matrix, MatrixError, Result, ScaledIdentity, SoftAbsRegularised};

use ndarray::{Array1, Array2};
use serde::Deserialize;

/// A structured matrix, as written in a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixSpec {
    Identity {
        #[serde(default)]
        size: Option<usize>,
    },
    ScaledIdentity {
        scalar: f64,
        #[serde(default)]
        size: Option<usize>,
        #[serde(default)]
        positive: bool,
    },
    Diagonal {
        diagonal: Vec<f64>,
        #[serde(default)]
        positive: bool,
    },
    DensePositiveDefinite {
        array: Vec<Vec<f64>>,
    },
    DenseSquare {
        array: Vec<Vec<f64>>,
    },
    DenseSymmetric {
        array: Vec<Vec<f64>>,
    },
    /// Eigenvalue-regularised positive definite matrix.
    SoftAbs {
        array: Vec<Vec<f64>>,
        coeff: f64,
    },
    /// The strongest structure shared by all blocks is used.
    BlockDiagonal {
        blocks: Vec<MatrixSpec>,
    },
    /// Positive definite `base + sign * factor @ inner @ factor.T`.
    LowRankUpdate {
        base: Box<MatrixSpec>,
        factor: Vec<Vec<f64>>,
        #[serde(default)]
        inner: Option<Box<MatrixSpec>>,
        #[serde(default = "default_sign")]
        sign: f64,
    },
}

fn default_sign() -> f64 { 1.0 }

impl MatrixSpec {
    /// Parse a spec, warning about (and otherwise ignoring) unrecognized keys.
    pub fn from_yaml_str(s: &str) -> Result<MatrixSpec> {
        // serde_ignored needs a Deserializer, which a Value provides; but errors
        // coming out of it lose their location information.  So on failure the
        // string is parsed again directly for a better message.
        let value: serde_yaml::Value = serde_yaml::from_str(s)?;
        match serde_ignored::deserialize(value, |path| warn!("Unused config item (possible typo?): {}", path)) {
            Ok(spec) => Ok(spec),
            Err(_) => Ok(serde_yaml::from_str(s)?),
        }
    }

    pub fn build(&self) -> Result<Matrix> {
        match self {
            MatrixSpec::Identity { size } => Ok(Identity::new(*size)),
            MatrixSpec::ScaledIdentity { scalar, size, positive: true } => ScaledIdentity::positive(*scalar, *size),
            MatrixSpec::ScaledIdentity { scalar, size, positive: false } => ScaledIdentity::new(*scalar, *size),
            MatrixSpec::Diagonal { diagonal, positive: true } => Diagonal::positive(Array1::from(diagonal.clone())),
            MatrixSpec::Diagonal { diagonal, positive: false } => Ok(Diagonal::new(Array1::from(diagonal.clone()))),
            MatrixSpec::DensePositiveDefinite { array } => DenseDefinite::positive(to_array(array)?),
            MatrixSpec::DenseSquare { array } => DenseSquare::new(to_array(array)?),
            MatrixSpec::DenseSymmetric { array } => DenseSymmetric::new(to_array(array)?),
            MatrixSpec::SoftAbs { array, coeff } => SoftAbsRegularised::new(to_array(array)?, *coeff),
            MatrixSpec::BlockDiagonal { blocks } => {
                let blocks = blocks.iter().map(MatrixSpec::build).collect::<Result<Vec<_>>>()?;
                if blocks.iter().all(Matrix::is_positive_definite) {
                    BlockDiagonal::positive_definite(blocks)
                } else if blocks.iter().all(Matrix::is_symmetric) {
                    BlockDiagonal::symmetric(blocks)
                } else {
                    BlockDiagonal::square(blocks)
                }
            },
            MatrixSpec::LowRankUpdate { base, factor, inner, sign } => {
                let inner = match inner {
                    Some(inner) => Some(inner.build()?),
                    None => None,
                };
                let factor = DenseRectangular::new(to_array(factor)?);
                LowRankUpdate::positive_definite(factor, base.build()?, inner, None, *sign)
            },
        }
    }
}

fn to_array(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != ncols) {
        return Err(MatrixError::Config(format!("ragged array: row of length {} (expected {})", row.len(), ncols)));
    }
    let flat = rows.iter().flat_map(|row| row.iter().cloned()).collect::<Vec<_>>();
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| MatrixError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn nested_spec() {
        let _ = env_logger::builder().is_test(true).try_init();
        let spec = MatrixSpec::from_yaml_str("
block-diagonal:
  blocks:
    - diagonal: { diagonal: [1.0, 4.0], positive: true }
    - dense-positive-definite:
        array: [[2.0, 1.0], [1.0, 2.0]]
").unwrap();
        let m = spec.build().unwrap();
        assert_eq!(m.kind(), "PositiveDefiniteBlockDiagonal");
        assert_close!(m.log_abs_det().unwrap(), 4f64.ln() + 3f64.ln());
    }

    #[test]
    fn structure_follows_the_blocks() {
        let spec = MatrixSpec::BlockDiagonal {
            blocks: vec![
                MatrixSpec::Diagonal { diagonal: vec![1.0, -4.0], positive: false },
                MatrixSpec::ScaledIdentity { scalar: 2.0, size: Some(2), positive: true },
            ],
        };
        assert_eq!(spec.build().unwrap().kind(), "SymmetricBlockDiagonal");

        let spec = MatrixSpec::BlockDiagonal {
            blocks: vec![MatrixSpec::DenseSquare { array: vec![vec![1.0, 2.0], vec![3.0, 4.0]] }],
        };
        assert_eq!(spec.build().unwrap().kind(), "SquareBlockDiagonal");
    }

    #[test]
    fn low_rank_update() {
        let spec = MatrixSpec::from_yaml_str("
low-rank-update:
  base:
    scaled-identity: { scalar: 2.0, size: 3, positive: true }
  factor: [[1.0], [0.5], [0.0]]
").unwrap();
        let m = spec.build().unwrap();
        assert!(m.is_positive_definite());
        let expected = arr2(&[
            [3.0, 0.5, 0.0],
            [0.5, 2.25, 0.0],
            [0.0, 0.0, 2.0],
        ]);
        assert_close!(abs=1e-12, m.array().unwrap().view(), expected.view());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let _ = env_logger::builder().is_test(true).try_init();
        let spec = MatrixSpec::from_yaml_str("
soft-abs:
  array: [[1.0, 0.0], [0.0, -1.0]]
  coeff: 2.0
  cofe: 3.0
").unwrap();
        assert_eq!(spec, MatrixSpec::SoftAbs {
            array: vec![vec![1.0, 0.0], vec![0.0, -1.0]],
            coeff: 2.0,
        });
        assert!(spec.build().unwrap().is_differentiable());
    }

    #[test]
    fn defaults() {
        let spec = MatrixSpec::from_yaml_str("identity: {}").unwrap();
        assert_eq!(spec, MatrixSpec::Identity { size: None });
        let spec = MatrixSpec::from_yaml_str("diagonal: { diagonal: [1.0, -1.0] }").unwrap();
        assert!(!spec.build().unwrap().is_positive_definite());
    }

    #[test]
    fn errors() {
        assert!(matches!(MatrixSpec::from_yaml_str("triangular: { array: [[1.0]] }"), Err(MatrixError::Yaml(_))));
        assert!(matches!(MatrixSpec::from_yaml_str("diagonal: { positive: true }"), Err(MatrixError::Yaml(_))));

        let ragged = MatrixSpec::DenseSquare { array: vec![vec![1.0, 2.0], vec![3.0]] };
        assert!(matches!(ragged.build(), Err(MatrixError::Config(_))));
        let not_positive = MatrixSpec::Diagonal { diagonal: vec![1.0, -1.0], positive: true };
        assert!(matches!(not_positive.build(), Err(MatrixError::Invalid(_))));
    }
}
