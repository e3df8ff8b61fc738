//! Patch mappers: how the values of one target patch are obtained from a
//! source value array.
//!
//! A mapper is selected once, when the addressing is built, and stored as
//! data. [`PatchMapper::Direct`] copies one source value per target face;
//! [`PatchMapper::Weighted`] sums weighted source values per target face.

use crate::data::field::FieldValue;
use crate::mesh_error::{EntityKind, MeshDecomposeError};
use serde::{Deserialize, Serialize};

/// Largest accepted deviation of a weight row's sum from one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatchMapper {
    /// Target face `i` takes source value `addressing[i]`.
    Direct { addressing: Vec<usize> },
    /// Target face `i` takes `sum_k weights[i][k] * source[addressing[i][k]]`.
    Weighted {
        addressing: Vec<Vec<usize>>,
        weights: Vec<Vec<f64>>,
    },
}

impl PatchMapper {
    /// Weighted mapper after checking that addressing and weights agree and
    /// that every row of weights sums to one.
    pub fn weighted(
        addressing: Vec<Vec<usize>>,
        weights: Vec<Vec<f64>>,
    ) -> Result<Self, MeshDecomposeError> {
        if addressing.len() != weights.len() {
            return Err(MeshDecomposeError::InvalidMapper(format!(
                "{} addressing rows for {} weight rows",
                addressing.len(),
                weights.len()
            )));
        }
        for (i, (a, w)) in addressing.iter().zip(&weights).enumerate() {
            if a.len() != w.len() || a.is_empty() {
                return Err(MeshDecomposeError::InvalidMapper(format!(
                    "face {i} has {} sources and {} weights",
                    a.len(),
                    w.len()
                )));
            }
            if let Some(x) = w.iter().find(|x| !x.is_finite()) {
                return Err(MeshDecomposeError::InvalidMapper(format!(
                    "face {i} has weight {x}"
                )));
            }
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(MeshDecomposeError::InvalidMapper(format!(
                    "weights of face {i} sum to {sum}"
                )));
            }
        }
        Ok(PatchMapper::Weighted { addressing, weights })
    }

    /// Number of target faces.
    pub fn len(&self) -> usize {
        match self {
            PatchMapper::Direct { addressing } => addressing.len(),
            PatchMapper::Weighted { addressing, .. } => addressing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, PatchMapper::Direct { .. })
    }

    /// Map a dense source array.
    pub fn map<T: FieldValue>(&self, source: &[T]) -> Result<Vec<T>, MeshDecomposeError> {
        let get = |i: usize| {
            source.get(i).copied().ok_or_else(|| {
                MeshDecomposeError::InvalidMapper(format!(
                    "source index {i} out of range ({} values)",
                    source.len()
                ))
            })
        };
        self.apply(get)
    }

    /// Map a source array with holes. A target face that needs a missing
    /// value is an [`MeshDecomposeError::AddressingGap`].
    pub fn map_sparse<T: FieldValue>(
        &self,
        source: &[Option<T>],
    ) -> Result<Vec<T>, MeshDecomposeError> {
        let get = |i: usize| {
            source.get(i).copied().flatten().ok_or_else(|| MeshDecomposeError::AddressingGap {
                kind: EntityKind::PatchFace,
                index: i,
                context: " (mapped source value has no contribution)".into(),
            })
        };
        self.apply(get)
    }

    fn apply<T: FieldValue>(
        &self,
        get: impl Fn(usize) -> Result<T, MeshDecomposeError>,
    ) -> Result<Vec<T>, MeshDecomposeError> {
        match self {
            PatchMapper::Direct { addressing } => addressing.iter().map(|&i| get(i)).collect(),
            PatchMapper::Weighted { addressing, weights } => addressing
                .iter()
                .zip(weights)
                .map(|(idx, w)| {
                    idx.iter()
                        .zip(w)
                        .try_fold(T::zero(), |acc, (&i, &wi)| -> Result<T, MeshDecomposeError> {
                            Ok(acc.add_scaled(get(i)?, wi))
                        })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_copies() {
        let m = PatchMapper::Direct {
            addressing: vec![2, 0],
        };
        assert_eq!(m.map(&[1.0f64, 2.0, 3.0]).unwrap(), vec![3.0, 1.0]);
        assert!(m.map(&[1.0f64]).is_err());
    }

    #[test]
    fn weighted_sums() {
        let m = PatchMapper::weighted(vec![vec![0, 1], vec![2]], vec![vec![0.25, 0.75], vec![1.0]])
            .unwrap();
        assert_eq!(m.map(&[4.0f64, 8.0, 5.0]).unwrap(), vec![7.0, 5.0]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn weighted_rejects_ragged_rows() {
        let err = PatchMapper::weighted(vec![vec![0, 1]], vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::InvalidMapper(_)));
    }

    #[test]
    fn weighted_rows_must_sum_to_one() {
        let err = PatchMapper::weighted(vec![vec![0, 1]], vec![vec![0.5, 0.6]]).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::InvalidMapper(ref m) if m.contains("sum")));
        let err = PatchMapper::weighted(vec![vec![0], vec![1]], vec![vec![1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::InvalidMapper(_)));
        let third = 1.0 / 3.0;
        assert!(PatchMapper::weighted(vec![vec![0, 1, 2]], vec![vec![third; 3]]).is_ok());
    }

    #[test]
    fn sparse_source_reports_gap() {
        let m = PatchMapper::Direct {
            addressing: vec![0, 1],
        };
        let err = m.map_sparse(&[Some(1.0f64), None]).unwrap_err();
        assert!(matches!(
            err,
            MeshDecomposeError::AddressingGap {
                kind: EntityKind::PatchFace,
                index: 1,
                ..
            }
        ));
    }
}
