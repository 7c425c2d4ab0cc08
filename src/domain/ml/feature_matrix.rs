use crate::domain::errors::{PredictionError, PredictionResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Rectangular table of numeric features, one row per observation.
///
/// Construction rejects ragged rows, so every row has `n_cols` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
    n_cols: usize,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> PredictionResult<Self> {
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(PredictionError::dimension(
                format!("feature matrix row {}", idx),
                n_cols,
                row.len(),
            ));
        }
        Ok(Self { rows, n_cols })
    }

    /// Single-column matrix from a 1-D series.
    pub fn from_column(values: &[f64]) -> Self {
        Self {
            rows: values.iter().map(|v| vec![*v]).collect(),
            n_cols: if values.is_empty() { 0 } else { 1 },
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// True when there is nothing to learn from: no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.n_cols == 0
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[f64]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(idx).copied()).collect()
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// New matrix holding the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            n_cols: self.n_cols,
        }
    }

    /// Apply `f` to every row, keeping the column count.
    pub(crate) fn map_rows<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        Self {
            rows: self.rows.iter().map(|r| f(r)).collect(),
            n_cols: self.n_cols,
        }
    }
}

/// How a dataset is partitioned into train and test rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitStrategy {
    /// Oldest rows train, newest rows test.
    #[default]
    Chronological,
    /// Rows shuffled with a fixed seed before partitioning.
    Shuffled { seed: u64 },
}

/// Feature matrix paired with its target vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: FeatureMatrix,
    pub target: Vec<f64>,
}

impl Dataset {
    pub fn new(features: FeatureMatrix, target: Vec<f64>) -> PredictionResult<Self> {
        if features.n_rows() != target.len() {
            return Err(PredictionError::dimension(
                "dataset target length",
                features.n_rows(),
                target.len(),
            ));
        }
        Ok(Self { features, target })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(indices),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }

    /// Partition into (train, test).
    ///
    /// The test partition holds `ceil(n * test_fraction)` rows and the train
    /// partition must keep at least one row.
    pub fn split(
        &self,
        test_fraction: f64,
        strategy: SplitStrategy,
    ) -> PredictionResult<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(PredictionError::invalid(format!(
                "test fraction must be in [0, 1), got {}",
                test_fraction
            )));
        }

        let n = self.n_rows();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_train == 0 {
            return Err(PredictionError::dimension("training partition rows", 1, 0));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        if let SplitStrategy::Shuffled { seed } = strategy {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let (train_idx, test_idx) = indices.split_at(n_train);
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Dataset {
        let rows = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let target = (0..n).map(|i| i as f64).collect();
        Dataset::new(FeatureMatrix::new(rows).unwrap(), target).unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = FeatureMatrix::new(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        match err {
            PredictionError::DimensionMismatch {
                context,
                expected,
                actual,
            } => {
                assert!(context.contains("row 1"));
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dataset_length_mismatch() {
        let x = FeatureMatrix::new(vec![vec![1.0], vec![2.0]]).unwrap();
        let err = Dataset::new(x, vec![1.0]).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_chronological_split_keeps_order() {
        let (train, test) = sample(10).split(0.2, SplitStrategy::Chronological).unwrap();
        assert_eq!(train.n_rows(), 8);
        assert_eq!(test.n_rows(), 2);
        assert_eq!(test.target, vec![8.0, 9.0]);
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let (train, test) = sample(7).split(0.2, SplitStrategy::Chronological).unwrap();
        assert_eq!(test.n_rows(), 2);
        assert_eq!(train.n_rows(), 5);
    }

    #[test]
    fn test_shuffled_split_is_reproducible() {
        let data = sample(20);
        let (a_train, a_test) = data.split(0.2, SplitStrategy::Shuffled { seed: 7 }).unwrap();
        let (b_train, b_test) = data.split(0.2, SplitStrategy::Shuffled { seed: 7 }).unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_test, b_test);

        let mut all: Vec<f64> = a_train.target.iter().chain(a_test.target.iter()).copied().collect();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, data.target);
    }

    #[test]
    fn test_single_row_cannot_be_split() {
        let err = sample(1).split(0.2, SplitStrategy::Chronological).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { .. }));
    }
}
