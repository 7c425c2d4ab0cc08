//! Structural feature matrix builders.
//!
//! Indicator values (RSI, MACD, sentiment, order flow...) are produced by
//! upstream services and arrive here as opaque named columns. The builders
//! only arrange numbers into a rectangular table with a target vector.

use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::{Dataset, FeatureMatrix};

/// Turns raw input into a training dataset.
pub trait FeatureMatrixBuilder {
    type Input: ?Sized;

    fn build(&self, input: &Self::Input) -> PredictionResult<Dataset>;
}

/// Named numeric columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> PredictionResult<Self> {
        let name = name.into();
        if let Some(expected) = self.n_rows().filter(|&n| n != values.len()) {
            return Err(PredictionError::dimension(
                format!("feature table column '{}'", name),
                expected,
                values.len(),
            ));
        }
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(PredictionError::invalid(format!("duplicate column '{}'", name)));
        }
        self.columns.push((name, values));
        Ok(self)
    }

    pub fn n_rows(&self) -> Option<usize> {
        self.columns.first().map(|(_, v)| v.len())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Uses one named column as the target and every other column as a feature.
#[derive(Debug, Clone)]
pub struct TargetColumnBuilder {
    target: String,
}

impl TargetColumnBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Feature rows of `table` with the target column dropped.
    pub fn features(&self, table: &FeatureTable) -> FeatureMatrix {
        let inputs: Vec<&Vec<f64>> = table
            .columns
            .iter()
            .filter(|(name, _)| *name != self.target)
            .map(|(_, values)| values)
            .collect();
        let n_rows = table.n_rows().unwrap_or(0);
        let rows = (0..n_rows)
            .map(|r| inputs.iter().map(|col| col[r]).collect())
            .collect();
        // Columns share one length, so rows are rectangular
        FeatureMatrix::new(rows).unwrap_or_default()
    }
}

impl FeatureMatrixBuilder for TargetColumnBuilder {
    type Input = FeatureTable;

    fn build(&self, table: &FeatureTable) -> PredictionResult<Dataset> {
        let target = table.column(&self.target).ok_or_else(|| {
            PredictionError::invalid(format!("target column '{}' not found", self.target))
        })?;
        Dataset::new(self.features(table), target.to_vec())
    }
}

/// Cuts a 1-D series into sliding windows of `lookback` values, each mapped to
/// the value that follows it.
#[derive(Debug, Clone, Copy)]
pub struct LagWindowBuilder {
    lookback: usize,
}

impl LagWindowBuilder {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// The most recent window of `series` as a single-row matrix.
    pub fn latest_window(&self, series: &[f64]) -> PredictionResult<FeatureMatrix> {
        if self.lookback == 0 || series.len() < self.lookback {
            return Err(PredictionError::insufficient(
                "latest lookback window",
                self.lookback.max(1),
                series.len(),
            ));
        }
        FeatureMatrix::new(vec![series[series.len() - self.lookback..].to_vec()])
    }
}

impl FeatureMatrixBuilder for LagWindowBuilder {
    type Input = [f64];

    fn build(&self, series: &[f64]) -> PredictionResult<Dataset> {
        if self.lookback == 0 {
            return Err(PredictionError::invalid("lookback must be positive"));
        }
        if series.len() <= self.lookback {
            return Err(PredictionError::insufficient(
                "lag windows",
                self.lookback + 1,
                series.len(),
            ));
        }
        let rows = series
            .windows(self.lookback + 1)
            .map(|w| w[..self.lookback].to_vec())
            .collect();
        let target = series[self.lookback..].to_vec();
        Dataset::new(FeatureMatrix::new(rows)?, target)
    }
}
