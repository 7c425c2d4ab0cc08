use super::feature_matrix::FeatureMatrix;
use crate::domain::errors::{PredictionError, PredictionResult};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Normalisation family used when fitting a [`ScalerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalerKind {
    /// Maps each column onto [0, 1] using the fitted min and max.
    #[default]
    MinMax,
    /// Standard score using the fitted mean and population std.
    Standard,
}

/// Fitted per-column normalisation parameters.
///
/// A state is fit once on training features and reused for every later
/// transform and inverse transform of the same feature space. Zero-range and
/// zero-std columns use a unit divisor so constant columns map to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerState {
    MinMax { min: Vec<f64>, range: Vec<f64> },
    Standard { mean: Vec<f64>, std: Vec<f64> },
}

fn unit_if_zero(v: f64) -> f64 {
    if v.abs() < f64::EPSILON { 1.0 } else { v }
}

impl ScalerState {
    pub fn fit(kind: ScalerKind, features: &FeatureMatrix) -> PredictionResult<Self> {
        if features.is_empty() {
            return Err(PredictionError::dimension(
                "scaler fit rows",
                1,
                features.n_rows(),
            ));
        }

        let columns: Vec<Vec<f64>> = (0..features.n_cols()).map(|c| features.column(c)).collect();
        let state = match kind {
            ScalerKind::MinMax => {
                let min: Vec<f64> = columns
                    .iter()
                    .map(|c| c.iter().copied().fold(f64::INFINITY, f64::min))
                    .collect();
                let range = columns
                    .iter()
                    .zip(&min)
                    .map(|(c, lo)| {
                        let hi = c.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        unit_if_zero(hi - lo)
                    })
                    .collect();
                ScalerState::MinMax { min, range }
            }
            ScalerKind::Standard => {
                let mean = columns.iter().map(|c| c.iter().mean()).collect();
                let std = columns
                    .iter()
                    .map(|c| unit_if_zero(c.iter().population_std_dev()))
                    .collect();
                ScalerState::Standard { mean, std }
            }
        };
        Ok(state)
    }

    pub fn kind(&self) -> ScalerKind {
        match self {
            ScalerState::MinMax { .. } => ScalerKind::MinMax,
            ScalerState::Standard { .. } => ScalerKind::Standard,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            ScalerState::MinMax { min, .. } => min.len(),
            ScalerState::Standard { mean, .. } => mean.len(),
        }
    }

    /// (offset, divisor) for a column
    fn params(&self, col: usize) -> (f64, f64) {
        match self {
            ScalerState::MinMax { min, range } => (min[col], range[col]),
            ScalerState::Standard { mean, std } => (mean[col], std[col]),
        }
    }

    fn check_width(&self, features: &FeatureMatrix, context: &str) -> PredictionResult<()> {
        if features.n_rows() > 0 && features.n_cols() != self.n_features() {
            return Err(PredictionError::dimension(
                context,
                self.n_features(),
                features.n_cols(),
            ));
        }
        Ok(())
    }

    pub fn transform(&self, features: &FeatureMatrix) -> PredictionResult<FeatureMatrix> {
        self.check_width(features, "scaler transform columns")?;
        Ok(features.map_rows(|row| {
            row.iter()
                .enumerate()
                .map(|(c, v)| {
                    let (offset, divisor) = self.params(c);
                    (v - offset) / divisor
                })
                .collect()
        }))
    }

    pub fn inverse_transform(&self, features: &FeatureMatrix) -> PredictionResult<FeatureMatrix> {
        self.check_width(features, "scaler inverse transform columns")?;
        Ok(features.map_rows(|row| {
            row.iter()
                .enumerate()
                .map(|(c, v)| {
                    let (offset, divisor) = self.params(c);
                    v * divisor + offset
                })
                .collect()
        }))
    }

    /// Scale a single value of column `col`.
    pub fn transform_value(&self, col: usize, value: f64) -> PredictionResult<f64> {
        if col >= self.n_features() {
            return Err(PredictionError::dimension(
                "scaler column index",
                self.n_features(),
                col + 1,
            ));
        }
        let (offset, divisor) = self.params(col);
        Ok((value - offset) / divisor)
    }

    /// Map a scaled value of column `col` back to original units.
    pub fn inverse_value(&self, col: usize, value: f64) -> PredictionResult<f64> {
        if col >= self.n_features() {
            return Err(PredictionError::dimension(
                "scaler column index",
                self.n_features(),
                col + 1,
            ));
        }
        let (offset, divisor) = self.params(col);
        Ok(value * divisor + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::new(vec![vec![0.0, 10.0], vec![5.0, 20.0], vec![10.0, 30.0]]).unwrap()
    }

    #[test]
    fn test_minmax_maps_to_unit_interval() {
        let scaler = ScalerState::fit(ScalerKind::MinMax, &matrix()).unwrap();
        let scaled = scaler.transform(&matrix()).unwrap();
        assert_eq!(scaled.rows()[0], vec![0.0, 0.0]);
        assert_eq!(scaled.rows()[1], vec![0.5, 0.5]);
        assert_eq!(scaled.rows()[2], vec![1.0, 1.0]);
    }

    #[test]
    fn test_standard_has_zero_mean() {
        let scaler = ScalerState::fit(ScalerKind::Standard, &matrix()).unwrap();
        let scaled = scaler.transform(&matrix()).unwrap();
        let col: f64 = scaled.column(0).iter().sum();
        assert!(col.abs() < 1e-12);
        assert!((scaled.rows()[2][0] - 1.224744871391589).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_restores_original() {
        for kind in [ScalerKind::MinMax, ScalerKind::Standard] {
            let scaler = ScalerState::fit(kind, &matrix()).unwrap();
            let restored = scaler
                .inverse_transform(&scaler.transform(&matrix()).unwrap())
                .unwrap();
            for (a, b) in restored.rows().iter().flatten().zip(matrix().rows().iter().flatten()) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = FeatureMatrix::new(vec![vec![3.0], vec![3.0]]).unwrap();
        for kind in [ScalerKind::MinMax, ScalerKind::Standard] {
            let scaler = ScalerState::fit(kind, &x).unwrap();
            let scaled = scaler.transform(&x).unwrap();
            assert_eq!(scaled.column(0), vec![0.0, 0.0]);
        }
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let scaler = ScalerState::fit(ScalerKind::MinMax, &matrix()).unwrap();
        let narrow = FeatureMatrix::new(vec![vec![1.0]]).unwrap();
        let err = scaler.transform(&narrow).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_values_outside_fit_range_extrapolate() {
        let scaler = ScalerState::fit(ScalerKind::MinMax, &FeatureMatrix::from_column(&[0.0, 10.0])).unwrap();
        assert!((scaler.transform_value(0, 15.0).unwrap() - 1.5).abs() < 1e-12);
        assert!((scaler.inverse_value(0, 1.5).unwrap() - 15.0).abs() < 1e-12);
    }
}
