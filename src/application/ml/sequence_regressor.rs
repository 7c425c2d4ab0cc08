use super::predictor::{Estimator, validate_fit_input, validate_predict_input};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::FeatureMatrix;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceParams {
    /// Window length every input row must have
    pub lookback: usize,
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            lookback: 60,
            epochs: 50,
            learning_rate: 0.1,
        }
    }
}

struct SequenceWeights {
    weights: Array1<f64>,
    bias: f64,
    training_loss: f64,
}

/// Sequence-based regressor over fixed-length, time-ordered windows.
///
/// Each input row is one window of `lookback` consecutive values, oldest
/// first. The model reads the step differences inside the window and predicts
/// the next value as `last + Δ`, where Δ is linear in those differences. It is
/// trained by full-batch gradient descent.
pub struct SequenceRegressor {
    params: SequenceParams,
    state: Option<SequenceWeights>,
}

impl SequenceRegressor {
    pub fn new(params: SequenceParams) -> Self {
        Self { params, state: None }
    }

    pub fn lookback(&self) -> usize {
        self.params.lookback
    }

    /// Mean squared error on the training windows after the last epoch.
    pub fn training_loss(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.training_loss)
    }

    fn check_windowed(&self, features: &FeatureMatrix) -> PredictionResult<()> {
        if features.n_cols() != self.params.lookback {
            return Err(PredictionError::shape(
                format!("{} input", self.name()),
                format!(
                    "expected windows of {} steps, got rows of width {}",
                    self.params.lookback,
                    features.n_cols()
                ),
            ));
        }
        Ok(())
    }

    /// Step differences of every window, one row per window.
    fn differences(&self, features: &FeatureMatrix) -> PredictionResult<Array2<f64>> {
        let width = self.params.lookback - 1;
        let flat: Vec<f64> = features
            .rows()
            .iter()
            .flat_map(|w| w.windows(2).map(|pair| pair[1] - pair[0]))
            .collect();
        Array2::from_shape_vec((features.n_rows(), width), flat)
            .map_err(|e| PredictionError::backend("ndarray", e))
    }

    fn last_values(features: &FeatureMatrix) -> Array1<f64> {
        features
            .rows()
            .iter()
            .map(|w| w.last().copied().unwrap_or(0.0))
            .collect()
    }
}

impl Default for SequenceRegressor {
    fn default() -> Self {
        Self::new(SequenceParams::default())
    }
}

impl Estimator for SequenceRegressor {
    fn fit(&mut self, features: &FeatureMatrix, target: &[f64]) -> PredictionResult<()> {
        validate_fit_input(self.name(), features, target)?;
        self.check_windowed(features)?;
        if self.params.lookback < 2 {
            return Err(PredictionError::invalid(
                "sequence lookback must cover at least 2 steps",
            ));
        }

        let diffs = self.differences(features)?;
        let last = Self::last_values(features);
        let deltas = Array1::from(target.to_vec()) - &last;
        let n = features.n_rows() as f64;

        // Normalise the step by the mean squared row norm (+1 for the bias)
        let mean_norm = diffs
            .map_axis(Axis(1), |row| row.dot(&row))
            .mean()
            .unwrap_or(0.0);
        let step = self.params.learning_rate / (1.0 + mean_norm);

        let mut weights = Array1::<f64>::zeros(self.params.lookback - 1);
        let mut bias = 0.0;
        let mut loss = f64::NAN;
        for epoch in 0..self.params.epochs {
            let errors = diffs.dot(&weights) + bias - &deltas;
            loss = errors.mapv(|e| e * e).sum() / n;

            let grad_w = diffs.t().dot(&errors) * (2.0 / n);
            let grad_b = errors.sum() * 2.0 / n;
            weights.scaled_add(-step, &grad_w);
            bias -= step * grad_b;

            if epoch % 10 == 0 {
                debug!("Sequence regressor epoch {}: loss={:.8}", epoch, loss);
            }
        }
        let final_errors = diffs.dot(&weights) + bias - &deltas;
        let training_loss = if self.params.epochs == 0 {
            loss
        } else {
            final_errors.mapv(|e| e * e).sum() / n
        };

        self.state = Some(SequenceWeights {
            weights,
            bias,
            training_loss,
        });
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| PredictionError::not_fitted(self.name()))?;
        self.check_windowed(features)?;
        validate_predict_input(self.name(), Some(self.params.lookback), features)?;

        let diffs = self.differences(features)?;
        let last = Self::last_values(features);
        let out = diffs.dot(&state.weights) + state.bias + last;
        Ok(out.to_vec())
    }

    fn name(&self) -> &str {
        "Sequence Regressor"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(series: &[f64], lookback: usize) -> (FeatureMatrix, Vec<f64>) {
        let rows = series.windows(lookback + 1).map(|w| w[..lookback].to_vec()).collect();
        let target = series[lookback..].to_vec();
        (FeatureMatrix::new(rows).unwrap(), target)
    }

    #[test]
    fn test_rejects_unwindowed_input() {
        let mut model = SequenceRegressor::new(SequenceParams {
            lookback: 5,
            ..Default::default()
        });
        let flat = FeatureMatrix::new(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(model.fit(&flat, &[4.0]), Err(PredictionError::ShapeError { .. })));
        assert!(matches!(model.predict(&flat), Err(PredictionError::NotFitted { .. })));
    }

    #[test]
    fn test_extrapolates_linear_trend() {
        let series: Vec<f64> = (0..40).map(|i| i as f64 * 0.5).collect();
        let (x, y) = windows(&series, 5);
        let mut model = SequenceRegressor::new(SequenceParams {
            lookback: 5,
            epochs: 200,
            learning_rate: 0.1,
        });
        model.fit(&x, &y).unwrap();
        assert!(model.training_loss().unwrap() < 1e-6);

        let next = FeatureMatrix::new(vec![vec![20.0, 20.5, 21.0, 21.5, 22.0]]).unwrap();
        let pred = model.predict(&next).unwrap();
        assert!((pred[0] - 22.5).abs() < 1e-3, "pred {}", pred[0]);
    }

    #[test]
    fn test_fit_predict_length_and_width_check() {
        let series: Vec<f64> = (0..30).map(|i| (i as f64 * 0.3).sin()).collect();
        let (x, y) = windows(&series, 6);
        let mut model = SequenceRegressor::new(SequenceParams {
            lookback: 6,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().len(), y.len());

        let narrow = FeatureMatrix::new(vec![vec![0.0; 4]]).unwrap();
        assert!(matches!(model.predict(&narrow), Err(PredictionError::ShapeError { .. })));
    }
}
