use super::feature_builder::{FeatureMatrixBuilder, LagWindowBuilder};
use super::predictor::Estimator;
use super::sequence_regressor::{SequenceParams, SequenceRegressor};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::metrics::mean_squared_error;
use crate::domain::ml::{FeatureMatrix, ScalerKind, ScalerState};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePredictorConfig {
    /// Asset label used in logs
    pub asset: String,
    pub sequence: SequenceParams,
    /// Share of the newest windows held out for validation
    pub validation_split: f64,
    /// Trailing prices used for the confidence score
    pub confidence_window: usize,
}

impl Default for PricePredictorConfig {
    fn default() -> Self {
        Self {
            asset: "BTC".to_string(),
            sequence: SequenceParams::default(),
            validation_split: 0.2,
            confidence_window: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceTrainingReport {
    pub train_windows: usize,
    pub validation_windows: usize,
    /// MSE on scaled training windows
    pub train_loss: f64,
    /// MSE on scaled validation windows, if any were held out
    pub validation_loss: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
    /// Stability heuristic in [0, 100]; not a statistical interval
    pub confidence_score: f64,
}

/// Heuristic stability score of the trailing `window` prices:
/// `clamp(1 - std / mean, 0, 1) * 100` with the population std.
///
/// Zero dispersion scores 100. A non-positive mean scores 0.
pub fn confidence_score(prices: &[f64], window: usize) -> f64 {
    let start = prices.len().saturating_sub(window);
    let recent = &prices[start..];
    if recent.is_empty() {
        return 0.0;
    }
    let mean = recent.iter().mean();
    if !(mean.is_finite() && mean > 0.0) {
        return 0.0;
    }
    let volatility = recent.iter().population_std_dev() / mean;
    (1.0 - volatility).clamp(0.0, 1.0) * 100.0
}

/// Single-asset next-price predictor.
///
/// One min-max scaler is fit over the full training series and reused for
/// inference and for mapping predictions back to price units.
pub struct PricePredictor {
    config: PricePredictorConfig,
    scaler: Option<ScalerState>,
    model: SequenceRegressor,
}

impl PricePredictor {
    pub fn new(config: PricePredictorConfig) -> Self {
        let model = SequenceRegressor::new(config.sequence);
        Self {
            config,
            scaler: None,
            model,
        }
    }

    pub fn lookback(&self) -> usize {
        self.config.sequence.lookback
    }

    pub fn scaler(&self) -> Option<&ScalerState> {
        self.scaler.as_ref()
    }

    fn scale_series(scaler: &ScalerState, series: &[f64]) -> PredictionResult<Vec<f64>> {
        series.iter().map(|v| scaler.transform_value(0, *v)).collect()
    }

    pub fn train(&mut self, history: &[f64]) -> PredictionResult<SequenceTrainingReport> {
        let lookback = self.lookback();
        if history.len() <= lookback {
            return Err(PredictionError::insufficient(
                "sequence training windows",
                lookback + 1,
                history.len(),
            ));
        }
        if let Some(idx) = history.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::invalid(format!(
                "price at index {} is not finite",
                idx
            )));
        }
        if !(0.0..1.0).contains(&self.config.validation_split) {
            return Err(PredictionError::invalid(format!(
                "validation split must be in [0, 1), got {}",
                self.config.validation_split
            )));
        }

        let scaler = ScalerState::fit(ScalerKind::MinMax, &FeatureMatrix::from_column(history))?;
        let scaled = Self::scale_series(&scaler, history)?;
        let dataset = LagWindowBuilder::new(lookback).build(&scaled)?;

        // Newest windows validate, like a trailing validation split
        let n = dataset.n_rows();
        let mut n_train = (n as f64 * (1.0 - self.config.validation_split)).floor() as usize;
        if n_train == 0 {
            n_train = n;
        }
        let train_idx: Vec<usize> = (0..n_train).collect();
        let val_idx: Vec<usize> = (n_train..n).collect();
        let train = dataset.subset(&train_idx);
        let validation = dataset.subset(&val_idx);

        self.model.fit(&train.features, &train.target)?;
        let train_loss = self
            .model
            .training_loss()
            .ok_or_else(|| PredictionError::not_fitted(self.model.name()))?;
        let validation_loss = if validation.n_rows() > 0 {
            let preds = self.model.predict(&validation.features)?;
            Some(mean_squared_error(&preds, &validation.target)?)
        } else {
            None
        };

        info!(
            "{} sequence model trained on {} windows (validation: {}), loss={:.8}",
            self.config.asset,
            train.n_rows(),
            validation.n_rows(),
            train_loss
        );

        self.scaler = Some(scaler);
        Ok(SequenceTrainingReport {
            train_windows: train.n_rows(),
            validation_windows: validation.n_rows(),
            train_loss,
            validation_loss,
        })
    }

    pub fn predict(&self, recent: &[f64]) -> PredictionResult<PricePrediction> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| PredictionError::not_fitted("price predictor"))?;
        let lookback = self.lookback();
        if let Some(idx) = recent.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::invalid(format!(
                "price at index {} is not finite",
                idx
            )));
        }
        let scaled = Self::scale_series(scaler, recent)?;
        let window = LagWindowBuilder::new(lookback).latest_window(&scaled)?;
        let output = self.model.predict(&window)?;
        let next = output
            .first()
            .copied()
            .ok_or_else(|| PredictionError::shape("sequence output", "no prediction returned"))?;

        let prediction = PricePrediction {
            predicted_price: scaler.inverse_value(0, next)?,
            confidence_score: confidence_score(recent, self.config.confidence_window),
        };
        info!(
            "{} predicted price {:.4} (confidence {:.1}%)",
            self.config.asset, prediction.predicted_price, prediction.confidence_score
        );
        Ok(prediction)
    }
}
