use crate::domain::errors::{PredictionError, PredictionResult};
use serde::{Deserialize, Serialize};

/// Out-of-sample error of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    pub rmse: f64,
}

impl ModelMetrics {
    pub fn evaluate(predictions: &[f64], actuals: &[f64]) -> PredictionResult<Self> {
        Ok(Self {
            mae: mean_absolute_error(predictions, actuals)?,
            rmse: root_mean_squared_error(predictions, actuals)?,
        })
    }
}

/// Percentile band of one model's own prediction batch.
///
/// This is the dispersion of a single model's predictions across the batch,
/// not a calibrated predictive interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub const LOWER_PERCENTILE: f64 = 2.5;
    pub const UPPER_PERCENTILE: f64 = 97.5;

    pub fn from_predictions(predictions: &[f64]) -> PredictionResult<Self> {
        Ok(Self {
            lower: percentile(predictions, Self::LOWER_PERCENTILE)?,
            upper: percentile(predictions, Self::UPPER_PERCENTILE)?,
        })
    }
}

fn check_pair(predictions: &[f64], actuals: &[f64]) -> PredictionResult<()> {
    if predictions.len() != actuals.len() {
        return Err(PredictionError::dimension(
            "evaluation targets",
            predictions.len(),
            actuals.len(),
        ));
    }
    if predictions.is_empty() {
        return Err(PredictionError::dimension("evaluation rows", 1, 0));
    }
    Ok(())
}

pub fn mean_absolute_error(predictions: &[f64], actuals: &[f64]) -> PredictionResult<f64> {
    check_pair(predictions, actuals)?;
    let sum: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).abs())
        .sum();
    Ok(sum / predictions.len() as f64)
}

pub fn mean_squared_error(predictions: &[f64], actuals: &[f64]) -> PredictionResult<f64> {
    check_pair(predictions, actuals)?;
    let sq_err: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    Ok(sq_err / predictions.len() as f64)
}

pub fn root_mean_squared_error(predictions: &[f64], actuals: &[f64]) -> PredictionResult<f64> {
    Ok(mean_squared_error(predictions, actuals)?.sqrt())
}

/// Percentile `q` (0..=100) with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> PredictionResult<f64> {
    if values.is_empty() {
        return Err(PredictionError::dimension("percentile input", 1, 0));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(PredictionError::invalid(format!(
            "percentile must be within [0, 100], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

/// Elementwise arithmetic mean of equally long vectors.
pub fn elementwise_mean(vectors: &[&[f64]]) -> PredictionResult<Vec<f64>> {
    let first = vectors
        .first()
        .ok_or_else(|| PredictionError::dimension("ensemble members", 1, 0))?;
    let len = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != len) {
        return Err(PredictionError::shape(
            "ensemble predictions",
            format!("expected {} values per model, got {}", len, bad.len()),
        ));
    }

    let n = vectors.len() as f64;
    Ok((0..len)
        .map(|i| vectors.iter().map(|v| v[i]).sum::<f64>() / n)
        .collect())
}
