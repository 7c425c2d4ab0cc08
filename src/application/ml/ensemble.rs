//! Ensemble coordinator.
//!
//! Owns a named roster of estimators, trains them on a shared scaled feature
//! matrix, and combines their predictions into an unweighted mean with a
//! per-model percentile band.
//!
//! The band is the [2.5, 97.5] percentile range of one model's own
//! predictions over the batch. It describes how spread that model's outputs
//! are, not how uncertain any single prediction is.

use super::classifier_regressor::{ClassifierParams, ClassifierRegressor};
use super::feature_builder::FeatureMatrixBuilder;
use super::gradient_boosting::{GradientBoostingEstimator, GradientBoostingParams};
use super::predictor::Estimator;
use super::random_forest::{RandomForestEstimator, RandomForestParams};
use super::sequence_regressor::{SequenceParams, SequenceRegressor};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::metrics::elementwise_mean;
use crate::domain::ml::{
    ConfidenceInterval, Dataset, FeatureMatrix, ModelMetrics, ScalerKind, ScalerState,
    SplitStrategy,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub split: SplitStrategy,
    pub scaler: ScalerKind,
    /// Run per-model fit/predict on the rayon pool
    pub parallel: bool,
    pub random_forest: RandomForestParams,
    pub gradient_boosting: GradientBoostingParams,
    pub classifier: ClassifierParams,
    pub sequence: SequenceParams,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split: SplitStrategy::Chronological,
            scaler: ScalerKind::MinMax,
            parallel: true,
            random_forest: RandomForestParams::default(),
            gradient_boosting: GradientBoostingParams::default(),
            classifier: ClassifierParams::default(),
            sequence: SequenceParams::default(),
        }
    }
}

/// Outcome of one `train_all` run. Failed models are listed by name and do
/// not affect their siblings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingReport {
    pub metrics: BTreeMap<String, ModelMetrics>,
    pub failures: BTreeMap<String, PredictionError>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleResult {
    /// Elementwise mean of every fitted model's predictions
    pub prediction: Vec<f64>,
    pub confidence_interval: BTreeMap<String, ConfidenceInterval>,
}

struct ModelSlot {
    name: String,
    estimator: Box<dyn Estimator>,
    fitted: bool,
}

struct ScaledSplit {
    train_x: FeatureMatrix,
    train_y: Vec<f64>,
    test_x: FeatureMatrix,
    test_y: Vec<f64>,
}

fn train_slot(slot: &mut ModelSlot, data: &ScaledSplit) -> (String, PredictionResult<ModelMetrics>) {
    slot.fitted = false;
    let outcome = slot
        .estimator
        .fit(&data.train_x, &data.train_y)
        .and_then(|_| slot.estimator.predict(&data.test_x))
        .and_then(|preds| ModelMetrics::evaluate(&preds, &data.test_y));
    slot.fitted = outcome.is_ok();
    (
        slot.name.clone(),
        outcome.map_err(|e| e.for_model(slot.name.as_str())),
    )
}

fn predict_slot(slot: &ModelSlot, features: &FeatureMatrix) -> (String, PredictionResult<Vec<f64>>) {
    (slot.name.clone(), slot.estimator.predict(features))
}

pub struct EnsembleCoordinator {
    config: EnsembleConfig,
    models: Vec<ModelSlot>,
    scaler: Option<ScalerState>,
    n_features: Option<usize>,
}

impl EnsembleCoordinator {
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config,
            models: Vec::new(),
            scaler: None,
            n_features: None,
        }
    }

    /// Coordinator with the default roster: a windowed sequence model, a
    /// random forest, gradient-boosted trees and a classifier read as a
    /// regressor.
    pub fn standard(config: EnsembleConfig) -> Self {
        let mut coordinator = Self::new(config.clone());
        coordinator.push_slot("lstm", Box::new(SequenceRegressor::new(config.sequence)));
        coordinator.push_slot(
            "random_forest",
            Box::new(RandomForestEstimator::new(config.random_forest)),
        );
        coordinator.push_slot(
            "xgboost",
            Box::new(GradientBoostingEstimator::new(config.gradient_boosting)),
        );
        coordinator.push_slot(
            "transformer",
            Box::new(ClassifierRegressor::new(config.classifier)),
        );
        coordinator
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Add an estimator under a unique name. Registration order is the
    /// iteration order for training and prediction.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        estimator: Box<dyn Estimator>,
    ) -> PredictionResult<()> {
        let name = name.into();
        if self.models.iter().any(|slot| slot.name == name) {
            return Err(PredictionError::invalid(format!(
                "estimator '{}' is already registered",
                name
            )));
        }
        self.push_slot(name, estimator);
        Ok(())
    }

    fn push_slot(&mut self, name: impl Into<String>, estimator: Box<dyn Estimator>) {
        self.models.push(ModelSlot {
            name: name.into(),
            estimator,
            fitted: false,
        });
    }

    pub fn with_model(
        mut self,
        name: impl Into<String>,
        estimator: Box<dyn Estimator>,
    ) -> PredictionResult<Self> {
        self.register(name, estimator)?;
        Ok(self)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Names of the models that will take part in `predict`.
    pub fn fitted_models(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|slot| slot.fitted)
            .map(|slot| slot.name.as_str())
            .collect()
    }

    pub fn is_trained(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn scaler(&self) -> Option<&ScalerState> {
        self.scaler.as_ref()
    }

    /// Build the dataset with `builder`, then train every estimator on it.
    pub fn train_all<B: FeatureMatrixBuilder>(
        &mut self,
        builder: &B,
        input: &B::Input,
    ) -> PredictionResult<TrainingReport> {
        let dataset = builder.build(input)?;
        self.train_on(&dataset)
    }

    /// Split, scale (fit on train rows only) and train every estimator.
    pub fn train_on(&mut self, dataset: &Dataset) -> PredictionResult<TrainingReport> {
        if dataset.features.n_rows() == 0 {
            return Err(PredictionError::dimension("ensemble training matrix rows", 1, 0));
        }
        if dataset.features.n_cols() == 0 {
            return Err(PredictionError::dimension(
                "ensemble training matrix columns",
                1,
                0,
            ));
        }
        if self.models.is_empty() {
            return Err(PredictionError::invalid("no estimators registered"));
        }

        let (train, test) = dataset.split(self.config.test_fraction, self.config.split)?;
        if test.n_rows() == 0 {
            return Err(PredictionError::dimension("ensemble test partition rows", 1, 0));
        }

        let scaler = ScalerState::fit(self.config.scaler, &train.features)?;
        let data = ScaledSplit {
            train_x: scaler.transform(&train.features)?,
            train_y: train.target,
            test_x: scaler.transform(&test.features)?,
            test_y: test.target,
        };

        info!(
            "Training {} estimators on {} rows (test: {}, features: {})",
            self.models.len(),
            data.train_y.len(),
            data.test_y.len(),
            dataset.features.n_cols()
        );

        let outcomes: Vec<(String, PredictionResult<ModelMetrics>)> = if self.config.parallel {
            self.models
                .par_iter_mut()
                .map(|slot| train_slot(slot, &data))
                .collect()
        } else {
            self.models
                .iter_mut()
                .map(|slot| train_slot(slot, &data))
                .collect()
        };

        let mut report = TrainingReport {
            train_rows: data.train_y.len(),
            test_rows: data.test_y.len(),
            ..Default::default()
        };
        for (name, outcome) in outcomes {
            match outcome {
                Ok(metrics) => {
                    info!(
                        "Model {}: MAE={:.6}, RMSE={:.6}",
                        name, metrics.mae, metrics.rmse
                    );
                    report.metrics.insert(name, metrics);
                }
                Err(e) => {
                    warn!("Model {} failed to train: {}", name, e);
                    report.failures.insert(name, e);
                }
            }
        }

        self.scaler = Some(scaler);
        self.n_features = Some(dataset.features.n_cols());
        Ok(report)
    }

    /// Combine every fitted estimator's prediction for `features`.
    pub fn predict(&self, features: &FeatureMatrix) -> PredictionResult<EnsembleResult> {
        let (scaler, n_features) = match (&self.scaler, self.n_features) {
            (Some(scaler), Some(n)) => (scaler, n),
            _ => return Err(PredictionError::not_fitted("ensemble coordinator")),
        };
        if features.n_rows() == 0 {
            return Err(PredictionError::dimension("ensemble prediction rows", 1, 0));
        }
        if features.n_cols() != n_features {
            return Err(PredictionError::dimension(
                "ensemble prediction features",
                n_features,
                features.n_cols(),
            ));
        }

        let fitted: Vec<&ModelSlot> = self.models.iter().filter(|slot| slot.fitted).collect();
        if fitted.is_empty() {
            return Err(PredictionError::not_fitted(
                "ensemble coordinator (no estimator trained successfully)",
            ));
        }

        let scaled = scaler.transform(features)?;
        let outputs: Vec<(String, PredictionResult<Vec<f64>>)> = if self.config.parallel {
            fitted
                .par_iter()
                .map(|slot| predict_slot(slot, &scaled))
                .collect()
        } else {
            fitted
                .iter()
                .map(|slot| predict_slot(slot, &scaled))
                .collect()
        };

        // All models have finished; surface the first failure in roster order
        let mut predictions = Vec::with_capacity(outputs.len());
        for (name, output) in outputs {
            let values = output.map_err(|e| e.for_model(name.as_str()))?;
            predictions.push((name, values));
        }

        let expected = predictions[0].1.len();
        if let Some((name, values)) = predictions.iter().find(|(_, v)| v.len() != expected) {
            return Err(PredictionError::shape(
                "ensemble predictions",
                format!(
                    "model '{}' returned {} values, expected {} like '{}'",
                    name,
                    values.len(),
                    expected,
                    predictions[0].0
                ),
            ));
        }

        let slices: Vec<&[f64]> = predictions.iter().map(|(_, v)| v.as_slice()).collect();
        let prediction = elementwise_mean(&slices)?;

        let mut confidence_interval = BTreeMap::new();
        for (name, values) in &predictions {
            let interval =
                ConfidenceInterval::from_predictions(values).map_err(|e| e.for_model(name.as_str()))?;
            confidence_interval.insert(name.clone(), interval);
        }

        info!(
            "Ensemble prediction from {} models over {} rows",
            predictions.len(),
            prediction.len()
        );
        Ok(EnsembleResult {
            prediction,
            confidence_interval,
        })
    }
}
