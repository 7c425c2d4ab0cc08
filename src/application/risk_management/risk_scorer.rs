//! Model-based risk scorer.
//!
//! Rolling segments of a price history are reduced to window statistics and a
//! composite risk score. A regression model and a classification model learn
//! the score from [volatility, momentum, trend strength]; their predictions
//! are averaged.

use crate::application::ml::classifier_regressor::ClassifierRegressor;
use crate::application::ml::predictor::Estimator;
use crate::application::ml::random_forest::RandomForestEstimator;
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::market::MarketWindow;
use crate::domain::ml::{Dataset, FeatureMatrix, ModelMetrics, ScalerKind, ScalerState, SplitStrategy};
use crate::domain::risk::risk_features::{historical_var, pct_change};
use crate::domain::risk::{RiskFeatureConfig, RiskFeatures};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const REGRESSION_MODEL: &str = "regression";
pub const CLASSIFICATION_MODEL: &str = "classification";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorerConfig {
    pub features: RiskFeatureConfig,
    /// Bars per training segment
    pub segment_len: usize,
    /// Bars between segment starts
    pub segment_stride: usize,
    pub test_fraction: f64,
    pub split: SplitStrategy,
    /// Tail probability of the historical VaR (0.05 -> 95% VaR)
    pub var_alpha: f64,
}

impl Default for RiskScorerConfig {
    fn default() -> Self {
        Self {
            features: RiskFeatureConfig::default(),
            segment_len: 60,
            segment_stride: 5,
            test_fraction: 0.2,
            split: SplitStrategy::Chronological,
            var_alpha: 0.05,
        }
    }
}

impl RiskScorerConfig {
    pub fn validate(&self) -> PredictionResult<()> {
        self.features.validate()?;
        if self.segment_stride == 0 {
            return Err(PredictionError::invalid("segment stride must be positive"));
        }
        if self.segment_len < self.features.required_history() {
            return Err(PredictionError::invalid(format!(
                "segment length {} is shorter than the {} bars the risk features need",
                self.segment_len,
                self.features.required_history()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskTrainingReport {
    pub segments: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Test MAE/RMSE per model; empty when no rows were held out
    pub metrics: BTreeMap<String, ModelMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub features: RiskFeatures,
    /// Mean of both models' predicted risk score
    pub model_risk: f64,
    /// Historical value-at-risk of the window's step returns
    pub value_at_risk: f64,
}

pub struct RiskScorer {
    config: RiskScorerConfig,
    regression: Box<dyn Estimator>,
    classification: Box<dyn Estimator>,
    scaler: Option<ScalerState>,
}

impl RiskScorer {
    pub fn new(config: RiskScorerConfig) -> Self {
        Self::with_models(
            config,
            Box::new(RandomForestEstimator::default()),
            Box::new(ClassifierRegressor::default()),
        )
    }

    pub fn with_models(
        config: RiskScorerConfig,
        regression: Box<dyn Estimator>,
        classification: Box<dyn Estimator>,
    ) -> Self {
        Self {
            config,
            regression,
            classification,
            scaler: None,
        }
    }

    pub fn config(&self) -> &RiskScorerConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn compute_features(&self, window: &MarketWindow) -> PredictionResult<RiskFeatures> {
        RiskFeatures::compute(window, &self.config.features)
    }

    fn segment_dataset(&self, history: &MarketWindow) -> PredictionResult<Dataset> {
        let segments = history.segments(self.config.segment_len, self.config.segment_stride);
        if segments.len() < 2 {
            return Err(PredictionError::insufficient(
                "risk training segments",
                self.config.segment_len + self.config.segment_stride,
                history.len(),
            ));
        }

        let mut rows = Vec::with_capacity(segments.len());
        let mut target = Vec::with_capacity(segments.len());
        for segment in &segments {
            let features = self.compute_features(segment)?;
            rows.push(features.model_inputs());
            target.push(features.risk_score);
        }
        Dataset::new(FeatureMatrix::new(rows)?, target)
    }

    fn fit_model(
        model: &mut dyn Estimator,
        name: &str,
        train: &(FeatureMatrix, Vec<f64>),
        test: &(FeatureMatrix, Vec<f64>),
    ) -> PredictionResult<Option<ModelMetrics>> {
        let attribute = |e: PredictionError| e.for_model(name);
        model.fit(&train.0, &train.1).map_err(attribute)?;
        if test.1.is_empty() {
            return Ok(None);
        }
        let preds = model.predict(&test.0).map_err(attribute)?;
        ModelMetrics::evaluate(&preds, &test.1)
            .map(Some)
            .map_err(attribute)
    }

    /// Train both models on rolling segments of `history`.
    ///
    /// The scorer stays unfit unless both models train.
    pub fn train(&mut self, history: &MarketWindow) -> PredictionResult<RiskTrainingReport> {
        self.config.validate()?;
        self.scaler = None;

        let dataset = self.segment_dataset(history)?;
        let (train, test) = dataset.split(self.config.test_fraction, self.config.split)?;

        let scaler = ScalerState::fit(ScalerKind::Standard, &train.features)?;
        let train_data = (scaler.transform(&train.features)?, train.target);
        let test_data = (scaler.transform(&test.features)?, test.target);

        info!(
            "Training risk models on {} segments (train: {}, test: {})",
            dataset.n_rows(),
            train_data.1.len(),
            test_data.1.len()
        );

        let mut report = RiskTrainingReport {
            segments: dataset.n_rows(),
            train_rows: train_data.1.len(),
            test_rows: test_data.1.len(),
            ..Default::default()
        };
        let models: [(&str, &mut Box<dyn Estimator>); 2] = [
            (REGRESSION_MODEL, &mut self.regression),
            (CLASSIFICATION_MODEL, &mut self.classification),
        ];
        let mut first_error = None;
        for (name, model) in models {
            match Self::fit_model(&mut **model, name, &train_data, &test_data) {
                Ok(Some(metrics)) => {
                    info!(
                        "Risk model {}: MAE={:.6}, RMSE={:.6}",
                        name, metrics.mae, metrics.rmse
                    );
                    report.metrics.insert(name.to_string(), metrics);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Risk model {} failed to train: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.scaler = Some(scaler);
        Ok(report)
    }

    /// Predicted risk score of `window`, averaged over both models.
    pub fn predict_risk(&self, window: &MarketWindow) -> PredictionResult<f64> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| PredictionError::not_fitted("risk scorer"))?;

        let features = self.compute_features(window)?;
        let inputs = scaler.transform(&FeatureMatrix::new(vec![features.model_inputs()])?)?;

        let mut total = 0.0;
        for (name, model) in [
            (REGRESSION_MODEL, &self.regression),
            (CLASSIFICATION_MODEL, &self.classification),
        ] {
            let prediction = model
                .predict(&inputs)
                .map_err(|e| e.for_model(name))?
                .first()
                .copied()
                .ok_or_else(|| {
                    PredictionError::shape(format!("{} risk output", name), "no prediction returned")
                })?;
            debug!("Risk model {} predicted {:.6}", name, prediction);
            total += prediction;
        }
        Ok(total / 2.0)
    }

    /// Window statistics, model risk and historical VaR in one report.
    pub fn assess(&self, window: &MarketWindow) -> PredictionResult<RiskAssessment> {
        let model_risk = self.predict_risk(window)?;
        let features = self.compute_features(window)?;
        let returns = pct_change(&window.closes())?;
        let value_at_risk = historical_var(&returns, self.config.var_alpha)?;
        info!(
            "Risk assessment: score={:.4}, model={:.4}, VaR={:.4}",
            features.risk_score, model_risk, value_at_risk
        );
        Ok(RiskAssessment {
            features,
            model_risk,
            value_at_risk,
        })
    }
}
