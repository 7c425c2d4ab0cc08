//! Ensemble and price predictor configuration parsed from environment variables.

use super::parse_var;
use crate::application::ml::classifier_regressor::ClassifierParams;
use crate::application::ml::ensemble::EnsembleConfig;
use crate::application::ml::gradient_boosting::GradientBoostingParams;
use crate::application::ml::price_predictor::PricePredictorConfig;
use crate::application::ml::random_forest::RandomForestParams;
use crate::application::ml::sequence_regressor::SequenceParams;
use crate::domain::ml::{ScalerKind, SplitStrategy};
use anyhow::{Context, Result, bail, ensure};
use std::env;

fn parse_scaler(value: &str) -> Result<ScalerKind> {
    match value.to_lowercase().as_str() {
        "minmax" => Ok(ScalerKind::MinMax),
        "standard" => Ok(ScalerKind::Standard),
        other => bail!(
            "Invalid ENSEMBLE_SCALER: {}. Must be 'minmax' or 'standard'",
            other
        ),
    }
}

/// Ensemble environment configuration
#[derive(Debug, Clone)]
pub struct EnsembleEnvConfig {
    pub test_fraction: f64,
    /// Shuffle seed; chronological split when unset
    pub split_seed: Option<u64>,
    pub parallel: bool,
    pub scaler: ScalerKind,

    // Random forest
    pub rf_n_trees: usize,
    pub rf_max_depth: u16,
    pub rf_min_split: usize,

    // Gradient boosting
    pub gb_rounds: usize,
    pub gb_learning_rate: f64,
    pub gb_max_depth: u16,

    // Classifier regressor
    pub classifier_bins: usize,

    // Sequence model
    pub sequence_lookback: usize,
    pub sequence_epochs: usize,
    pub sequence_learning_rate: f64,
    pub sequence_validation_split: f64,
}

impl EnsembleEnvConfig {
    pub fn from_env() -> Result<Self> {
        let split_seed = match env::var("ENSEMBLE_SPLIT_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .context("Failed to parse ENSEMBLE_SPLIT_SEED")?,
            ),
            Err(_) => None,
        };
        let scaler =
            parse_scaler(&env::var("ENSEMBLE_SCALER").unwrap_or_else(|_| "minmax".to_string()))?;

        let config = Self {
            test_fraction: parse_var("ENSEMBLE_TEST_FRACTION", 0.2)?,
            split_seed,
            parallel: parse_var("ENSEMBLE_PARALLEL", true)?,
            scaler,
            rf_n_trees: parse_var("RF_N_TREES", 100)?,
            rf_max_depth: parse_var("RF_MAX_DEPTH", 10)?,
            rf_min_split: parse_var("RF_MIN_SPLIT", 5)?,
            gb_rounds: parse_var("GB_ROUNDS", 100)?,
            gb_learning_rate: parse_var("GB_LEARNING_RATE", 0.1)?,
            gb_max_depth: parse_var("GB_MAX_DEPTH", 3)?,
            classifier_bins: parse_var("CLASSIFIER_BINS", 5)?,
            sequence_lookback: parse_var("SEQUENCE_LOOKBACK", 60)?,
            sequence_epochs: parse_var("SEQUENCE_EPOCHS", 50)?,
            sequence_learning_rate: parse_var("SEQUENCE_LEARNING_RATE", 0.1)?,
            sequence_validation_split: parse_var("SEQUENCE_VALIDATION_SPLIT", 0.2)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.test_fraction),
            "ENSEMBLE_TEST_FRACTION must be in [0, 1), got {}",
            self.test_fraction
        );
        ensure!(
            (0.0..1.0).contains(&self.sequence_validation_split),
            "SEQUENCE_VALIDATION_SPLIT must be in [0, 1), got {}",
            self.sequence_validation_split
        );
        ensure!(
            self.sequence_lookback >= 2,
            "SEQUENCE_LOOKBACK must be at least 2, got {}",
            self.sequence_lookback
        );
        ensure!(self.rf_n_trees > 0, "RF_N_TREES must be positive");
        ensure!(self.classifier_bins > 0, "CLASSIFIER_BINS must be positive");
        Ok(())
    }

    pub fn sequence_params(&self) -> SequenceParams {
        SequenceParams {
            lookback: self.sequence_lookback,
            epochs: self.sequence_epochs,
            learning_rate: self.sequence_learning_rate,
        }
    }

    pub fn ensemble_config(&self) -> EnsembleConfig {
        EnsembleConfig {
            test_fraction: self.test_fraction,
            split: self
                .split_seed
                .map_or(SplitStrategy::Chronological, |seed| SplitStrategy::Shuffled { seed }),
            scaler: self.scaler,
            parallel: self.parallel,
            random_forest: RandomForestParams {
                n_trees: self.rf_n_trees,
                max_depth: self.rf_max_depth,
                min_samples_split: self.rf_min_split,
            },
            gradient_boosting: GradientBoostingParams {
                n_rounds: self.gb_rounds,
                learning_rate: self.gb_learning_rate,
                max_depth: self.gb_max_depth,
                ..Default::default()
            },
            classifier: ClassifierParams {
                n_classes: self.classifier_bins,
                ..Default::default()
            },
            sequence: self.sequence_params(),
        }
    }

    pub fn price_predictor_config(&self, asset: impl Into<String>) -> PricePredictorConfig {
        PricePredictorConfig {
            asset: asset.into(),
            sequence: self.sequence_params(),
            validation_split: self.sequence_validation_split,
            ..Default::default()
        }
    }
}
