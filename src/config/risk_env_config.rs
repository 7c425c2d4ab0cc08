//! Risk scorer configuration parsed from environment variables.
//!
//! Covers the window statistic lookbacks, the rolling training segments and
//! the value-at-risk level.

use super::parse_var;
use crate::application::risk_management::RiskScorerConfig;
use crate::domain::ml::SplitStrategy;
use crate::domain::risk::RiskFeatureConfig;
use anyhow::{Context, Result, ensure};

/// Risk scoring environment configuration
#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    // Window statistics
    pub momentum_period: usize,
    pub short_ma: usize,
    pub long_ma: usize,

    // Training segments
    pub segment_len: usize,
    pub segment_stride: usize,
    pub test_fraction: f64,

    // Value at risk
    pub var_confidence: f64,
}

impl RiskEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            momentum_period: parse_var("RISK_MOMENTUM_PERIOD", 10)?,
            short_ma: parse_var("RISK_SHORT_MA", 20)?,
            long_ma: parse_var("RISK_LONG_MA", 50)?,
            segment_len: parse_var("RISK_SEGMENT_LEN", 60)?,
            segment_stride: parse_var("RISK_SEGMENT_STRIDE", 5)?,
            test_fraction: parse_var("RISK_TEST_FRACTION", 0.2)?,
            var_confidence: parse_var("RISK_VAR_CONFIDENCE", 0.05)?,
        };
        ensure!(
            (0.0..1.0).contains(&config.test_fraction),
            "RISK_TEST_FRACTION must be in [0, 1), got {}",
            config.test_fraction
        );
        ensure!(
            config.var_confidence > 0.0 && config.var_confidence < 1.0,
            "RISK_VAR_CONFIDENCE must be in (0, 1), got {}",
            config.var_confidence
        );
        config
            .scorer_config()
            .validate()
            .context("Invalid risk window configuration")?;
        Ok(config)
    }

    pub fn feature_config(&self) -> RiskFeatureConfig {
        RiskFeatureConfig {
            momentum_period: self.momentum_period,
            short_ma: self.short_ma,
            long_ma: self.long_ma,
        }
    }

    pub fn scorer_config(&self) -> RiskScorerConfig {
        RiskScorerConfig {
            features: self.feature_config(),
            segment_len: self.segment_len,
            segment_stride: self.segment_stride,
            test_fraction: self.test_fraction,
            split: SplitStrategy::Chronological,
            var_alpha: self.var_confidence,
        }
    }
}
