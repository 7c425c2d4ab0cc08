//! Configuration module for pricecast.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Ensemble (including the price predictor), Risk, and Observability.

mod ensemble_config;
mod observability_config;
mod risk_env_config;

pub use ensemble_config::EnsembleEnvConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use risk_env_config::RiskEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Read `key`, falling back to `default` when unset. Values that are set but
/// do not parse are errors naming the variable.
pub(crate) fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_raw(key, &env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parse_raw<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .context(format!("Failed to parse {}", key))
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub ensemble: EnsembleEnvConfig,
    pub risk: RiskEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ensemble: EnsembleEnvConfig::from_env().context("Failed to load ensemble config")?,
            risk: RiskEnvConfig::from_env().context("Failed to load risk config")?,
            observability: ObservabilityEnvConfig::from_env()
                .context("Failed to load observability config")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: usize = parse_var("PRICECAST_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
        assert!(parse_var("PRICECAST_TEST_UNSET_BOOL", true).unwrap());
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = parse_raw::<bool>("ENSEMBLE_PARALLEL", "yes").unwrap_err();
        assert!(err.to_string().contains("ENSEMBLE_PARALLEL"));
        assert!(parse_raw::<bool>("ENSEMBLE_PARALLEL", "false").is_ok_and(|v| !v));
        assert!(parse_raw::<usize>("RF_N_TREES", "-3").is_err());
    }

    #[test]
    fn test_config_loads_with_defaults() {
        let config = Config::from_env().expect("Should parse with defaults");
        assert_eq!(config.risk.momentum_period, 10);
        assert_eq!(config.ensemble.sequence_validation_split, 0.2);
    }
}
