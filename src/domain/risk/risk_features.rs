//! Window statistics behind the composite risk score.
//!
//! Every statistic is defined only when the window is long enough for its
//! lookback. Short windows are reported as `InsufficientHistory` instead of
//! a zero or NaN placeholder.

use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::market::MarketWindow;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Lookback periods used to derive [`RiskFeatures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFeatureConfig {
    pub momentum_period: usize,
    pub short_ma: usize,
    pub long_ma: usize,
}

impl Default for RiskFeatureConfig {
    fn default() -> Self {
        Self {
            momentum_period: 10,
            short_ma: 20,
            long_ma: 50,
        }
    }
}

impl RiskFeatureConfig {
    /// Observations needed before every statistic is defined.
    pub fn required_history(&self) -> usize {
        (self.momentum_period + 1).max(self.long_ma).max(2)
    }

    pub fn validate(&self) -> PredictionResult<()> {
        if self.momentum_period == 0 || self.short_ma == 0 {
            return Err(PredictionError::invalid(
                "momentum period and short moving average must be positive",
            ));
        }
        if self.short_ma > self.long_ma {
            return Err(PredictionError::invalid(format!(
                "short moving average ({}) must not exceed long moving average ({})",
                self.short_ma, self.long_ma
            )));
        }
        Ok(())
    }
}

/// Derived risk statistics of one market window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub volatility: f64,
    pub momentum: f64,
    pub trend_strength: f64,
    pub max_drawdown: f64,
    pub risk_score: f64,
}

impl RiskFeatures {
    /// Column names of [`RiskFeatures::model_inputs`].
    pub const INPUT_NAMES: [&'static str; 3] = ["volatility", "momentum", "trend_strength"];

    pub fn compute(window: &MarketWindow, config: &RiskFeatureConfig) -> PredictionResult<Self> {
        config.validate()?;
        let required = config.required_history();
        if window.len() < required {
            let statistic = if config.long_ma >= config.momentum_period + 1 {
                "trend strength"
            } else {
                "momentum"
            };
            return Err(PredictionError::insufficient(statistic, required, window.len()));
        }

        let prices = window.closes();
        let volatility = volatility(&prices)?;
        let max_drawdown = max_drawdown(&prices)?;
        Ok(Self {
            volatility,
            momentum: momentum(&prices, config.momentum_period)?,
            trend_strength: trend_strength(&prices, config.short_ma, config.long_ma)?,
            max_drawdown,
            risk_score: composite_risk_score(volatility, max_drawdown),
        })
    }

    /// Model inputs in [`RiskFeatures::INPUT_NAMES`] order. The risk score is the
    /// training target and is not an input.
    pub fn model_inputs(&self) -> Vec<f64> {
        vec![self.volatility, self.momentum, self.trend_strength]
    }
}

/// Step-to-step percentage change.
pub fn pct_change(prices: &[f64]) -> PredictionResult<Vec<f64>> {
    pct_change_over(prices, 1)
}

fn pct_change_over(prices: &[f64], period: usize) -> PredictionResult<Vec<f64>> {
    if prices.len() < period + 1 {
        return Err(PredictionError::insufficient(
            format!("{}-step percentage change", period),
            period + 1,
            prices.len(),
        ));
    }
    Ok(prices
        .iter()
        .zip(&prices[period..])
        .map(|(prev, curr)| (curr - prev) / prev)
        .collect())
}

/// Population standard deviation of the step-to-step percentage change.
pub fn volatility(prices: &[f64]) -> PredictionResult<f64> {
    Ok(pct_change(prices)?.iter().population_std_dev())
}

/// Mean of the `period`-step percentage change.
pub fn momentum(prices: &[f64], period: usize) -> PredictionResult<f64> {
    Ok(pct_change_over(prices, period)?.iter().mean())
}

/// Trailing simple moving average, one value per complete window.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values.windows(window).map(|w| w.iter().mean()).collect()
}

/// Mean absolute gap between the short and long moving averages over the
/// steps where both are defined.
pub fn trend_strength(prices: &[f64], short: usize, long: usize) -> PredictionResult<f64> {
    if short == 0 || short > long {
        return Err(PredictionError::invalid(format!(
            "invalid moving average pair: short {} / long {}",
            short, long
        )));
    }
    if prices.len() < long {
        return Err(PredictionError::insufficient("trend strength", long, prices.len()));
    }

    let short_ma = rolling_mean(prices, short);
    let long_ma = rolling_mean(prices, long);
    // Align on the last long_ma.len() steps
    let offset = short_ma.len() - long_ma.len();
    Ok(short_ma[offset..]
        .iter()
        .zip(&long_ma)
        .map(|(s, l)| (s - l).abs())
        .mean())
}

/// Largest relative decline of cumulative return from its running peak,
/// as a positive fraction. Cumulative return starts at 1 before the first
/// price change.
pub fn max_drawdown(prices: &[f64]) -> PredictionResult<f64> {
    let returns = pct_change(prices)?;

    let mut wealth = 1.0;
    let mut peak = 1.0;
    let mut worst: f64 = 0.0;
    for r in returns {
        wealth *= 1.0 + r;
        peak = f64::max(peak, wealth);
        worst = worst.min((wealth - peak) / peak);
    }
    Ok(worst.abs())
}

pub fn composite_risk_score(volatility: f64, max_drawdown: f64) -> f64 {
    volatility * max_drawdown * 100.0
}

/// Historical value-at-risk: the return at the `alpha` quantile of the sorted
/// returns (e.g. alpha 0.05 for 95% confidence). Negative values are losses.
pub fn historical_var(returns: &[f64], alpha: f64) -> PredictionResult<f64> {
    if returns.is_empty() {
        return Err(PredictionError::insufficient("value at risk", 1, 0));
    }
    if !(0.0..1.0).contains(&alpha) {
        return Err(PredictionError::invalid(format!(
            "value at risk level must be in [0, 1), got {}",
            alpha
        )));
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() as f64 * alpha).floor() as usize).min(sorted.len() - 1);
    Ok(sorted[idx])
}
