use crate::domain::errors::{PredictionError, PredictionResult};
use serde::{Deserialize, Serialize};

/// One observation of an asset's closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    pub timestamp: i64,
    pub close: f64,
}

/// Time-ascending sequence of bars with strictly positive, finite closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketWindow {
    bars: Vec<MarketBar>,
}

impl MarketWindow {
    pub fn new(bars: Vec<MarketBar>) -> PredictionResult<Self> {
        for (idx, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(PredictionError::invalid(format!(
                    "close price at index {} must be finite and positive, got {}",
                    idx, bar.close
                )));
            }
        }
        if let Some(idx) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(PredictionError::invalid(format!(
                "bars must be ascending by time: index {} precedes index {}",
                idx + 1,
                idx
            )));
        }
        Ok(Self { bars })
    }

    /// Window over bare closes, stamped 0, 1, 2, ...
    pub fn from_closes(closes: &[f64]) -> PredictionResult<Self> {
        Self::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| MarketBar {
                    timestamp: i as i64,
                    close,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[MarketBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// The most recent `n` bars (or all of them when fewer exist).
    pub fn tail(&self, n: usize) -> MarketWindow {
        let start = self.bars.len().saturating_sub(n);
        Self {
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Rolling sub-windows of `len` bars, starting every `stride` bars.
    pub fn segments(&self, len: usize, stride: usize) -> Vec<MarketWindow> {
        if len == 0 || stride == 0 || self.bars.len() < len {
            return Vec::new();
        }
        (0..=self.bars.len() - len)
            .step_by(stride)
            .map(|start| Self {
                bars: self.bars[start..start + len].to_vec(),
            })
            .collect()
    }
}
