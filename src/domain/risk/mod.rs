// Risk statistics domain
pub mod risk_features;

pub use risk_features::{RiskFeatureConfig, RiskFeatures};
