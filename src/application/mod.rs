// Estimators, ensemble coordination and single-series price prediction
pub mod ml;

// Model-based risk scoring
pub mod risk_management;
