// Domain-specific error types
pub mod errors;

// Market data domain
pub mod market;

// Feature tables, scaling and evaluation metrics
pub mod ml;

// Risk statistics domain
pub mod risk;
