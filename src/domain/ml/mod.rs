pub mod feature_matrix;
pub mod metrics;
pub mod scaler;

pub use feature_matrix::{Dataset, FeatureMatrix, SplitStrategy};
pub use metrics::{ConfidenceInterval, ModelMetrics};
pub use scaler::{ScalerKind, ScalerState};
