//! Estimators, feature builders and the ensemble coordinator.

pub mod classifier_regressor;
pub mod ensemble;
pub mod feature_builder;
pub mod gradient_boosting;
pub mod predictor;
pub mod price_predictor;
pub mod random_forest;
pub mod sequence_regressor;

pub use classifier_regressor::{ClassifierParams, ClassifierRegressor};
pub use ensemble::{EnsembleConfig, EnsembleCoordinator, EnsembleResult, TrainingReport};
pub use feature_builder::{FeatureMatrixBuilder, FeatureTable, LagWindowBuilder, TargetColumnBuilder};
pub use gradient_boosting::{GradientBoostingEstimator, GradientBoostingParams};
pub use predictor::Estimator;
pub use price_predictor::{PricePrediction, PricePredictor, PricePredictorConfig, SequenceTrainingReport};
pub use random_forest::{RandomForestEstimator, RandomForestParams};
pub use sequence_regressor::{SequenceParams, SequenceRegressor};
