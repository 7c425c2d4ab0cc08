use super::predictor::{Estimator, to_dense, validate_fit_input, validate_predict_input};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::FeatureMatrix;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees in the random forest
    pub n_trees: usize,
    /// Maximum depth of trees
    pub max_depth: u16,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
        }
    }
}

/// Tree-ensemble regressor backed by SmartCore's random forest.
pub struct RandomForestEstimator {
    params: RandomForestParams,
    model: Option<RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
    n_features: Option<usize>,
}

impl RandomForestEstimator {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            model: None,
            n_features: None,
        }
    }
}

impl Default for RandomForestEstimator {
    fn default() -> Self {
        Self::new(RandomForestParams::default())
    }
}

impl Estimator for RandomForestEstimator {
    fn fit(&mut self, features: &FeatureMatrix, target: &[f64]) -> PredictionResult<()> {
        validate_fit_input(self.name(), features, target)?;

        let x = to_dense(features)?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.params.n_trees)
            .with_max_depth(self.params.max_depth)
            .with_min_samples_split(self.params.min_samples_split);

        debug!(
            "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}) on {} samples",
            self.params.n_trees,
            self.params.max_depth,
            self.params.min_samples_split,
            features.n_rows()
        );

        let model = RandomForestRegressor::fit(&x, &target.to_vec(), params)
            .map_err(|e| PredictionError::backend("smartcore", format!("Training error: {}", e)))?;
        self.model = Some(model);
        self.n_features = Some(features.n_cols());
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        validate_predict_input(self.name(), self.n_features, features)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PredictionError::not_fitted(self.name()))?;

        let x = to_dense(features)?;
        model
            .predict(&x)
            .map_err(|e| PredictionError::backend("smartcore", format!("Prediction failed: {}", e)))
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}
