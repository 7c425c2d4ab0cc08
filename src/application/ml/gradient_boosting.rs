use super::predictor::{Estimator, to_dense, validate_fit_input, validate_predict_input};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::FeatureMatrix;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParams {
    /// Boosting rounds (one tree each)
    pub n_rounds: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
        }
    }
}

struct BoostedModel {
    base: f64,
    trees: Vec<Tree>,
}

/// Gradient-boosted regressor under squared loss.
///
/// Starts from the target mean and adds shallow SmartCore regression trees,
/// each fit to the residuals left by the previous rounds.
pub struct GradientBoostingEstimator {
    params: GradientBoostingParams,
    model: Option<BoostedModel>,
    n_features: Option<usize>,
}

impl GradientBoostingEstimator {
    pub fn new(params: GradientBoostingParams) -> Self {
        Self {
            params,
            model: None,
            n_features: None,
        }
    }

    /// Trees actually kept after early stopping.
    pub fn n_trees(&self) -> usize {
        self.model.as_ref().map(|m| m.trees.len()).unwrap_or(0)
    }
}

impl Default for GradientBoostingEstimator {
    fn default() -> Self {
        Self::new(GradientBoostingParams::default())
    }
}

impl Estimator for GradientBoostingEstimator {
    fn fit(&mut self, features: &FeatureMatrix, target: &[f64]) -> PredictionResult<()> {
        validate_fit_input(self.name(), features, target)?;
        if !(self.params.learning_rate > 0.0 && self.params.learning_rate <= 1.0) {
            return Err(PredictionError::invalid(format!(
                "gradient boosting learning rate must be in (0, 1], got {}",
                self.params.learning_rate
            )));
        }

        let x = to_dense(features)?;
        let base = target.iter().sum::<f64>() / target.len() as f64;
        let mut fitted = vec![base; target.len()];
        let mut trees = Vec::with_capacity(self.params.n_rounds);

        for round in 0..self.params.n_rounds {
            let residuals: Vec<f64> = target.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            if residuals.iter().all(|r| r.abs() < 1e-12) {
                debug!("Gradient boosting converged after {} rounds", round);
                break;
            }

            let params = DecisionTreeRegressorParameters::default()
                .with_max_depth(self.params.max_depth)
                .with_min_samples_split(self.params.min_samples_split);
            let tree = DecisionTreeRegressor::fit(&x, &residuals, params).map_err(|e| {
                PredictionError::backend("smartcore", format!("Round {} training error: {}", round, e))
            })?;
            let step = tree
                .predict(&x)
                .map_err(|e| PredictionError::backend("smartcore", e))?;
            for (f, s) in fitted.iter_mut().zip(step) {
                *f += self.params.learning_rate * s;
            }
            trees.push(tree);
        }

        self.model = Some(BoostedModel { base, trees });
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
        let mut out = vec![model.base; features.n_rows()];
        for tree in &model.trees {
            let step = tree
                .predict(&x)
                .map_err(|e| PredictionError::backend("smartcore", e))?;
            for (o, s) in out.iter_mut().zip(step) {
                *o += self.params.learning_rate * s;
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "Gradient Boosted Trees"
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::metrics::root_mean_squared_error;

    fn step_data() -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let target = (0..30).map(|i| if i < 15 { 1.0 } else { 5.0 }).collect();
        (FeatureMatrix::new(rows).unwrap(), target)
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = step_data();
        let model = GradientBoostingEstimator::default();
        assert!(matches!(model.predict(&x), Err(PredictionError::NotFitted { .. })));
    }

    #[test]
    fn test_boosting_reduces_error_below_mean_baseline() {
        let (x, y) = step_data();
        let mut model = GradientBoostingEstimator::default();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), y.len());

        let baseline = vec![3.0; y.len()];
        let rmse = root_mean_squared_error(&preds, &y).unwrap();
        let base_rmse = root_mean_squared_error(&baseline, &y).unwrap();
        assert!(rmse < base_rmse * 0.1, "rmse {} vs baseline {}", rmse, base_rmse);
    }

    #[test]
    fn test_constant_target_stops_early() {
        let (x, _) = step_data();
        let y = vec![2.5; 30];
        let mut model = GradientBoostingEstimator::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_trees(), 0);
        assert!(model.predict(&x).unwrap().iter().all(|p| (*p - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_invalid_learning_rate() {
        let (x, y) = step_data();
        let mut model = GradientBoostingEstimator::new(GradientBoostingParams {
            learning_rate: 0.0,
            ..Default::default()
        });
        assert!(matches!(model.fit(&x, &y), Err(PredictionError::InvalidInput { .. })));
        assert!(!model.is_fitted());
    }
}
