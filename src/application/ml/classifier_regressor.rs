use super::predictor::{Estimator, to_dense, validate_fit_input, validate_predict_input};
use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::FeatureMatrix;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Number of rank-quantile classes the target is cut into
    pub n_classes: usize,
    pub n_trees: u16,
    pub max_depth: u16,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            n_classes: 5,
            n_trees: 50,
            max_depth: 8,
        }
    }
}

enum ClassModel {
    /// All training targets fell in one class
    Constant(f64),
    Forest {
        classifier: Classifier,
        class_values: Vec<f64>,
    },
}

/// Classifier used as a regressor.
///
/// Training targets are cut into rank-quantile classes and a SmartCore random
/// forest classifier learns the class of each row. The predicted class is read
/// back as a continuous value: the mean training target of that class.
pub struct ClassifierRegressor {
    params: ClassifierParams,
    model: Option<ClassModel>,
    n_features: Option<usize>,
}

impl ClassifierRegressor {
    pub fn new(params: ClassifierParams) -> Self {
        Self {
            params,
            model: None,
            n_features: None,
        }
    }

    /// Class label per row and the mean target of every class.
    fn discretize(&self, target: &[f64]) -> (Vec<u32>, Vec<f64>) {
        let n = target.len();
        let n_classes = self.params.n_classes.clamp(1, n);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| target[a].total_cmp(&target[b]));

        let mut labels = vec![0u32; n];
        let mut sums = vec![0.0; n_classes];
        let mut counts = vec![0usize; n_classes];
        for (rank, &idx) in order.iter().enumerate() {
            let class = rank * n_classes / n;
            labels[idx] = class as u32;
            sums[class] += target[idx];
            counts[class] += 1;
        }

        let class_values = sums
            .iter()
            .zip(&counts)
            .map(|(s, &c)| s / c as f64)
            .collect();
        (labels, class_values)
    }
}

impl Default for ClassifierRegressor {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

impl Estimator for ClassifierRegressor {
    fn fit(&mut self, features: &FeatureMatrix, target: &[f64]) -> PredictionResult<()> {
        validate_fit_input(self.name(), features, target)?;
        if self.params.n_trees == 0 || self.params.n_classes == 0 {
            return Err(PredictionError::invalid(
                "classifier regressor needs at least one tree and one class",
            ));
        }

        let first = target[0];
        let model = if target.iter().all(|t| (t - first).abs() < f64::EPSILON) {
            ClassModel::Constant(first)
        } else {
            let (labels, class_values) = self.discretize(target);
            debug!(
                "Training classifier regressor with {} classes on {} samples",
                class_values.len(),
                target.len()
            );

            let x = to_dense(features)?;
            let params = RandomForestClassifierParameters::default()
                .with_n_trees(self.params.n_trees)
                .with_max_depth(self.params.max_depth);
            let classifier = RandomForestClassifier::fit(&x, &labels, params).map_err(|e| {
                PredictionError::backend("smartcore", format!("Training error: {}", e))
            })?;
            ClassModel::Forest {
                classifier,
                class_values,
            }
        };

        self.model = Some(model);
        self.n_features = Some(features.n_cols());
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>> {
        validate_predict_input(self.name(), self.n_features, features)?;
        match self.model.as_ref() {
            None => Err(PredictionError::not_fitted(self.name())),
            Some(ClassModel::Constant(value)) => Ok(vec![*value; features.n_rows()]),
            Some(ClassModel::Forest {
                classifier,
                class_values,
            }) => {
                let x = to_dense(features)?;
                let labels = classifier.predict(&x).map_err(|e| {
                    PredictionError::backend("smartcore", format!("Prediction failed: {}", e))
                })?;
                labels
                    .into_iter()
                    .map(|label| {
                        class_values.get(label as usize).copied().ok_or_else(|| {
                            PredictionError::shape(
                                "classifier output",
                                format!("unknown class label {}", label),
                            )
                        })
                    })
                    .collect()
            }
        }
    }

    fn name(&self) -> &str {
        "Classifier Regressor"
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}
