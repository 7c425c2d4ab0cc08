use crate::domain::errors::{PredictionError, PredictionResult};
use crate::domain::ml::FeatureMatrix;
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Interface for trainable models.
///
/// `fit` moves an estimator from unfit to fit and only touches its own state.
/// `predict` is a pure function of the fitted state and the input, and fails
/// with `NotFitted` before the first successful `fit`.
pub trait Estimator: Send + Sync {
    /// Train on `features` (one row per observation) against `target`.
    fn fit(&mut self, features: &FeatureMatrix, target: &[f64]) -> PredictionResult<()>;

    /// One prediction per row of `features`.
    fn predict(&self, features: &FeatureMatrix) -> PredictionResult<Vec<f64>>;

    /// Get model name/type
    fn name(&self) -> &str;

    fn is_fitted(&self) -> bool;
}

/// Checks shared by every `fit`: non-empty matrix and matching target length.
pub fn validate_fit_input(
    model: &str,
    features: &FeatureMatrix,
    target: &[f64],
) -> PredictionResult<()> {
    if features.n_rows() == 0 {
        return Err(PredictionError::dimension(
            format!("{} training rows", model),
            1,
            0,
        ));
    }
    if features.n_cols() == 0 {
        return Err(PredictionError::dimension(
            format!("{} training columns", model),
            1,
            0,
        ));
    }
    if features.n_rows() != target.len() {
        return Err(PredictionError::dimension(
            format!("{} training target length", model),
            features.n_rows(),
            target.len(),
        ));
    }
    Ok(())
}

/// Checks shared by every `predict`: fitted, non-empty, and the fit-time width.
pub fn validate_predict_input(
    model: &str,
    fitted_width: Option<usize>,
    features: &FeatureMatrix,
) -> PredictionResult<()> {
    let width = fitted_width.ok_or_else(|| PredictionError::not_fitted(model))?;
    if features.n_rows() == 0 {
        return Err(PredictionError::dimension(
            format!("{} prediction rows", model),
            1,
            0,
        ));
    }
    if features.n_cols() != width {
        return Err(PredictionError::dimension(
            format!("{} prediction columns", model),
            width,
            features.n_cols(),
        ));
    }
    Ok(())
}

pub(crate) fn to_dense(features: &FeatureMatrix) -> PredictionResult<DenseMatrix<f64>> {
    DenseMatrix::from_2d_vec(&features.rows().to_vec())
        .map_err(|e| PredictionError::backend("smartcore", format!("Matrix creation failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_validation() {
        let x = FeatureMatrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert!(validate_fit_input("m", &x, &[1.0, 2.0]).is_ok());

        let err = validate_fit_input("m", &x, &[1.0]).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { expected: 2, actual: 1, .. }));

        let empty = FeatureMatrix::default();
        assert!(validate_fit_input("m", &empty, &[]).is_err());

        let no_cols = FeatureMatrix::new(vec![vec![], vec![]]).unwrap();
        assert!(validate_fit_input("m", &no_cols, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_predict_validation() {
        let x = FeatureMatrix::new(vec![vec![1.0, 2.0]]).unwrap();
        let err = validate_predict_input("m", None, &x).unwrap_err();
        assert_eq!(err, PredictionError::not_fitted("m"));

        let err = validate_predict_input("m", Some(3), &x).unwrap_err();
        assert!(err.to_string().contains("m prediction columns"));
        assert!(validate_predict_input("m", Some(2), &x).is_ok());
    }
}
