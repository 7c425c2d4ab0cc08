use serde::Serialize;
use thiserror::Error;

/// Errors raised by estimators, the ensemble coordinator and the risk scorer.
///
/// Every variant carries enough context to name the offending matrix, model
/// or statistic.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum PredictionError {
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Shape error in {context}: {reason}")]
    ShapeError { context: String, reason: String },

    #[error("{component} is not fitted")]
    NotFitted { component: String },

    #[error("Insufficient history for {statistic}: need {required} observations, got {available}")]
    InsufficientHistory {
        statistic: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("{backend} backend failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Model '{model}' failed: {source}")]
    Model {
        model: String,
        #[source]
        source: Box<PredictionError>,
    },
}

impl PredictionError {
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn shape(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ShapeError {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn not_fitted(component: impl Into<String>) -> Self {
        Self::NotFitted {
            component: component.into(),
        }
    }

    pub fn insufficient(statistic: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientHistory {
            statistic: statistic.into(),
            required,
            available,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn backend(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Attribute this error to a named model. Already attributed errors are kept as is.
    pub fn for_model(self, model: impl Into<String>) -> Self {
        match self {
            attributed @ Self::Model { .. } => attributed,
            other => Self::Model {
                model: model.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any model attribution stripped.
    pub fn root(&self) -> &PredictionError {
        match self {
            Self::Model { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type PredictionResult<T> = Result<T, PredictionError>;
