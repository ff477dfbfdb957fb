//! Error types for the prediction path and model loading

use thiserror::Error;

/// Message returned when a prediction request lacks one of the required fields
pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";

/// Failure while serving a single prediction request
#[derive(Debug, Error)]
pub enum PredictError {
    /// Client input is missing or not shaped like a transaction (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Feature construction or inference failed (HTTP 500).
    ///
    /// `message` goes back to the client and may quote request values;
    /// `summary` is what gets logged and never does.
    #[error("{message}")]
    Processing { message: String, summary: String },
}

impl PredictError {
    pub fn missing_fields() -> Self {
        PredictError::Validation(MISSING_FIELDS_MESSAGE.to_string())
    }

    /// Processing failure whose message carries no request values
    pub fn processing(message: impl Into<String>) -> Self {
        let message = message.into();
        PredictError::Processing {
            summary: message.clone(),
            message,
        }
    }

    /// Processing failure caused by the value of one request field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        PredictError::Processing {
            message: message.into(),
            summary: format!("invalid value for {}", field),
        }
    }

    /// Log-safe description of the failure
    pub fn summary(&self) -> &str {
        match self {
            PredictError::Validation(message) => message,
            PredictError::Processing { summary, .. } => summary,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PredictError::Validation(_))
    }
}

/// Problems with the model artifact detected while loading it
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact has no label output (outputs: {0:?})")]
    MissingLabelOutput(Vec<String>),

    #[error("feature ordering could not be determined: {0}")]
    FeatureOrdering(String),

    #[error("invalid feature schema: {0}")]
    InvalidSchema(String),

    #[error("invalid feature info file {path}: {reason}")]
    FeatureInfo { path: String, reason: String },
}
