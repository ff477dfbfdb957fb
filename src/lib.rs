//! Fraud Classifier Service Library
//!
//! HTTP inference service for a pre-trained transaction fraud classifier.
//! Requests are mapped onto the model's training feature schema and scored by
//! an ONNX export of the classifier.

pub mod api;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod types;

pub use config::AppConfig;
pub use error::{ModelError, PredictError};
pub use feature_extractor::{FeatureExtractor, FeatureSchema};
pub use models::classifier::Classifier;
pub use models::inference::InferenceEngine;
pub use types::{details::ModelDetails, prediction::PredictionResult, transaction::TransactionInput};
