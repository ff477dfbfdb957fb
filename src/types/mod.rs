//! Type definitions for the fraud classifier service

pub mod details;
pub mod prediction;
pub mod response;
pub mod transaction;

pub use details::{ModelDetails, ModelMetrics};
pub use prediction::PredictionResult;
pub use response::ApiResponse;
pub use transaction::TransactionInput;
