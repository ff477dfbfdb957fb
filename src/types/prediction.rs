//! Prediction output returned to clients

use serde::{Deserialize, Serialize};

/// Binary fraud verdict for a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Whether the classifier labelled the transaction as fraud
    pub is_fraud: bool,

    /// Probability of the predicted class (0.0 - 1.0)
    pub confidence: f64,
}

/// Raw classifier output for one feature row
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Predicted class index
    pub label: i64,

    /// Per-class probabilities, `None` when the model cannot estimate them
    pub probabilities: Option<Vec<f64>>,
}
