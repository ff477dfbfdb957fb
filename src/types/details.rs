//! Static model metadata served by `GET /model-details`

use serde::{Deserialize, Serialize};

/// Offline evaluation statistics for the deployed model.
///
/// These are configuration data recorded when the model was trained; the
/// service never recomputes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    #[serde(rename = "roc-auc")]
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self {
            accuracy: 0.9992089212724737,
            roc_auc: 0.9767033928048733,
            precision: 0.6272678762006404,
            recall: 0.9541396103896104,
            f1_score: 0.7569220862846104,
        }
    }
}

/// Model description record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDetails {
    pub algorithm: String,
    pub version: String,
    pub metrics: ModelMetrics,
}

impl Default for ModelDetails {
    fn default() -> Self {
        Self {
            algorithm: "Random Forest".to_string(),
            version: "1.0".to_string(),
            metrics: ModelMetrics::default(),
        }
    }
}
