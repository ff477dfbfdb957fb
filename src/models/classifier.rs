//! Classifier capability consumed by the inference engine

use crate::types::prediction::Classification;
use anyhow::Result;

/// A trained binary classifier.
///
/// Implementations are loaded once and shared read-only across request
/// workers, so they must be `Send + Sync`.
pub trait Classifier: Send + Sync {
    /// Human readable model name used in logs
    fn name(&self) -> &str;

    /// Predict the class label for one feature row.
    fn predict(&self, row: &[f64]) -> Result<i64>;

    /// Per-class probabilities for one feature row, or `None` when the model
    /// does not support probability estimation.
    fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<f64>>>;

    /// Whether `predict_proba` can return probabilities.
    fn supports_proba(&self) -> bool;

    /// Number of features the model takes, if it declares one.
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Label and probabilities together.
    ///
    /// The default calls `predict` then `predict_proba`; implementations that
    /// produce both from a single run should override it.
    fn classify(&self, row: &[f64]) -> Result<Classification> {
        let label = self.predict(row)?;
        let probabilities = if self.supports_proba() {
            self.predict_proba(row)?
        } else {
            None
        };
        Ok(Classification {
            label,
            probabilities,
        })
    }
}
