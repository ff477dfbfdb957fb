//! ONNX Runtime backed classifier

use crate::models::classifier::Classifier;
use crate::types::prediction::Classification;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Classifier exported to ONNX (e.g. a scikit-learn Random Forest via skl2onnx).
///
/// The exported graph has a `label` output and, when the estimator supports
/// it, a `probabilities` output. A session run needs exclusive access, so the
/// session is kept behind a mutex; the model itself never changes.
pub struct OnnxClassifier {
    /// Model name
    pub(crate) name: String,
    /// ONNX Runtime session
    pub(crate) session: Mutex<Session>,
    /// Input name for the feature tensor
    pub(crate) input_name: String,
    /// Feature count declared by the input tensor, when fixed
    pub(crate) input_width: Option<usize>,
    /// Output holding the predicted class
    pub(crate) label_output: String,
    /// Output holding class probabilities, if the export has one
    pub(crate) probability_output: Option<String>,
    /// Feature ordering embedded in the model metadata
    pub(crate) feature_names: Option<String>,
}

impl OnnxClassifier {
    /// Raw `feature_names` metadata recorded at export time
    pub fn embedded_feature_names(&self) -> Option<&str> {
        self.feature_names.as_deref()
    }

    /// Run the session once and read both outputs.
    fn run(&self, row: &[f64]) -> Result<Classification> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, row.len() as i64];
        let values: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let input_tensor =
            Tensor::from_array((shape, values)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let label = self.extract_label(&outputs)?;
        let probabilities = match &self.probability_output {
            Some(name) => Some(self.extract_probabilities(&outputs, name)?),
            None => None,
        };

        debug!(model = %self.name, label = label, "ONNX inference complete");

        Ok(Classification {
            label,
            probabilities,
        })
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Result<i64> {
        let output = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| anyhow::anyhow!("Model output '{}' missing", self.label_output))?;

        let (_, data) = output
            .try_extract_tensor::<i64>()
            .context("Label output is not an int64 tensor")?;

        data.first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned an empty label tensor"))
    }

    /// Extract class probabilities.
    /// Handles both plain tensor outputs and seq(map) outputs (skl2onnx zipmap)
    fn extract_probabilities(&self, outputs: &SessionOutputs, output_name: &str) -> Result<Vec<f64>> {
        let output = outputs
            .get(output_name)
            .ok_or_else(|| anyhow::anyhow!("Model output '{}' missing", output_name))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Ok(first_row(&dims, data));
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(anyhow::anyhow!(
            "Unsupported probability output type for '{}'",
            output_name
        ))
    }

    /// Extract probabilities from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<Vec<f64>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        // batch_size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        let pairs: Vec<(i64, f64)> = kv_pairs
            .iter()
            .map(|(class_id, prob)| (*class_id, *prob as f64))
            .collect();

        probabilities_by_class(&pairs)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, row: &[f64]) -> Result<i64> {
        Ok(self.run(row)?.label)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Option<Vec<f64>>> {
        if self.probability_output.is_none() {
            return Ok(None);
        }
        Ok(self.run(row)?.probabilities)
    }

    fn supports_proba(&self) -> bool {
        self.probability_output.is_some()
    }

    fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn classify(&self, row: &[f64]) -> Result<Classification> {
        self.run(row)
    }
}

/// First row of a `[batch, classes]` or `[classes]` probability tensor
fn first_row(dims: &[i64], data: &[f32]) -> Vec<f64> {
    let width = match dims {
        [_, classes] if *classes > 0 => *classes as usize,
        _ => data.len(),
    };
    data.iter().take(width).map(|&p| p as f64).collect()
}

/// Dense probability vector indexed by class id from `(class, probability)` pairs
fn probabilities_by_class(pairs: &[(i64, f64)]) -> Result<Vec<f64>> {
    let max_class = pairs
        .iter()
        .map(|(class_id, _)| *class_id)
        .max()
        .ok_or_else(|| anyhow::anyhow!("No probability found in map"))?;

    if max_class < 0 || pairs.iter().any(|(class_id, _)| *class_id < 0) {
        return Err(anyhow::anyhow!("Negative class id in probability map"));
    }

    let mut probabilities = vec![0.0; max_class as usize + 1];
    for (class_id, prob) in pairs {
        probabilities[*class_id as usize] = *prob;
    }
    Ok(probabilities)
}
