//! ONNX model loader

use crate::error::ModelError;
use crate::feature_extractor::FeatureSchema;
use crate::models::onnx::OnnxClassifier;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Custom metadata key holding the comma separated training column order
pub const FEATURE_NAMES_METADATA_KEY: &str = "feature_names";

/// Feature info file written next to the model at export time
#[derive(Debug, Deserialize)]
struct FeatureInfo {
    feature_names: Vec<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a classifier from an ONNX file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<OnnxClassifier> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // [batch, features]; a symbolic or unknown width reads as -1
        let input_width = session.inputs.first().and_then(|input| match &input.input_type {
            ValueType::Tensor { shape, .. } => shape.get(1).copied(),
            _ => None,
        });
        let input_width = input_width.filter(|&d| d > 0).map(|d| d as usize);

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let label_output = output_names
            .iter()
            .find(|name| name.contains("label"))
            .cloned()
            .ok_or_else(|| ModelError::MissingLabelOutput(output_names.clone()))?;

        let probability_output = output_names
            .iter()
            .find(|name| name.contains("prob"))
            .cloned();

        let feature_names = match session.metadata() {
            Ok(metadata) => metadata
                .custom(FEATURE_NAMES_METADATA_KEY)
                .ok()
                .flatten(),
            Err(e) => {
                warn!(model = %name, error = %e, "Could not read model metadata");
                None
            }
        };

        info!(
            model = %name,
            input = %input_name,
            input_width = ?input_width,
            label = %label_output,
            probabilities = ?probability_output,
            embedded_feature_names = feature_names.is_some(),
            "Model loaded successfully"
        );

        Ok(OnnxClassifier {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            input_width,
            label_output,
            probability_output,
            feature_names,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// Determine the feature ordering for a loaded model.
///
/// A configured feature info file takes precedence over the names embedded
/// in the artifact. With neither available the model cannot be served.
pub fn resolve_schema(
    feature_info_path: Option<&Path>,
    embedded: Option<&str>,
) -> Result<FeatureSchema, ModelError> {
    if let Some(path) = feature_info_path {
        return read_feature_info(path);
    }

    match embedded {
        Some(raw) => FeatureSchema::from_delimited(raw),
        None => Err(ModelError::FeatureOrdering(format!(
            "model has no '{}' metadata and no feature info file is configured",
            FEATURE_NAMES_METADATA_KEY
        ))),
    }
}

/// Check the resolved ordering against the model's declared input width.
///
/// `None` means the width is symbolic in the graph and cannot be checked.
pub fn validate_schema_width(
    schema: &FeatureSchema,
    input_width: Option<usize>,
) -> Result<(), ModelError> {
    match input_width {
        Some(width) if width != schema.len() => Err(ModelError::InvalidSchema(format!(
            "model expects {} features, feature ordering lists {}",
            width,
            schema.len()
        ))),
        _ => Ok(()),
    }
}

/// Read a `{"feature_names": [...]}` file
fn read_feature_info(path: &Path) -> Result<FeatureSchema, ModelError> {
    let invalid = |reason: String| ModelError::FeatureInfo {
        path: path.display().to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let info: FeatureInfo = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;

    FeatureSchema::new(info.feature_names)
}
