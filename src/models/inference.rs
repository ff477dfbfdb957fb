//! Inference engine: feature extraction plus classifier invocation

use crate::config::ModelConfig;
use crate::error::PredictError;
use crate::feature_extractor::{FeatureExtractor, FeatureSchema};
use crate::models::classifier::Classifier;
use crate::models::loader::{resolve_schema, validate_schema_width, ModelLoader};
use crate::types::prediction::{Classification, PredictionResult};
use crate::types::transaction::TransactionInput;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Confidence reported when the model cannot estimate probabilities
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Slack allowed around [0, 1] for probabilities computed in f32
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Immutable prediction service built once at startup and shared by all
/// request workers.
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    extractor: FeatureExtractor,
}

impl InferenceEngine {
    /// Load the configured ONNX model and resolve its feature ordering.
    ///
    /// Any failure here is fatal for the service.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let model = loader.load_model(&config.path, &config.name)?;

        let schema = resolve_schema(
            config.feature_info_path.as_deref(),
            model.embedded_feature_names(),
        )
        .context("Failed to determine model feature ordering")?;
        validate_schema_width(&schema, model.input_width())
            .context("Feature ordering does not fit the model input")?;

        info!(
            model = %config.name,
            features = schema.len(),
            probabilities = model.supports_proba(),
            "Inference engine initialized"
        );

        Ok(Self::with_classifier(Box::new(model), schema))
    }

    /// Build an engine around an already loaded classifier
    pub fn with_classifier(classifier: Box<dyn Classifier>, schema: FeatureSchema) -> Self {
        Self {
            classifier,
            extractor: FeatureExtractor::new(schema),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.extractor.schema()
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn supports_proba(&self) -> bool {
        self.classifier.supports_proba()
    }

    /// Score a single transaction
    pub fn predict(&self, input: &TransactionInput) -> Result<PredictionResult, PredictError> {
        let row = self.extractor.extract(input)?;
        self.predict_row(&row)
    }

    /// Score an already assembled feature row
    pub fn predict_row(&self, row: &[f64]) -> Result<PredictionResult, PredictError> {
        let classification = self
            .classifier
            .classify(row)
            .map_err(|e| PredictError::processing(e.to_string()))?;

        let result = to_prediction(classification)?;

        debug!(
            model = %self.classifier.name(),
            is_fraud = result.is_fraud,
            confidence = result.confidence,
            "Transaction scored"
        );

        Ok(result)
    }
}

/// Turn a raw label/probability pair into the client-facing verdict
fn to_prediction(classification: Classification) -> Result<PredictionResult, PredictError> {
    let Classification {
        label,
        probabilities,
    } = classification;

    let confidence = match probabilities {
        Some(probabilities) => {
            let probability = usize::try_from(label)
                .ok()
                .and_then(|index| probabilities.get(index).copied())
                .ok_or_else(|| {
                    PredictError::processing(format!(
                        "predicted class {} has no probability (model returned {} classes)",
                        label,
                        probabilities.len()
                    ))
                })?;

            if !probability.is_finite()
                || probability < -PROBABILITY_TOLERANCE
                || probability > 1.0 + PROBABILITY_TOLERANCE
            {
                return Err(PredictError::processing(format!(
                    "model returned invalid probability {}",
                    probability
                )));
            }
            probability.clamp(0.0, 1.0)
        }
        None => DEFAULT_CONFIDENCE,
    };

    Ok(PredictionResult {
        is_fraud: label != 0,
        confidence,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Classifier returning a fixed verdict and recording every row it sees
    pub(crate) struct StubClassifier {
        pub label: i64,
        pub probabilities: Option<Vec<f64>>,
        pub seen: Arc<Mutex<Vec<Vec<f64>>>>,
    }

    impl StubClassifier {
        pub fn new(label: i64, probabilities: Option<Vec<f64>>) -> Self {
            Self {
                label,
                probabilities,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            "stub"
        }

        fn predict(&self, row: &[f64]) -> Result<i64> {
            self.seen.lock().unwrap().push(row.to_vec());
            Ok(self.label)
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<Option<Vec<f64>>> {
            Ok(self.probabilities.clone())
        }

        fn supports_proba(&self) -> bool {
            self.probabilities.is_some()
        }
    }

    /// Classifier whose runs always fail
    pub(crate) struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _row: &[f64]) -> Result<i64> {
            Err(anyhow::anyhow!("inference backend unavailable"))
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<Option<Vec<f64>>> {
            Ok(None)
        }

        fn supports_proba(&self) -> bool {
            false
        }
    }

    pub(crate) fn training_schema() -> FeatureSchema {
        FeatureSchema::from_delimited(
            "amount,oldbalanceOrg,newbalanceOrig,oldbalanceDest,newbalanceDest,\
             type_CASH_IN,type_CASH_OUT,type_DEBIT,type_PAYMENT,type_TRANSFER",
        )
        .unwrap()
    }

    fn cash_out_input() -> TransactionInput {
        TransactionInput::from_value(json!({
            "transactionType": "cash out",
            "amount": 500,
            "originOldBalance": 1000,
            "originNewBalance": 500,
            "destOldBalance": 0,
            "destNewBalance": 500
        }))
        .unwrap()
    }

    #[test]
    fn test_fraud_verdict_uses_predicted_class_probability() {
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(1, Some(vec![0.2, 0.8]))),
            training_schema(),
        );

        let result = engine.predict(&cash_out_input()).unwrap();
        assert!(result.is_fraud);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_legitimate_verdict() {
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(0, Some(vec![0.93, 0.07]))),
            training_schema(),
        );

        let result = engine.predict(&cash_out_input()).unwrap();
        assert!(!result.is_fraud);
        assert_eq!(result.confidence, 0.93);
    }

    #[test]
    fn test_classifier_receives_schema_ordered_row() {
        let stub = StubClassifier::new(0, None);
        let seen = stub.seen.clone();
        let engine = InferenceEngine::with_classifier(Box::new(stub), training_schema());

        engine.predict(&cash_out_input()).unwrap();

        let rows = seen.lock().unwrap();
        assert_eq!(
            rows[0],
            vec![500.0, 1000.0, 500.0, 0.0, 500.0, 0.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_no_probability_support_defaults_confidence() {
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(1, None)),
            training_schema(),
        );

        let result = engine.predict(&cash_out_input()).unwrap();
        assert!(result.is_fraud);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_label_outside_probabilities_is_processing_error() {
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(2, Some(vec![0.4, 0.6]))),
            training_schema(),
        );

        let err = engine.predict(&cash_out_input()).unwrap_err();
        assert!(!err.is_validation());
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(1, Some(vec![0.0, 1.5]))),
            training_schema(),
        );

        assert!(engine.predict(&cash_out_input()).is_err());

        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(1, Some(vec![0.0, f64::NAN]))),
            training_schema(),
        );
        assert!(engine.predict(&cash_out_input()).is_err());
    }

    #[test]
    fn test_probability_rounding_noise_is_clamped() {
        // f32 tree ensembles can sum leaf votes to just over 1.0
        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(1, Some(vec![0.0, 1.0000001]))),
            training_schema(),
        );

        let result = engine.predict(&cash_out_input()).unwrap();
        assert!(result.is_fraud);
        assert_eq!(result.confidence, 1.0);

        let engine = InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(0, Some(vec![-0.0000001, 1.0]))),
            training_schema(),
        );
        assert_eq!(engine.predict(&cash_out_input()).unwrap().confidence, 0.0);
    }

    #[test]
    fn test_classifier_failure_becomes_processing_error() {
        let engine = InferenceEngine::with_classifier(Box::new(FailingClassifier), training_schema());

        let err = engine.predict(&cash_out_input()).unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "inference backend unavailable");
    }
}
