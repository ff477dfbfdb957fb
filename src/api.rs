//! HTTP routes for the classifier service

use crate::error::PredictError;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::details::ModelDetails;
use crate::types::prediction::PredictionResult;
use crate::types::response::ApiResponse;
use crate::types::transaction::TransactionInput;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use std::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Message attached to every successful prediction
pub const PREDICT_SUCCESS_MESSAGE: &str = "Transaction analyzed successfully";

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictError::Validation(_) => StatusCode::BAD_REQUEST,
            PredictError::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(self.to_string()))
    }
}

/// Register the service routes.
///
/// Expects `InferenceEngine`, `ModelDetails` and `ServiceMetrics` to be
/// registered as app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/predict", web::post().to(predict))
        .route("/model-details", web::get().to(model_details))
        .default_service(web::route().to(not_found));
}

/// `POST /predict`
pub async fn predict(
    engine: web::Data<InferenceEngine>,
    metrics: web::Data<ServiceMetrics>,
    body: web::Bytes,
) -> Result<HttpResponse, PredictError> {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    let outcome = score(engine, &body).await;
    let elapsed = start_time.elapsed();

    match outcome {
        Ok(result) => {
            metrics.record_prediction(elapsed, &result);
            debug!(
                request_id = %request_id,
                is_fraud = result.is_fraud,
                confidence = result.confidence,
                processing_time_us = elapsed.as_micros(),
                "Prediction served"
            );
            Ok(HttpResponse::Ok()
                .json(ApiResponse::success(result).with_message(PREDICT_SUCCESS_MESSAGE)))
        }
        Err(e) => {
            if e.is_validation() {
                metrics.record_rejection();
                warn!(request_id = %request_id, error = %e.summary(), "Prediction request rejected");
            } else {
                metrics.record_failure(elapsed);
                error!(request_id = %request_id, error = %e.summary(), "Prediction failed");
            }
            Err(e)
        }
    }
}

/// Parse the body and run inference on the blocking pool
async fn score(
    engine: web::Data<InferenceEngine>,
    body: &[u8],
) -> Result<PredictionResult, PredictError> {
    let input = TransactionInput::from_slice(body)?;

    web::block(move || engine.predict(&input))
        .await
        .map_err(|e| PredictError::processing(e.to_string()))?
}

/// `GET /model-details`
pub async fn model_details(details: web::Data<ModelDetails>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(details.get_ref()))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure("Not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::tests::{training_schema, FailingClassifier, StubClassifier};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn engine(label: i64, probabilities: Option<Vec<f64>>) -> InferenceEngine {
        InferenceEngine::with_classifier(
            Box::new(StubClassifier::new(label, probabilities)),
            training_schema(),
        )
    }

    fn cash_out_request() -> Value {
        json!({
            "transactionType": "cash out",
            "amount": 500,
            "originOldBalance": 1000,
            "originNewBalance": 500,
            "destOldBalance": 0,
            "destNewBalance": 500
        })
    }

    macro_rules! service {
        ($engine:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($engine))
                    .app_data(web::Data::new(ModelDetails::default()))
                    .app_data(web::Data::new(ServiceMetrics::new()))
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_predict_success() {
        let app = service!(engine(1, Some(vec![0.25, 0.75])));

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(cash_out_request())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["is_fraud"], true);
        assert_eq!(body["data"]["confidence"], 0.75);
        assert_eq!(body["message"], PREDICT_SUCCESS_MESSAGE);
    }

    #[actix_web::test]
    async fn test_predict_without_probabilities() {
        let app = service!(engine(0, None));

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(cash_out_request())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["is_fraud"], false);
        assert_eq!(body["data"]["confidence"], 1.0);
    }

    #[actix_web::test]
    async fn test_missing_field_returns_400() {
        let app = service!(engine(0, None));

        let mut request = cash_out_request();
        request.as_object_mut().unwrap().remove("destNewBalance");

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(request)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"success": false, "message": "Missing required fields"}));
    }

    #[actix_web::test]
    async fn test_non_numeric_amount_returns_500() {
        let app = service!(engine(0, None));

        let mut request = cash_out_request();
        request["amount"] = json!("abc");

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(request)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("amount"));
        assert!(message.contains("abc"));
        assert!(body.get("data").is_none());
    }

    #[actix_web::test]
    async fn test_inference_failure_returns_500() {
        let app = service!(InferenceEngine::with_classifier(
            Box::new(FailingClassifier),
            training_schema()
        ));

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(cash_out_request())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "inference backend unavailable");
    }

    #[actix_web::test]
    async fn test_malformed_body_returns_400() {
        let app = service!(engine(0, None));

        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_model_details_unaffected_by_predictions() {
        let app = service!(engine(1, Some(vec![0.1, 0.9])));

        let details_req = || test::TestRequest::get().uri("/model-details").to_request();
        let before: Value = test::call_and_read_body_json(&app, details_req()).await;

        for _ in 0..3 {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_json(cash_out_request())
                .to_request();
            test::call_service(&app, req).await;
        }

        let after: Value = test::call_and_read_body_json(&app, details_req()).await;
        assert_eq!(before, after);
        assert_eq!(after["success"], true);
        assert_eq!(after["data"]["algorithm"], "Random Forest");
        assert_eq!(after["data"]["version"], "1.0");
        assert_eq!(after["data"]["metrics"]["roc-auc"], 0.9767033928048733);
        assert_eq!(after["data"]["metrics"]["recall"], 0.9541396103896104);
    }

    #[actix_web::test]
    async fn test_unknown_route_returns_404() {
        let app = service!(engine(0, None));

        let req = test::TestRequest::get().uri("/predict/batch").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
