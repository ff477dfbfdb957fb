//! Fraud Classifier Service - Main Entry Point
//!
//! Loads the trained fraud model once, then serves `/predict` and
//! `/model-details` over HTTP.

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use fraud_classifier_service::{
    api,
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::inference::InferenceEngine,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;

    info!("Starting Fraud Classifier Service");
    info!(
        model_path = %config.model.path.display(),
        feature_info = ?config.model.feature_info_path,
        "Configuration loaded successfully"
    );

    // A model that cannot be loaded means no service
    let engine = InferenceEngine::new(&config.model).context("Failed to load fraud model")?;
    info!(
        model = %engine.model_name(),
        features = engine.schema().len(),
        feature_names = ?engine.schema().names(),
        probabilities = engine.supports_proba(),
        "Model ready"
    );

    let engine = web::Data::new(engine);
    let details = web::Data::new(config.details.clone());
    let metrics = Arc::new(ServiceMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "HTTP server listening");
    info!("   POST /predict        - Score a transaction");
    info!("   GET  /model-details  - Model metadata");

    let metrics_data = web::Data::from(metrics.clone());
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(engine.clone())
            .app_data(details.clone())
            .app_data(metrics_data.clone())
            .configure(api::routes)
    });

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Install the tracing subscriber. RUST_LOG takes precedence over the
/// configured level.
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level '{}'", config.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }

    Ok(())
}
