pub mod config;
pub mod error;
pub mod routes;
pub mod telemetry;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use rectotal_ocr::{OcrBackend, OcrError, ReceiptPipeline, StagingArea};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;

pub type SharedPipeline = Arc<ReceiptPipeline<Box<dyn OcrBackend>>>;

/// Per-process state handed to every request. Nothing in here is mutated
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: SharedPipeline,
    pub staging: StagingArea,
    pub recognition_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        pipeline: SharedPipeline,
        staging: StagingArea,
        recognition_timeout: Option<Duration>,
    ) -> Self {
        Self { pipeline, staging, recognition_timeout }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, OcrError> {
        Ok(Self::new(
            Arc::new(config.build_pipeline()?),
            config.staging_area(),
            config.recognition_timeout(),
        ))
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/extract_receipt_data", post(routes::extract_receipt_data))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
