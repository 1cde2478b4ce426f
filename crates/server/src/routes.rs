use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use rectotal_ocr::TotalAmount;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the receipt image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub total_amount: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// POST /extract_receipt_data: multipart upload with a `file` field.
///
/// Answers `{"total_amount": "<amount>"}` or `{"total_amount": "Not Found"}`
/// with 200; input problems come back as `{"error": ...}` with 400.
#[tracing::instrument(name = "extract_receipt_data", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn extract_receipt_data(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TotalResponse>, ApiError> {
    // A body that is not multipart at all carries no file.
    let mut multipart = multipart.map_err(|_| ApiError::NoFile)?;
    let upload = read_file_field(&mut multipart).await?;
    tracing::debug!(file_name = %upload.file_name, bytes = upload.data.len(), "upload received");

    let pipeline = state.pipeline.clone();
    let staging = state.staging.clone();
    let task = tokio::task::spawn_blocking(move || {
        pipeline.process_upload(&staging, &upload.data, Some(&upload.file_name))
    });

    // On timeout the blocking task runs to completion on its own and still
    // removes its staged file.
    let joined = match state.recognition_timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| ApiError::Timeout)?,
        None => task.await,
    };
    let output = joined.map_err(|e| ApiError::Internal(e.to_string()))??;

    let amount = output.result.amount();
    tracing::info!(
        found = output.result.is_found(),
        total_amount = %output.result,
        currency = ?amount.and_then(TotalAmount::currency_symbol),
        value = ?amount.and_then(TotalAmount::value),
        "receipt processed"
    );
    Ok(Json(TotalResponse { total_amount: output.result.to_string() }))
}

/// First `file` field that is an actual file part (has a filename).
async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(ApiError::NoSelectedFile);
        }
        let data = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, data });
    }
    Err(ApiError::NoFile)
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}
