use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rectotal_ocr::PipelineError;
use serde_json::json;
use thiserror::Error;

/// Everything the receipt endpoint can answer with other than a total.
/// The display string is the `error` field of the JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file provided!")]
    NoFile,
    #[error("No selected file!")]
    NoSelectedFile,
    #[error("Unable to read the image file!")]
    UnreadableImage,
    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),
    #[error("Receipt processing timed out!")]
    Timeout,
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile | ApiError::NoSelectedFile | ApiError::UnreadableImage => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Multipart(e) => e.status(),
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        if e.is_unreadable_image() {
            ApiError::UnreadableImage
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => tracing::error!(%detail, "request failed"),
            other => tracing::warn!(status = status.as_u16(), error = %other, "request rejected"),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectotal_ocr::{OcrError, StagingError};

    #[test]
    fn input_errors_are_bad_requests() {
        for e in [ApiError::NoFile, ApiError::NoSelectedFile, ApiError::UnreadableImage] {
            assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(ApiError::NoFile.to_string(), "No file provided!");
        assert_eq!(ApiError::NoSelectedFile.to_string(), "No selected file!");
        assert_eq!(ApiError::UnreadableImage.to_string(), "Unable to read the image file!");
    }

    #[test]
    fn ocr_failure_maps_to_unreadable_image() {
        let e: ApiError = PipelineError::Ocr(OcrError::Engine("boom".into())).into();
        assert!(matches!(e, ApiError::UnreadableImage));
    }

    #[test]
    fn staging_failure_maps_to_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e: ApiError = PipelineError::Staging(StagingError::Io(io)).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "Internal server error");
    }
}
