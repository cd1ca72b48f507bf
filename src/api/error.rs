//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::capture::CaptureError;
use crate::form::FormError;
use crate::pipeline::crop::CropError;
use crate::pipeline::extraction::ExtractionError;
use crate::session::SessionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Camera unavailable: {0}")]
    Device(String),
    #[error("Invalid crop: {0}")]
    InvalidCrop(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Crop encoding failed: {0}")]
    Encoding(String),
    #[error("OCR service unavailable: {0}")]
    OcrUnavailable(String),
    #[error("Document not recognized")]
    RecognitionFailed,
    #[error("Submission in progress")]
    Busy,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Device(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CAMERA_UNAVAILABLE",
                detail.clone(),
            ),
            ApiError::InvalidCrop(detail) => {
                (StatusCode::BAD_REQUEST, "INVALID_CROP", detail.clone())
            }
            ApiError::UnsupportedFormat(detail) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FORMAT",
                detail.clone(),
            ),
            ApiError::UnknownField(name) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_FIELD",
                format!("Unknown form field '{name}'"),
            ),
            ApiError::Encoding(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CROP_ENCODING",
                detail.clone(),
            ),
            ApiError::OcrUnavailable(detail) => (
                StatusCode::BAD_GATEWAY,
                "OCR_UNAVAILABLE",
                format!("OCR service unavailable: {detail}"),
            ),
            ApiError::RecognitionFailed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "RECOGNITION_FAILED",
                "The document could not be recognized. Adjust the crop and try again."
                    .to_string(),
            ),
            ApiError::Busy => (
                StatusCode::CONFLICT,
                "BUSY",
                "A submission is already in progress".to_string(),
            ),
            ApiError::InvalidState(detail) => {
                (StatusCode::CONFLICT, "INVALID_STATE", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidTransition { .. } => ApiError::InvalidState(err.to_string()),
            SessionError::Busy => ApiError::Busy,
            SessionError::Device(e) => ApiError::Device(e.to_string()),
            SessionError::Capture(e) => e.into(),
            SessionError::Crop(e) => e.into(),
            SessionError::Extraction(e) => e.into(),
            SessionError::Form(e) => e.into(),
            SessionError::LockPoisoned => ApiError::Internal("session lock poisoned".into()),
        }
    }
}

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Device(e) => ApiError::Device(e.to_string()),
            CaptureError::UnsupportedFormat(_) => ApiError::UnsupportedFormat(err.to_string()),
            CaptureError::TooSmall(_) | CaptureError::TooLarge { .. } | CaptureError::Decode(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CaptureError::FrameEncoding(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<CropError> for ApiError {
    fn from(err: CropError) -> Self {
        match err {
            CropError::InvalidCrop(detail) => ApiError::InvalidCrop(detail),
            CropError::Encoding(detail) => ApiError::Encoding(detail),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Unavailable(detail) => ApiError::OcrUnavailable(detail),
            ExtractionError::RecognitionFailed => ApiError::RecognitionFailed,
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::UnknownField(name) => ApiError::UnknownField(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::capture::DeviceError;
    use crate::session::{SessionAction, SessionState};

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn device_error_returns_503() {
        let response = ApiError::from(SessionError::Device(DeviceError::Denied)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "CAMERA_UNAVAILABLE");
        assert_eq!(json["error"]["message"], "Camera access denied");
    }

    #[tokio::test]
    async fn invalid_crop_returns_400() {
        let err = SessionError::Crop(CropError::InvalidCrop("zero area".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_CROP");
    }

    #[tokio::test]
    async fn encoding_returns_422() {
        let err = SessionError::Crop(CropError::Encoding("empty raster".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unavailable_returns_502() {
        let err = SessionError::Extraction(ExtractionError::Unavailable("refused".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "OCR_UNAVAILABLE");
    }

    #[tokio::test]
    async fn recognition_failed_returns_422() {
        let err = SessionError::Extraction(ExtractionError::RecognitionFailed);
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "RECOGNITION_FAILED");
    }

    #[tokio::test]
    async fn busy_and_invalid_transition_return_409() {
        assert_eq!(
            ApiError::from(SessionError::Busy).into_response().status(),
            StatusCode::CONFLICT
        );
        let err = SessionError::InvalidTransition {
            from: SessionState::Idle,
            action: SessionAction::CaptureFrame,
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "Cannot capture frame while idle"
        );
    }

    #[tokio::test]
    async fn unknown_field_and_format_return_400() {
        let err = SessionError::Form(FormError::UnknownField("middleName".into()));
        assert_eq!(ApiError::from(err).into_response().status(), StatusCode::BAD_REQUEST);
        let err = SessionError::Capture(CaptureError::UnsupportedFormat("image/gif".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::from(SessionError::LockPoisoned).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"]["message"],
            "An internal error occurred"
        );
    }
}
