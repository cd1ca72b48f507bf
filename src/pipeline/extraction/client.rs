use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::blocking::multipart::{Form, Part};
use tracing::{info, warn};

use super::types::{interpret_response, ExtractedFields};
use super::ExtractionError;
use crate::config::AppConfig;
use crate::pipeline::crop::CroppedArtifact;

/// Multipart field the OCR service reads the image from.
pub const UPLOAD_FIELD: &str = "file";

/// Submits a cropped artifact to an OCR service.
///
/// Exactly one attempt per call: no retry, no backoff. Callers consume the
/// artifact, so a resubmission always starts from a fresh crop.
pub trait ExtractionClient: Send + Sync {
    fn submit(&self, artifact: CroppedArtifact) -> Result<ExtractedFields, ExtractionError>;
}

// ──────────────────────────────────────────────
// HttpExtractionClient
// ──────────────────────────────────────────────

/// Production client: blocking multipart POST to the detect endpoint.
///
/// The blocking client owns its own runtime; construct it outside async
/// contexts and call it from `spawn_blocking` when inside one.
pub struct HttpExtractionClient {
    endpoint: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpExtractionClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Unavailable(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim().to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractionError> {
        Self::new(&config.ocr_endpoint, config.request_timeout_secs)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ExtractionClient for HttpExtractionClient {
    fn submit(&self, artifact: CroppedArtifact) -> Result<ExtractedFields, ExtractionError> {
        let (width, height) = artifact.dimensions();
        let _span = tracing::info_span!(
            "ocr_submit",
            endpoint = %self.endpoint,
            image = format!("{width}x{height}"),
            size = artifact.bytes().len(),
        )
        .entered();
        let start = Instant::now();

        let file_name = artifact.file_name();
        let mime = artifact.mime_type();
        let part = Part::bytes(artifact.into_bytes())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ExtractionError::Unavailable(format!("invalid part MIME: {e}")))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| {
                let reason = if e.is_connect() {
                    format!("cannot connect to {}", self.endpoint)
                } else if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout_secs)
                } else {
                    e.to_string()
                };
                warn!(%reason, "OCR request failed");
                ExtractionError::Unavailable(reason)
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ExtractionError::Unavailable(format!("failed to read body: {e}")))?;

        let result = interpret_response(status, &body);
        match &result {
            Ok(fields) => info!(
                status,
                elapsed_ms = %start.elapsed().as_millis(),
                fields = fields.len(),
                detected_type = ?fields.meta.detected_type,
                warning = ?fields.meta.warning,
                "OCR extraction complete"
            ),
            Err(e) => warn!(
                status,
                elapsed_ms = %start.elapsed().as_millis(),
                error = %e,
                "OCR extraction failed"
            ),
        }
        result
    }
}

// ──────────────────────────────────────────────
// MockExtractionClient
// ──────────────────────────────────────────────

/// Mock client for testing — returns a configured result and records calls.
pub struct MockExtractionClient {
    result: Result<ExtractedFields, ExtractionError>,
    calls: AtomicUsize,
    last_artifact: Mutex<Option<CroppedArtifact>>,
}

impl MockExtractionClient {
    pub fn succeeding(fields: ExtractedFields) -> Self {
        Self::with_result(Ok(fields))
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<ExtractedFields, ExtractionError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
            last_artifact: Mutex::new(None),
        }
    }

    /// Number of submissions (network attempts) made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_artifact(&self) -> Option<CroppedArtifact> {
        self.last_artifact.lock().ok()?.clone()
    }
}

impl ExtractionClient for MockExtractionClient {
    fn submit(&self, artifact: CroppedArtifact) -> Result<ExtractedFields, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_artifact.lock() {
            *last = Some(artifact);
        }
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::{json, Value};

    use crate::pipeline::crop::{compute_cropped_artifact, CropRect, DisplaySize};

    fn artifact() -> CroppedArtifact {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 40, Rgb([200, 200, 200])));
        compute_cropped_artifact(
            &img,
            DisplaySize::new(80.0, 40.0),
            &CropRect::pixels(0.0, 0.0, 40.0, 20.0),
        )
        .unwrap()
    }

    /// Echo what the upload looked like so the test can check the multipart shape.
    async fn inspect_upload(mut multipart: Multipart) -> Json<Value> {
        let mut parts = Vec::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let bytes = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            parts.push(json!([name, file_name, content_type, bytes]));
        }
        Json(json!({
            "success": true,
            "detected_type": "driving_license",
            "parsed": {"firstName": "Ana", "parts": parts.len().to_string(),
                       "upload": parts.first().cloned().unwrap_or(Value::Null).to_string()}
        }))
    }

    /// Run an axum app on an ephemeral port in a background thread.
    fn spawn_server(app: Router) -> SocketAddr {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        rx.recv().unwrap()
    }

    #[test]
    fn posts_single_multipart_file_field() {
        let addr = spawn_server(Router::new().route("/detect", post(inspect_upload)));
        let client = HttpExtractionClient::new(&format!("http://{addr}/detect"), 10).unwrap();

        let art = artifact();
        let size = art.bytes().len();
        let fields = client.submit(art).unwrap();

        assert_eq!(fields.get("firstName"), Some("Ana"));
        assert_eq!(fields.get("parts"), Some("1"));
        let upload: Value = serde_json::from_str(fields.get("upload").unwrap()).unwrap();
        assert_eq!(upload, json!(["file", "cropped.jpg", "image/jpeg", size]));
        assert_eq!(
            fields.meta.detected_type,
            Some(crate::pipeline::extraction::DocumentKind::DrivingLicense)
        );
    }

    #[test]
    fn success_false_maps_to_recognition_failed() {
        let app = Router::new().route(
            "/detect",
            post(|| async { Json(json!({"success": false})) }),
        );
        let addr = spawn_server(app);
        let client = HttpExtractionClient::new(&format!("http://{addr}/detect"), 10).unwrap();
        assert_eq!(
            client.submit(artifact()).unwrap_err(),
            ExtractionError::RecognitionFailed
        );
    }

    #[test]
    fn http_500_maps_to_unavailable() {
        let app = Router::new().route(
            "/detect",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "model crashed"})),
                )
            }),
        );
        let addr = spawn_server(app);
        let client = HttpExtractionClient::new(&format!("http://{addr}/detect"), 10).unwrap();
        assert!(matches!(
            client.submit(artifact()),
            Err(ExtractionError::Unavailable(_))
        ));
    }

    #[test]
    fn connection_refused_maps_to_unavailable() {
        // Bind then drop to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = HttpExtractionClient::new(&format!("http://127.0.0.1:{port}/detect"), 5).unwrap();
        assert!(matches!(
            client.submit(artifact()),
            Err(ExtractionError::Unavailable(_))
        ));
    }

    #[test]
    fn client_from_config_uses_endpoint() {
        let config = AppConfig::default();
        let client = HttpExtractionClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:8000/detect");
    }

    #[test]
    fn mock_records_calls_and_artifact() {
        let mock = MockExtractionClient::failing(ExtractionError::RecognitionFailed);
        assert!(mock.submit(artifact()).is_err());
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.last_artifact().unwrap().dimensions(), (40, 20));
    }
}
