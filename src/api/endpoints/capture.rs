//! File upload and capture display endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::{lock_session, SessionError, SessionSnapshot};

/// `POST /api/capture/file` — multipart upload, field `file`.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut file_data: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {e}")))?;
        file_data = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) =
        file_data.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;

    tracing::debug!(size = bytes.len(), file_name = ?file_name, "Upload received");

    // Decoding a phone photo is CPU-heavy
    let shared = ctx.session.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        let mut session = lock_session(&shared)?;
        session.choose_file(bytes, file_name.as_deref())?;
        Ok::<_, SessionError>(session.snapshot())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("upload task failed: {e}")))??;

    Ok(Json(snapshot))
}

/// `GET /api/capture/:id` — raw bytes of the current capture.
///
/// Only the current capture resolves; ids from before a retake are gone.
pub async fn image(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (mime, bytes) = ctx
        .lock_session()?
        .capture_bytes(id)
        .ok_or_else(|| ApiError::NotFound(format!("Capture {id} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_str()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    )
        .into_response())
}
