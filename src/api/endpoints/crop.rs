use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::{CropRequest, SessionSnapshot, SubmissionGuard};

/// `POST /api/crop/submit` — crop, send to OCR, pre-fill the form.
///
/// The whole submission runs on the blocking pool: cropping is CPU work and
/// the OCR client is blocking. The session lock is only taken to begin and
/// to complete; the guard completes the submission even if the request
/// panics.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Json(request): Json<CropRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = ctx.session.clone();
    let extractor = ctx.extractor.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let (guard, artifact) = SubmissionGuard::begin(shared, &request)?;
        let result = extractor.submit(artifact);
        guard.complete(result)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("submission task failed: {e}")))?;

    outcome?;
    let snapshot = ctx.lock_session()?.snapshot();
    Ok(Json(snapshot))
}
