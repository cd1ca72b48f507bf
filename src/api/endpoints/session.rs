use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::SessionSnapshot;

/// `GET /api/session` — current step, capture, form and last error.
pub async fn current(State(ctx): State<ApiContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = ctx.lock_session()?;
    Ok(Json(session.snapshot()))
}

/// `POST /api/retake` — discard capture and form, back to idle.
pub async fn retake(State(ctx): State<ApiContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut session = ctx.lock_session()?;
    session.retake()?;
    Ok(Json(session.snapshot()))
}
