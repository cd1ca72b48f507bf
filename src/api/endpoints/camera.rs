//! Camera endpoints. Device access may block while the user answers a
//! permission prompt, so the calls run on the blocking pool.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::session::{lock_session, ScanSession, SessionError, SessionSnapshot};

/// `POST /api/camera/start`
pub async fn start(State(ctx): State<ApiContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    run_on_session(ctx, |session| session.start_camera()).await
}

/// `POST /api/camera/stop`
pub async fn stop(State(ctx): State<ApiContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    run_on_session(ctx, |session| session.stop_camera()).await
}

/// `POST /api/camera/capture` — snapshot the live frame.
pub async fn capture(State(ctx): State<ApiContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    run_on_session(ctx, |session| session.capture_frame().map(|_| ())).await
}

async fn run_on_session<F>(ctx: ApiContext, action: F) -> Result<Json<SessionSnapshot>, ApiError>
where
    F: FnOnce(&mut ScanSession) -> Result<(), SessionError> + Send + 'static,
{
    let shared = ctx.session.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        let mut session = lock_session(&shared)?;
        action(&mut session)?;
        Ok::<_, SessionError>(session.snapshot())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("camera task failed: {e}")))??;

    Ok(Json(snapshot))
}
