//! Local API router.
//!
//! Returns a composable `Router` with every endpoint under `/api/`.
//! Layers: request tracing, permissive CORS for the dev frontend, and a body
//! limit sized for a full-resolution phone photo.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Headroom for multipart framing on top of the raw file limit.
const MULTIPART_OVERHEAD_BYTES: usize = 5 * 1024 * 1024;

/// Build the local API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/session", get(endpoints::session::current))
        .route("/retake", post(endpoints::session::retake))
        .route("/camera/start", post(endpoints::camera::start))
        .route("/camera/stop", post(endpoints::camera::stop))
        .route("/camera/capture", post(endpoints::camera::capture))
        .route("/capture/file", post(endpoints::capture::upload))
        .route("/capture/:id", get(endpoints::capture::image))
        .route("/crop/submit", post(endpoints::crop::submit))
        .route("/form/save", post(endpoints::form::save))
        .route("/form/:field", put(endpoints::form::set_field))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
