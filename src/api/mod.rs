//! Local JSON API driving a single `ScanSession`.
//!
//! The frontend renders whatever `GET /api/session` reports and posts user
//! actions to the mutation endpoints. Routes are nested under `/api/`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerError};
pub use types::ApiContext;
