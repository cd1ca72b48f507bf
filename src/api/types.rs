use std::sync::{Arc, Mutex, MutexGuard};

use crate::capture::CameraDevice;
use crate::config::AppConfig;
use crate::pipeline::extraction::ExtractionClient;
use crate::session::{lock_session, ScanSession, SessionError};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub session: Arc<Mutex<ScanSession>>,
    pub extractor: Arc<dyn ExtractionClient>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        extractor: Arc<dyn ExtractionClient>,
        config: AppConfig,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ScanSession::new(camera))),
            extractor,
            config: Arc::new(config),
        }
    }

    /// Lock the session. Never hold the guard across an `.await`.
    pub fn lock_session(&self) -> Result<MutexGuard<'_, ScanSession>, SessionError> {
        lock_session(&self.session)
    }
}
