//! ScanSession: the capture → crop → extract → review state machine.
//!
//! One session sequences every user action. It owns the camera stream
//! guard, the current capture and the form. All failures leave the session
//! in the state it was in before the action, except a failed submission,
//! which returns to `CropPending` so the same capture can be resubmitted.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::capture::{
    load_file, load_frame, CameraDevice, CaptureError, CaptureInfo, DeviceError, ImageMime,
    LoadedCapture, StreamGuard,
};
use crate::form::{FieldName, FormError, FormFields, FormSnapshot, FormState};
use crate::pipeline::crop::{compute_cropped_artifact, CropError, CropRect, CroppedArtifact, DisplaySize};
use crate::pipeline::extraction::{DocumentMeta, ExtractedFields, ExtractionClient, ExtractionError};
use crate::pipeline::normalize::normalize;

// ═══════════════════════════════════════════════════════════
// States & actions
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    CameraActive,
    CropPending,
    Submitting,
    Populated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CameraActive => "camera_active",
            Self::CropPending => "crop_pending",
            Self::Submitting => "submitting",
            Self::Populated => "populated",
        };
        f.write_str(s)
    }
}

/// State-changing user actions, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    StartCamera,
    StopCamera,
    CaptureFrame,
    ChooseFile,
    SubmitCrop,
    CompleteSubmit,
    Retake,
}

impl std::fmt::Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StartCamera => "start camera",
            Self::StopCamera => "stop camera",
            Self::CaptureFrame => "capture frame",
            Self::ChooseFile => "choose file",
            Self::SubmitCrop => "submit crop",
            Self::CompleteSubmit => "complete submission",
            Self::Retake => "retake",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: SessionState,
        action: SessionAction,
    },

    #[error("A submission is already in progress")]
    Busy,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Session lock poisoned")]
    LockPoisoned,
}

/// Body of a crop submission: the selection plus the rendered size of the
/// image element it was drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRequest {
    pub crop: CropRect,
    pub rendered: DisplaySize,
}

/// Everything the frontend needs to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub camera_live: bool,
    pub capture: Option<CaptureInfo>,
    pub default_crop: CropRect,
    pub form: FormSnapshot,
    pub document: Option<DocumentMeta>,
    pub last_error: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// ScanSession
// ═══════════════════════════════════════════════════════════

pub struct ScanSession {
    state: SessionState,
    camera: Arc<dyn CameraDevice>,
    stream: Option<StreamGuard>,
    capture: Option<LoadedCapture>,
    form: FormState,
    document: Option<DocumentMeta>,
    last_error: Option<String>,
}

impl ScanSession {
    pub fn new(camera: Arc<dyn CameraDevice>) -> Self {
        Self {
            state: SessionState::Idle,
            camera,
            stream: None,
            capture: None,
            form: FormState::new(),
            document: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn capture(&self) -> Option<&LoadedCapture> {
        self.capture.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_camera_live(&self) -> bool {
        self.stream.as_ref().is_some_and(StreamGuard::is_live)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            camera_live: self.is_camera_live(),
            capture: self.capture.as_ref().map(LoadedCapture::info),
            default_crop: CropRect::default_selection(),
            form: self.form.snapshot(),
            document: self.document.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Raw bytes of the current capture, if `id` still names it.
    pub fn capture_bytes(&self, id: Uuid) -> Option<(ImageMime, Vec<u8>)> {
        self.capture
            .as_ref()
            .filter(|c| c.buffer.id == id)
            .map(|c| (c.buffer.mime, c.buffer.bytes.clone()))
    }

    // ── Camera ──────────────────────────────────────────────

    /// Request the camera. On denial the session stays `Idle`.
    pub fn start_camera(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionAction::StartCamera, &[SessionState::Idle])?;

        let guard = StreamGuard::acquire(self.camera.as_ref()).map_err(|e| self.fail(e))?;
        self.stream = Some(guard);
        self.state = SessionState::CameraActive;
        self.last_error = None;
        Ok(())
    }

    pub fn stop_camera(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionAction::StopCamera, &[SessionState::CameraActive])?;
        self.release_stream();
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Snapshot the live frame at native resolution and release the camera.
    pub fn capture_frame(&mut self) -> Result<CaptureInfo, SessionError> {
        self.expect_state(SessionAction::CaptureFrame, &[SessionState::CameraActive])?;

        let frame = match self.stream.as_mut() {
            Some(stream) => stream.grab_frame(),
            None => Err(DeviceError::Unavailable("no live stream".into())),
        };
        let frame = frame.map_err(|e| self.fail(e))?;
        let loaded = load_frame(frame).map_err(|e| self.fail(flatten_capture_error(e)))?;

        Ok(self.accept_capture(loaded))
    }

    // ── File ────────────────────────────────────────────────

    /// Accept a chosen file. Releases the camera if it was live.
    pub fn choose_file(
        &mut self,
        bytes: Vec<u8>,
        file_name: Option<&str>,
    ) -> Result<CaptureInfo, SessionError> {
        self.expect_state(
            SessionAction::ChooseFile,
            &[SessionState::Idle, SessionState::CameraActive],
        )?;

        let loaded = load_file(bytes, file_name).map_err(|e| self.fail(e))?;
        Ok(self.accept_capture(loaded))
    }

    // ── Submission ──────────────────────────────────────────

    /// Crop the current capture and enter `Submitting`.
    ///
    /// Crop failures keep the session in `CropPending` and never reach the
    /// network. The returned artifact must be fed back through
    /// `complete_submit`.
    pub fn begin_submit(&mut self, request: &CropRequest) -> Result<CroppedArtifact, SessionError> {
        self.expect_state(SessionAction::SubmitCrop, &[SessionState::CropPending])?;

        let Some(capture) = self.capture.as_ref() else {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: SessionAction::SubmitCrop,
            });
        };
        let capture_id = capture.buffer.id;

        let artifact = match compute_cropped_artifact(&capture.image, request.rendered, &request.crop) {
            Ok(artifact) => artifact,
            Err(e) => return Err(self.fail(e)),
        };

        info!(
            capture_id = %capture_id,
            output = format!("{}x{}", artifact.dimensions().0, artifact.dimensions().1),
            size = artifact.bytes().len(),
            "Submitting crop for extraction"
        );
        self.state = SessionState::Submitting;
        self.last_error = None;
        Ok(artifact)
    }

    /// Apply the extraction outcome.
    ///
    /// Success pre-fills the form and moves to `Populated`. Any failure
    /// returns to `CropPending` with the form untouched.
    pub fn complete_submit(
        &mut self,
        result: Result<ExtractedFields, ExtractionError>,
    ) -> Result<FormSnapshot, SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                action: SessionAction::CompleteSubmit,
            });
        }

        match result {
            Ok(raw) => {
                let fields = normalize(&raw);
                self.form.bulk_prefill(&fields.into_patch());
                self.document = Some(raw.meta);
                self.state = SessionState::Populated;
                self.last_error = None;
                Ok(self.form.snapshot())
            }
            Err(e) => {
                self.state = SessionState::CropPending;
                Err(self.fail(e))
            }
        }
    }

    /// `begin_submit`, one call to `client`, then `complete_submit`.
    pub fn submit_crop(
        &mut self,
        request: &CropRequest,
        client: &dyn ExtractionClient,
    ) -> Result<FormSnapshot, SessionError> {
        let artifact = self.begin_submit(request)?;
        let result = client.submit(artifact);
        self.complete_submit(result)
    }

    // ── Form ────────────────────────────────────────────────

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), SessionError> {
        self.form.set_field_by_name(name, value)?;
        Ok(())
    }

    pub fn set_field_value(&mut self, field: FieldName, value: impl Into<String>) {
        self.form.set_field(field, value);
    }

    /// Save action: returns the canonical record.
    pub fn save(&self) -> FormFields {
        self.form.submit()
    }

    // ── Retake ──────────────────────────────────────────────

    /// Discard the capture, the form and any live stream; back to `Idle`.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Submitting {
            return Err(SessionError::Busy);
        }

        self.release_stream();
        if let Some(capture) = self.capture.take() {
            info!(capture_id = %capture.buffer.id, "Capture discarded");
        }
        self.form.reset();
        self.document = None;
        self.last_error = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────

    fn expect_state(
        &self,
        action: SessionAction,
        allowed: &[SessionState],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        if self.state == SessionState::Submitting {
            return Err(SessionError::Busy);
        }
        Err(SessionError::InvalidTransition {
            from: self.state,
            action,
        })
    }

    fn accept_capture(&mut self, loaded: LoadedCapture) -> CaptureInfo {
        self.release_stream();
        let info = loaded.info();
        self.capture = Some(loaded);
        self.document = None;
        self.last_error = None;
        self.state = SessionState::CropPending;
        info
    }

    fn release_stream(&mut self) {
        // Dropping the guard stops all tracks
        self.stream = None;
    }

    /// Record a user-visible failure and convert it.
    fn fail(&mut self, error: impl Into<SessionError>) -> SessionError {
        let error = error.into();
        warn!(state = %self.state, error = %error, "Session action failed");
        self.last_error = Some(error.to_string());
        error
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("state", &self.state)
            .field("stream", &self.stream)
            .field("capture", &self.capture.as_ref().map(|c| c.buffer.id))
            .finish()
    }
}

fn flatten_capture_error(error: CaptureError) -> SessionError {
    match error {
        CaptureError::Device(e) => SessionError::Device(e),
        other => SessionError::Capture(other),
    }
}

// ═══════════════════════════════════════════════════════════
// SubmissionGuard
// ═══════════════════════════════════════════════════════════

/// Holds an outstanding submission for a shared session.
///
/// The session lock is not held while the OCR request runs. If the guard
/// is dropped without `complete` (task cancelled, panic in the request),
/// the submission is completed as unavailable so `Submitting` never sticks.
pub struct SubmissionGuard {
    session: Arc<Mutex<ScanSession>>,
    completed: bool,
}

impl SubmissionGuard {
    /// Run `begin_submit` under the lock and hand out the artifact.
    pub fn begin(
        session: Arc<Mutex<ScanSession>>,
        request: &CropRequest,
    ) -> Result<(Self, CroppedArtifact), SessionError> {
        let artifact = lock_session(&session)?.begin_submit(request)?;
        Ok((
            Self {
                session,
                completed: false,
            },
            artifact,
        ))
    }

    pub fn complete(
        mut self,
        result: Result<ExtractedFields, ExtractionError>,
    ) -> Result<FormSnapshot, SessionError> {
        self.completed = true;
        let mut session = lock_session(&self.session)?;
        session.complete_submit(result)
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        warn!("Submission dropped before completion");
        if let Ok(mut session) = self.session.lock() {
            let _ = session.complete_submit(Err(ExtractionError::Unavailable(
                "submission aborted".into(),
            )));
        }
    }
}

pub fn lock_session(
    session: &Mutex<ScanSession>,
) -> Result<MutexGuard<'_, ScanSession>, SessionError> {
    session.lock().map_err(|_| SessionError::LockPoisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

    use crate::capture::{CaptureOrigin, MockCamera, MockCameraStats};
    use crate::pipeline::extraction::MockExtractionClient;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 150])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn session_with_camera(camera: MockCamera) -> (ScanSession, Arc<MockCameraStats>) {
        let stats = camera.stats();
        (ScanSession::new(Arc::new(camera)), stats)
    }

    fn cropping_session() -> ScanSession {
        let (mut session, _) = session_with_camera(MockCamera::new(640, 480));
        session.choose_file(png_bytes(400, 300), Some("id.png")).unwrap();
        session
    }

    fn request() -> CropRequest {
        CropRequest {
            crop: CropRect::default_selection(),
            rendered: DisplaySize::new(200.0, 150.0),
        }
    }

    fn passport_fields() -> ExtractedFields {
        [
            ("givenNames", "Ana"),
            ("surname", "Lee"),
            ("dateOfBirth", "13/04/1990"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn camera_start_capture_releases_stream_once() {
        let (mut session, stats) = session_with_camera(MockCamera::new(1280, 720));
        session.start_camera().unwrap();
        assert_eq!(session.state(), SessionState::CameraActive);
        assert_eq!(stats.live(), 1);

        let info = session.capture_frame().unwrap();
        assert_eq!(session.state(), SessionState::CropPending);
        assert_eq!(info.origin, CaptureOrigin::Camera);
        assert_eq!(info.file_name, "capture.png");
        assert_eq!((info.natural_width, info.natural_height), (1280, 720));
        assert_eq!(stats.stopped(), 1);
        assert!(!session.is_camera_live());

        session.retake().unwrap();
        assert_eq!(stats.stopped(), 1);
    }

    #[test]
    fn stop_camera_returns_to_idle() {
        let (mut session, stats) = session_with_camera(MockCamera::new(10, 10));
        session.start_camera().unwrap();
        session.stop_camera().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!((stats.acquired(), stats.stopped()), (1, 1));
    }

    #[test]
    fn choosing_file_while_camera_live_releases_stream() {
        let (mut session, stats) = session_with_camera(MockCamera::new(10, 10));
        session.start_camera().unwrap();
        session.choose_file(png_bytes(20, 20), None).unwrap();
        assert_eq!(session.state(), SessionState::CropPending);
        assert_eq!(stats.stopped(), 1);
    }

    #[test]
    fn retake_while_camera_live_releases_stream() {
        let (mut session, stats) = session_with_camera(MockCamera::new(10, 10));
        session.start_camera().unwrap();
        session.retake().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(stats.stopped(), 1);
    }

    #[test]
    fn dropping_session_releases_stream() {
        let (mut session, stats) = session_with_camera(MockCamera::new(10, 10));
        session.start_camera().unwrap();
        drop(session);
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.stopped(), 1);
    }

    #[test]
    fn denied_camera_stays_idle() {
        let (mut session, stats) = session_with_camera(MockCamera::failing(DeviceError::Denied));
        let err = session.start_camera().unwrap_err();
        assert!(matches!(err, SessionError::Device(DeviceError::Denied)));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(stats.live(), 0);
        assert!(session.last_error().is_some());
        // The file path remains usable
        session.choose_file(png_bytes(8, 8), None).unwrap();
    }

    #[test]
    fn zero_sized_frame_is_not_ready() {
        let (mut session, stats) = session_with_camera(MockCamera::with_frame(RgbImage::new(0, 0)));
        session.start_camera().unwrap();
        let err = session.capture_frame().unwrap_err();
        assert!(matches!(err, SessionError::Device(DeviceError::NotReady)));
        assert_eq!(session.state(), SessionState::CameraActive);
        assert_eq!(stats.live(), 1);
    }

    #[test]
    fn unsupported_file_keeps_state() {
        let (mut session, _) = session_with_camera(MockCamera::new(10, 10));
        let mut gif = b"GIF89a".to_vec();
        gif.resize(200, 0);
        let err = session.choose_file(gif, Some("a.gif")).unwrap_err();
        assert!(matches!(err, SessionError::Capture(CaptureError::UnsupportedFormat(_))));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let (mut session, _) = session_with_camera(MockCamera::new(10, 10));
        assert!(matches!(
            session.capture_frame(),
            Err(SessionError::InvalidTransition {
                from: SessionState::Idle,
                action: SessionAction::CaptureFrame
            })
        ));
        assert!(matches!(session.stop_camera(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(
            session.begin_submit(&request()),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.complete_submit(Ok(ExtractedFields::new())),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn successful_submission_populates_form() {
        let mut session = cropping_session();
        let client = MockExtractionClient::succeeding(passport_fields());

        let form = session.submit_crop(&request(), &client).unwrap();

        assert_eq!(session.state(), SessionState::Populated);
        assert_eq!(client.calls(), 1);
        // 50% of 200x150 display over a 400x300 image
        assert_eq!(client.last_artifact().unwrap().dimensions(), (200, 150));
        assert_eq!(form.values.first_name, "Ana");
        assert_eq!(form.values.last_name, "Lee");
        assert_eq!(form.values.dob, "1990-04-13");
        assert_eq!(
            session.form().missing_fields(),
            vec![
                FieldName::Sex,
                FieldName::Address,
                FieldName::Nationality,
                FieldName::PassportNumber,
                FieldName::LicenseNumber,
            ]
        );
    }

    #[test]
    fn recognition_failure_returns_to_crop_and_leaves_form() {
        let mut session = cropping_session();
        session.set_field("address", "1 Main St").unwrap();
        let before = session.form().snapshot();

        let client = MockExtractionClient::failing(ExtractionError::RecognitionFailed);
        let err = session.submit_crop(&request(), &client).unwrap_err();

        assert!(matches!(err, SessionError::Extraction(ExtractionError::RecognitionFailed)));
        assert_eq!(session.state(), SessionState::CropPending);
        assert_eq!(session.form().snapshot(), before);
        assert!(session.last_error().is_some());
    }

    #[test]
    fn retry_after_unavailable_succeeds_without_recapture() {
        let mut session = cropping_session();
        let capture_id = session.capture().unwrap().buffer.id;

        let down = MockExtractionClient::failing(ExtractionError::Unavailable("refused".into()));
        assert!(session.submit_crop(&request(), &down).is_err());
        assert_eq!(session.state(), SessionState::CropPending);

        let up = MockExtractionClient::succeeding(passport_fields());
        session.submit_crop(&request(), &up).unwrap();
        assert_eq!(session.state(), SessionState::Populated);
        assert_eq!(session.capture().unwrap().buffer.id, capture_id);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn invalid_crop_makes_no_network_call() {
        let mut session = cropping_session();
        let client = MockExtractionClient::succeeding(passport_fields());
        let bad = CropRequest {
            crop: CropRect::pixels(10.0, 10.0, 0.0, 50.0),
            rendered: DisplaySize::new(200.0, 150.0),
        };

        let err = session.submit_crop(&bad, &client).unwrap_err();
        assert!(matches!(err, SessionError::Crop(CropError::InvalidCrop(_))));
        assert_eq!(client.calls(), 0);
        assert_eq!(session.state(), SessionState::CropPending);
    }

    #[test]
    fn second_submission_while_outstanding_is_busy() {
        let mut session = cropping_session();
        let _artifact = session.begin_submit(&request()).unwrap();
        assert!(matches!(session.begin_submit(&request()), Err(SessionError::Busy)));
        assert!(matches!(session.retake(), Err(SessionError::Busy)));
        assert!(matches!(session.choose_file(png_bytes(8, 8), None), Err(SessionError::Busy)));
        // Edits stay available
        session.set_field("sex", "M").unwrap();
    }

    #[test]
    fn retake_resets_everything() {
        let mut session = cropping_session();
        let client = MockExtractionClient::succeeding(passport_fields());
        session.submit_crop(&request(), &client).unwrap();
        let id = session.capture().unwrap().buffer.id;

        session.retake().unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.capture().is_none());
        assert!(session.capture_bytes(id).is_none());
        assert_eq!(session.form().values(), &FormFields::default());
        assert!(session.form().missing_fields().is_empty());
        assert!(session.snapshot().document.is_none());
    }

    #[test]
    fn capture_bytes_only_for_current_id() {
        let session = cropping_session();
        let id = session.capture().unwrap().buffer.id;
        let (mime, bytes) = session.capture_bytes(id).unwrap();
        assert_eq!(mime, ImageMime::Png);
        assert!(!bytes.is_empty());
        assert!(session.capture_bytes(Uuid::new_v4()).is_none());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut session = cropping_session();
        assert!(matches!(
            session.set_field("middleName", "x"),
            Err(SessionError::Form(FormError::UnknownField(_)))
        ));
    }

    #[test]
    fn dropped_guard_clears_submitting() {
        let session = Arc::new(Mutex::new(cropping_session()));
        let (guard, _artifact) = SubmissionGuard::begin(session.clone(), &request()).unwrap();
        assert_eq!(lock_session(&session).unwrap().state(), SessionState::Submitting);

        drop(guard);

        let session = lock_session(&session).unwrap();
        assert_eq!(session.state(), SessionState::CropPending);
        assert!(session.last_error().unwrap().contains("submission aborted"));
    }

    #[test]
    fn far_off_crop_leaves_shared_session_usable() {
        let session = Arc::new(Mutex::new(cropping_session()));
        let far = CropRequest {
            crop: CropRect::pixels(1e19, 1e19, 10.0, 10.0),
            rendered: DisplaySize::new(200.0, 150.0),
        };

        let Err(err) = SubmissionGuard::begin(session.clone(), &far) else {
            panic!("far-off selection should be rejected");
        };
        assert!(matches!(err, SessionError::Crop(CropError::InvalidCrop(_))));

        let mut locked = lock_session(&session).unwrap();
        assert_eq!(locked.state(), SessionState::CropPending);
        assert!(locked.begin_submit(&request()).is_ok());
    }

    #[test]
    fn completed_guard_applies_result() {
        let session = Arc::new(Mutex::new(cropping_session()));
        let (guard, _artifact) = SubmissionGuard::begin(session.clone(), &request()).unwrap();
        let form = guard.complete(Ok(passport_fields())).unwrap();
        assert_eq!(form.values.first_name, "Ana");
        assert_eq!(lock_session(&session).unwrap().state(), SessionState::Populated);
    }

    #[test]
    fn snapshot_serializes_state() {
        let session = cropping_session();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["state"], "crop_pending");
        assert_eq!(json["default_crop"]["unit"], "%");
        assert_eq!(json["capture"]["natural_width"], 400);
    }
}
