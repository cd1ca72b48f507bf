//! Camera collaborator contract and the scoped stream guard.
//!
//! A live stream is a device lock. `StreamGuard` owns it for as long as the
//! session is in `CameraActive`; dropping the guard stops every track.
//! Capture, file choice, retake and teardown all release by dropping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use tracing::{debug, info};

use super::DeviceError;

// ═══════════════════════════════════════════════════════════
// Collaborator traits
// ═══════════════════════════════════════════════════════════

/// Grants access to a video device.
pub trait CameraDevice: Send + Sync {
    /// Request a live stream. Suspends until the device grants or denies.
    fn acquire_video_stream(&self) -> Result<Box<dyn VideoStream>, DeviceError>;
}

/// A live video stream bound to the preview.
pub trait VideoStream: Send {
    /// Current frame at the stream's native resolution.
    /// A 0x0 frame means the video is not ready yet.
    fn grab_frame(&mut self) -> Result<RgbImage, DeviceError>;

    /// Stop all tracks and release the device.
    fn stop_all_tracks(&mut self);
}

// ═══════════════════════════════════════════════════════════
// StreamGuard — RAII device ownership
// ═══════════════════════════════════════════════════════════

/// Exclusive owner of a live stream. Dropping it stops all tracks.
pub struct StreamGuard {
    stream: Option<Box<dyn VideoStream>>,
}

impl StreamGuard {
    /// Acquire a stream from the device and wrap it.
    pub fn acquire(device: &dyn CameraDevice) -> Result<Self, DeviceError> {
        let stream = device.acquire_video_stream()?;
        info!("Camera stream acquired");
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub fn grab_frame(&mut self) -> Result<RgbImage, DeviceError> {
        match self.stream.as_mut() {
            Some(stream) => stream.grab_frame(),
            None => Err(DeviceError::Unavailable("stream already released".into())),
        }
    }

    /// Release explicitly. Idempotent; `Drop` calls this too.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            info!("Camera stream released");
        }
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StreamGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGuard")
            .field("live", &self.is_live())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════
// Implementations
// ═══════════════════════════════════════════════════════════

/// Device used when no camera backend is wired in. Every request fails,
/// which leaves the session in `Idle` with the file chooser still usable.
pub struct UnavailableCamera;

impl CameraDevice for UnavailableCamera {
    fn acquire_video_stream(&self) -> Result<Box<dyn VideoStream>, DeviceError> {
        Err(DeviceError::Unavailable("no camera backend configured".into()))
    }
}

/// Observable counters shared between a `MockCamera` and its streams.
#[derive(Debug, Default)]
pub struct MockCameraStats {
    pub acquired: AtomicUsize,
    pub stopped: AtomicUsize,
}

impl MockCameraStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Streams acquired but not yet stopped.
    pub fn live(&self) -> usize {
        self.acquired().saturating_sub(self.stopped())
    }
}

/// Mock camera for testing — serves a fixed frame and counts acquire/stop.
pub struct MockCamera {
    frame: RgbImage,
    deny: Option<DeviceError>,
    stats: Arc<MockCameraStats>,
}

impl MockCamera {
    /// Camera that serves a solid grey frame of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_frame(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    pub fn with_frame(frame: RgbImage) -> Self {
        Self {
            frame,
            deny: None,
            stats: Arc::new(MockCameraStats::default()),
        }
    }

    /// Camera whose acquisition always fails with `error`.
    pub fn failing(error: DeviceError) -> Self {
        Self {
            frame: RgbImage::new(0, 0),
            deny: Some(error),
            stats: Arc::new(MockCameraStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MockCameraStats> {
        Arc::clone(&self.stats)
    }
}

impl CameraDevice for MockCamera {
    fn acquire_video_stream(&self) -> Result<Box<dyn VideoStream>, DeviceError> {
        if let Some(err) = &self.deny {
            return Err(err.clone());
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            frame: self.frame.clone(),
            stats: Arc::clone(&self.stats),
            stopped: false,
        }))
    }
}

struct MockStream {
    frame: RgbImage,
    stats: Arc<MockCameraStats>,
    stopped: bool,
}

impl VideoStream for MockStream {
    fn grab_frame(&mut self) -> Result<RgbImage, DeviceError> {
        if self.stopped {
            return Err(DeviceError::Unavailable("stream stopped".into()));
        }
        Ok(self.frame.clone())
    }

    fn stop_all_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stats.stopped.fetch_add(1, Ordering::SeqCst);
            debug!("Mock stream tracks stopped");
        }
    }
}
