//! Image acquisition: camera frames and chosen files become a `CaptureBuffer`.
//!
//! The buffer is the only owner of the raw bytes between acquisition and
//! cropping. The display URL is derived from a per-capture id, so a retake
//! (new id, or none) makes the previous URL stop resolving.

pub mod camera;
pub mod format;
pub mod source;

pub use camera::*;
pub use format::*;
pub use source::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Camera collaborator failures. The session stays pre-capture on all of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Camera access denied")]
    Denied,

    #[error("Video not ready: frame has no dimensions yet")]
    NotReady,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unsupported image format: {0} (only JPEG and PNG are accepted)")]
    UnsupportedFormat(String),

    #[error("Image data too small to be valid ({0} bytes)")]
    TooSmall(usize),

    #[error("Image data exceeds {limit_mb}MB limit ({size} bytes)")]
    TooLarge { size: usize, limit_mb: usize },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode camera frame: {0}")]
    FrameEncoding(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

// ═══════════════════════════════════════════════════════════
// CaptureBuffer
// ═══════════════════════════════════════════════════════════

/// Where a capture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOrigin {
    Camera,
    File,
}

/// Raw image bytes as acquired, plus what the frontend needs to show them.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    pub id: Uuid,
    pub origin: CaptureOrigin,
    pub file_name: String,
    pub mime: ImageMime,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CaptureBuffer {
    pub fn new(origin: CaptureOrigin, file_name: String, mime: ImageMime, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            file_name,
            mime,
            bytes,
            captured_at: Utc::now(),
        }
    }

    /// Display-only reference URL served by the local API.
    pub fn display_url(&self) -> String {
        format!("/api/capture/{}", self.id)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Serializable summary of a capture (no pixel data).
#[derive(Debug, Clone, Serialize)]
pub struct CaptureInfo {
    pub id: Uuid,
    pub origin: CaptureOrigin,
    pub file_name: String,
    pub mime_type: &'static str,
    pub size_bytes: usize,
    pub natural_width: u32,
    pub natural_height: u32,
    pub display_url: String,
    pub captured_at: DateTime<Utc>,
}
