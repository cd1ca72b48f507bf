use serde::Serialize;

use super::CaptureError;

/// Maximum image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
pub const MIN_IMAGE_BYTES: usize = 67;

/// Image encodings the file chooser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl std::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the image encoding from magic bytes (NOT file names).
pub fn detect_image_mime(bytes: &[u8]) -> Result<ImageMime, CaptureError> {
    match bytes {
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageMime::Jpeg),
        // PNG: starts with 89 50 4E 47 0D 0A 1A 0A
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Ok(ImageMime::Png),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            Err(CaptureError::UnsupportedFormat("image/tiff".into()))
        }
        [0x25, 0x50, 0x44, 0x46, ..] => {
            Err(CaptureError::UnsupportedFormat("application/pdf".into()))
        }
        _ if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => {
            Err(CaptureError::UnsupportedFormat("image/heic".into()))
        }
        _ => Err(CaptureError::UnsupportedFormat(
            "application/octet-stream".into(),
        )),
    }
}

/// Validate image bytes before decoding.
/// Returns early error for clearly invalid input.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), CaptureError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(CaptureError::TooSmall(bytes.len()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(CaptureError::TooLarge {
            size: bytes.len(),
            limit_mb: MAX_IMAGE_BYTES / (1024 * 1024),
        });
    }
    Ok(())
}
