//! ImageSource: turns a camera frame or a chosen file into a decoded capture.
//!
//! Camera frames are encoded losslessly as `capture.png`. Chosen files keep
//! their original bytes; they are decoded with EXIF orientation applied so
//! the natural size matches what a browser displays for phone photos.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use tracing::{debug, info};

use super::format::{detect_image_mime, validate_image_bytes, ImageMime};
use super::{CaptureBuffer, CaptureError, CaptureInfo, CaptureOrigin, DeviceError};

/// File name given to camera captures.
pub const CAMERA_FILE_NAME: &str = "capture.png";

/// A capture together with its decoded raster.
#[derive(Debug, Clone)]
pub struct LoadedCapture {
    pub buffer: CaptureBuffer,
    pub image: DynamicImage,
}

impl LoadedCapture {
    /// Natural (full) resolution of the decoded image.
    pub fn natural_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn info(&self) -> CaptureInfo {
        let (natural_width, natural_height) = self.natural_size();
        CaptureInfo {
            id: self.buffer.id,
            origin: self.buffer.origin,
            file_name: self.buffer.file_name.clone(),
            mime_type: self.buffer.mime.as_str(),
            size_bytes: self.buffer.len(),
            natural_width,
            natural_height,
            display_url: self.buffer.display_url(),
            captured_at: self.buffer.captured_at,
        }
    }
}

/// Accept a user-chosen file. Only JPEG and PNG are accepted, detected from
/// the bytes themselves.
pub fn load_file(bytes: Vec<u8>, file_name: Option<&str>) -> Result<LoadedCapture, CaptureError> {
    validate_image_bytes(&bytes)?;
    let mime = detect_image_mime(&bytes)?;
    let image = decode_oriented(&bytes)?;

    let name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(match mime {
            ImageMime::Jpeg => "upload.jpg",
            ImageMime::Png => "upload.png",
        })
        .to_string();

    let buffer = CaptureBuffer::new(CaptureOrigin::File, name, mime, bytes);
    info!(
        capture_id = %buffer.id,
        mime = %mime,
        size = buffer.len(),
        natural = format!("{}x{}", image.width(), image.height()),
        "File capture loaded"
    );
    Ok(LoadedCapture { buffer, image })
}

/// Snapshot a camera frame at its native resolution.
pub fn load_frame(frame: RgbImage) -> Result<LoadedCapture, CaptureError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DeviceError::NotReady.into());
    }

    let image = DynamicImage::ImageRgb8(frame);
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| CaptureError::FrameEncoding(e.to_string()))?;

    let buffer = CaptureBuffer::new(
        CaptureOrigin::Camera,
        CAMERA_FILE_NAME.to_string(),
        ImageMime::Png,
        cursor.into_inner(),
    );
    info!(
        capture_id = %buffer.id,
        size = buffer.len(),
        natural = format!("{}x{}", image.width(), image.height()),
        "Camera frame captured"
    );
    Ok(LoadedCapture { buffer, image })
}

/// Decode bytes, then turn the raster upright if the file carries an EXIF
/// orientation other than "as stored".
pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, CaptureError> {
    let image = image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
    match Orientation::from_exif(bytes) {
        Some(orientation) => {
            debug!(?orientation, "Uprighting capture from EXIF");
            Ok(orientation.apply(image))
        }
        None => Ok(image),
    }
}

/// How a stored raster must be transformed to display upright.
///
/// Only the seven non-identity values of the EXIF Orientation tag are
/// represented; "as stored" and unknown values mean no transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Mirror,
    Rotate180,
    MirrorVertical,
    MirrorRotate90,
    Rotate90,
    MirrorRotate270,
    Rotate270,
}

impl Orientation {
    pub fn from_tag(value: u32) -> Option<Self> {
        Some(match value {
            2 => Self::Mirror,
            3 => Self::Rotate180,
            4 => Self::MirrorVertical,
            5 => Self::MirrorRotate90,
            6 => Self::Rotate90,
            7 => Self::MirrorRotate270,
            8 => Self::Rotate270,
            _ => return None,
        })
    }

    /// Orientation from the primary IFD of an embedded EXIF block.
    pub fn from_exif(bytes: &[u8]) -> Option<Self> {
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .ok()?;
        let value = exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
            .value
            .get_uint(0)?;
        Self::from_tag(value)
    }

    /// Rotations are clockwise; mirroring happens after the rotation.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Mirror => image.fliph(),
            Self::Rotate180 => image.rotate180(),
            Self::MirrorVertical => image.flipv(),
            Self::MirrorRotate90 => image.rotate90().fliph(),
            Self::Rotate90 => image.rotate90(),
            Self::MirrorRotate270 => image.rotate270().fliph(),
            Self::Rotate270 => image.rotate270(),
        }
    }
}
