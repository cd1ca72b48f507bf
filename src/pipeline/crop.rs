//! CropTransform: display-space crop rectangle → full-resolution JPEG.
//!
//! The user drags a selection over a scaled-down preview. OCR accuracy
//! depends on sending the source pixels, so the rectangle is scaled by
//! `natural / rendered` and the matching natural-pixel region is rasterized
//! at 1:1. Canvas semantics apply: parts of the region outside the image are
//! black, and the output is always exactly the scaled region size.

use std::io::Cursor;

use image::{imageops, DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Encoding of every cropped artifact. Accuracy over size: maximum quality.
pub const JPEG_QUALITY: u8 = 100;
pub const ARTIFACT_FILE_NAME: &str = "cropped.jpg";
pub const ARTIFACT_MIME: &str = "image/jpeg";

/// Refuse to allocate rasters beyond this (≈ 100 MP).
const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Largest natural-pixel offset an origin may have on either axis.
const MAX_ORIGIN: f64 = u32::MAX as f64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CropError {
    #[error("Invalid crop selection: {0}")]
    InvalidCrop(String),

    #[error("Crop encoding failed: {0}")]
    Encoding(String),
}

// ═══════════════════════════════════════════════════════════
// Geometry types
// ═══════════════════════════════════════════════════════════

/// Unit of a crop rectangle, relative to the displayed image element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CropUnit {
    #[default]
    #[serde(rename = "px")]
    Pixel,
    #[serde(rename = "%")]
    Percent,
}

/// User selection in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    #[serde(default)]
    pub unit: CropUnit,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn pixels(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            unit: CropUnit::Pixel,
            x,
            y,
            width,
            height,
        }
    }

    pub fn percent(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            unit: CropUnit::Percent,
            x,
            y,
            width,
            height,
        }
    }

    /// Centered half-size selection offered for a fresh capture.
    pub fn default_selection() -> Self {
        Self::percent(25.0, 25.0, 50.0, 50.0)
    }

    /// Express the rectangle in display pixels.
    pub fn to_display_pixels(&self, rendered: DisplaySize) -> Self {
        match self.unit {
            CropUnit::Pixel => *self,
            CropUnit::Percent => Self::pixels(
                self.x * rendered.width / 100.0,
                self.y * rendered.height / 100.0,
                self.width * rendered.width / 100.0,
                self.height * rendered.height / 100.0,
            ),
        }
    }

    /// `width > 0 && height > 0`, with finite coordinates.
    pub fn validate(&self) -> Result<(), CropError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(CropError::InvalidCrop(format!(
                "selection must have positive area, got {}x{}",
                self.width, self.height
            )));
        }
        if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(CropError::InvalidCrop(
                "selection coordinates must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Rendered size of the displayed image element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Region in natural pixel coordinates. The origin may lie outside the
/// image when the selection overhangs an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Encoded crop ready for transmission. Consumed once by the extraction client.
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedArtifact {
    bytes: Vec<u8>,
    region: PixelRegion,
}

impl CroppedArtifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn region(&self) -> PixelRegion {
        self.region
    }

    /// Output raster size (equal to the region size).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.region.width, self.region.height)
    }

    pub fn file_name(&self) -> &'static str {
        ARTIFACT_FILE_NAME
    }

    pub fn mime_type(&self) -> &'static str {
        ARTIFACT_MIME
    }
}

// ═══════════════════════════════════════════════════════════
// Transform
// ═══════════════════════════════════════════════════════════

/// Map a display-space selection onto the natural-resolution image.
///
/// `scale = natural / rendered` per axis; origin and size are both scaled,
/// then rounded to whole pixels.
pub fn natural_region(
    natural: (u32, u32),
    rendered: DisplaySize,
    rect: &CropRect,
) -> Result<PixelRegion, CropError> {
    rect.validate()?;

    let (natural_w, natural_h) = natural;
    if natural_w == 0 || natural_h == 0 {
        return Err(CropError::InvalidCrop("image has no pixels".into()));
    }
    if !(rendered.width > 0.0 && rendered.height > 0.0)
        || !rendered.width.is_finite()
        || !rendered.height.is_finite()
    {
        return Err(CropError::InvalidCrop(format!(
            "displayed size must be positive, got {}x{}",
            rendered.width, rendered.height
        )));
    }

    let px = rect.to_display_pixels(rendered);
    let scale_x = natural_w as f64 / rendered.width;
    let scale_y = natural_h as f64 / rendered.height;

    let width = (px.width * scale_x).round();
    let height = (px.height * scale_y).round();
    if width < 1.0 || height < 1.0 {
        return Err(CropError::Encoding(format!(
            "selection maps to an empty raster ({width}x{height})"
        )));
    }
    if width * height > MAX_OUTPUT_PIXELS as f64 {
        return Err(CropError::Encoding(format!(
            "selection maps to an oversized raster ({width}x{height})"
        )));
    }

    let x = (px.x * scale_x).round();
    let y = (px.y * scale_y).round();
    if !(x.abs() <= MAX_ORIGIN && y.abs() <= MAX_ORIGIN) {
        return Err(CropError::InvalidCrop(format!(
            "selection origin ({x}, {y}) lies outside any addressable image"
        )));
    }

    let region = PixelRegion {
        x: x as i64,
        y: y as i64,
        width: width as u32,
        height: height as u32,
    };

    debug!(
        scale = format!("{scale_x:.3}x{scale_y:.3}"),
        region = format!(
            "{}x{}+{}+{}",
            region.width, region.height, region.x, region.y
        ),
        "Crop mapped to natural pixels"
    );
    Ok(region)
}

/// Crop the selection out of `image` and encode it as a maximum-quality JPEG.
pub fn compute_cropped_artifact(
    image: &DynamicImage,
    rendered: DisplaySize,
    rect: &CropRect,
) -> Result<CroppedArtifact, CropError> {
    let region = natural_region(image.dimensions(), rendered, rect)?;
    let raster = rasterize_region(image, region);
    let bytes = encode_jpeg(&raster)?;

    debug!(
        output = format!("{}x{}", region.width, region.height),
        jpeg_size = bytes.len(),
        "Cropped artifact encoded"
    );
    Ok(CroppedArtifact { bytes, region })
}

/// Copy `region` into a fresh raster of exactly the region size.
/// Pixels outside the source image stay black.
pub fn rasterize_region(image: &DynamicImage, region: PixelRegion) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let mut canvas = RgbImage::new(region.width, region.height);

    let x0 = region.x.max(0);
    let y0 = region.y.max(0);
    let x1 = region.x.saturating_add(region.width as i64).min(src_w as i64);
    let y1 = region.y.saturating_add(region.height as i64).min(src_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return canvas;
    }

    // x0/y0 lie inside the source here, so every offset fits in u32
    let covered = image
        .crop_imm(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
        .to_rgb8();
    imageops::replace(
        &mut canvas,
        &covered,
        (x0 - region.x) as u32,
        (y0 - region.y) as u32,
    );
    canvas
}

/// Encode an RGB raster as JPEG at `JPEG_QUALITY`.
pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, CropError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(CropError::Encoding("empty raster".into()));
    }
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| CropError::Encoding(format!("JPEG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
