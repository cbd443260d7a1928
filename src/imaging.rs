//! Image operations — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe dimensions** | `image::image_dimensions` (header read, no full decode) |
//! | **Decode** (JPEG, PNG, GIF, WebP) | `image` crate |
//! | **Resize** | `image::DynamicImage::resize` with `Lanczos3` |
//! | **Encode → WebP** | `webp::Encoder` (lossy, libwebp) |
//!
//! The dimension math ([`scaled_dimensions`]) is a pure function kept separate
//! from the pixel work so it can be unit tested without touching any images.

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    ProcessingFailed(String),
}

/// Raster formats the optimizer decodes and re-encodes.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Vector formats copied verbatim — already resolution independent.
const VECTOR_EXTENSIONS: &[&str] = &["svg"];

/// Quality setting for lossy WebP encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// True for files the optimizer decodes and re-encodes as WebP.
pub fn is_raster(path: &Path) -> bool {
    RASTER_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// True for files the optimizer copies verbatim.
pub fn is_vector(path: &Path) -> bool {
    VECTOR_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// True for any file the optimizer considers an image at all.
pub fn is_image(path: &Path) -> bool {
    is_raster(path) || is_vector(path)
}

/// Read an image's intrinsic pixel dimensions from its header.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), ImagingError> {
    image::image_dimensions(path)
        .map_err(|e| ImagingError::ProcessingFailed(format!("Failed to read dimensions: {e}")))
}

/// Calculate output dimensions for the width cap.
///
/// Downscales to `max_width` preserving aspect ratio; never upscales.
/// Returns `None` when the source already fits within the cap.
///
/// # Examples
/// ```
/// # use vellum::imaging::scaled_dimensions;
/// // 3200x2400 capped at 1600 → half size
/// assert_eq!(scaled_dimensions((3200, 2400), 1600), Some((1600, 1200)));
///
/// // 800x600 is narrower than the cap — left alone
/// assert_eq!(scaled_dimensions((800, 600), 1600), None);
/// ```
pub fn scaled_dimensions(original: (u32, u32), max_width: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    if orig_w <= max_width {
        return None;
    }
    let ratio = max_width as f64 / orig_w as f64;
    Some((max_width, (orig_h as f64 * ratio).round().max(1.0) as u32))
}

/// Load and decode an image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage, ImagingError> {
    ImageReader::open(path)
        .map_err(ImagingError::Io)?
        .decode()
        .map_err(|e| {
            ImagingError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Downscale to the width cap if needed, then encode as lossy WebP.
///
/// Returns the encoded bytes plus the output pixel dimensions.
pub fn encode_webp(
    img: &DynamicImage,
    max_width: u32,
    quality: Quality,
) -> Result<(Vec<u8>, (u32, u32)), ImagingError> {
    let resized;
    let img = match scaled_dimensions((img.width(), img.height()), max_width) {
        Some((w, h)) => {
            resized = img.resize(w, h, FilterType::Lanczos3);
            &resized
        }
        None => img,
    };

    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, img.width(), img.height());
    let encoded = encoder.encode(quality.value() as f32);
    Ok((encoded.to_vec(), (img.width(), img.height())))
}
