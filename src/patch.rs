//! Patch extraction and high-quality rescaling.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Copy the pixels inside `rect` out of `source` verbatim.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if `rect` is not within the source bounds.
pub fn extract(source: &RgbaImage, rect: Rect) -> Result<RgbaImage> {
    rect.ensure_within(source.width(), source.height())?;
    Ok(imageops::crop_imm(source, rect.left, rect.top, rect.width(), rect.height()).to_image())
}

/// Resample `patch` to exactly `width` x `height` with a Lanczos3 kernel.
///
/// When the size already matches the patch is returned untouched, so no
/// blur is introduced.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if either target dimension is zero.
pub fn scale(patch: RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(Error::Geometry(format!(
            "target size must be positive, got {width}x{height}"
        )));
    }
    if patch.dimensions() == (width, height) {
        return Ok(patch);
    }
    Ok(imageops::resize(&patch, width, height, FilterType::Lanczos3))
}

/// Extract `rect` from `source` and scale it to `width` x `height`.
///
/// # Errors
///
/// See [`extract`] and [`scale`].
pub fn extract_scaled(source: &RgbaImage, rect: Rect, width: u32, height: u32) -> Result<RgbaImage> {
    scale(extract(source, rect)?, width, height)
}
