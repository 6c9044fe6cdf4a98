//! Rectangle math for corner crops and cross-image scaling.

use crate::error::{Error, Result};

/// An axis-aligned pixel rectangle, `left`/`top` inclusive and
/// `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge (inclusive).
    pub left: u32,
    /// Top edge (inclusive).
    pub top: u32,
    /// Right edge (exclusive).
    pub right: u32,
    /// Bottom edge (exclusive).
    pub bottom: u32,
}

impl Rect {
    /// Build a rectangle from its top-left corner and size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] for an empty size or when the far edges
    /// overflow `u32`.
    pub fn from_origin(left: u32, top: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Geometry(format!(
                "rectangle size must be positive, got {width}x{height}"
            )));
        }
        let right = left
            .checked_add(width)
            .ok_or_else(|| Error::Geometry(format!("rectangle overflows at x={left}")))?;
        let bottom = top
            .checked_add(height)
            .ok_or_else(|| Error::Geometry(format!("rectangle overflows at y={top}")))?;
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Check that the rectangle lies within a `width` x `height` image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] when any edge falls outside the image.
    pub fn ensure_within(&self, width: u32, height: u32) -> Result<()> {
        if self.right > width || self.bottom > height {
            return Err(Error::Geometry(format!(
                "region ({}, {})-({}, {}) exceeds {width}x{height} image",
                self.left, self.top, self.right, self.bottom
            )));
        }
        Ok(())
    }
}

/// Square box of side `size` anchored at the bottom-right corner of a
/// `width` x `height` image.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if `size` is zero or larger than either
/// dimension.
pub fn corner_box(width: u32, height: u32, size: u32) -> Result<Rect> {
    if size == 0 {
        return Err(Error::Geometry("corner size must be positive".to_string()));
    }
    if size > width || size > height {
        return Err(Error::Geometry(format!(
            "corner size {size} exceeds {width}x{height} image"
        )));
    }
    Ok(Rect {
        left: width - size,
        top: height - size,
        right: width,
        bottom: height,
    })
}

/// Ratio projecting a length measured in `source_dim` space into
/// `target_dim` space.
#[must_use]
pub fn scale_ratio(target_dim: u32, source_dim: u32) -> f64 {
    f64::from(target_dim) / f64::from(source_dim)
}
