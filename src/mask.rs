//! Feather mask synthesis.
//!
//! Every mask is built from one primitive: a 1-D ramp that maps sample `i`
//! of `distance` to `round(i / distance * 255)`, reaching 255 at `distance`.
//! Each fading edge contributes a ramp along its axis; the per-pixel mask
//! value is the minimum over all contributions, so a corner where two fades
//! meet is never darker than the darker of the two.

use image::GrayImage;

use crate::error::{Error, Result};

/// One edge of a rectangular patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Edge {
    /// Top row.
    Top,
    /// Left column.
    Left,
    /// Bottom row.
    Bottom,
    /// Right column.
    Right,
}

/// Set of edges that fade in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Edges {
    /// Fade from the top row downwards.
    pub top: bool,
    /// Fade from the left column rightwards.
    pub left: bool,
    /// Fade from the bottom row upwards.
    pub bottom: bool,
    /// Fade from the right column leftwards.
    pub right: bool,
}

impl Edges {
    /// Top and left: the inner edges of a bottom-right corner patch.
    pub const TOP_LEFT: Self = Self {
        top: true,
        left: true,
        bottom: false,
        right: false,
    };

    /// All four edges.
    pub const ALL: Self = Self {
        top: true,
        left: true,
        bottom: true,
        right: true,
    };

    /// Whether no edge fades.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.top || self.left || self.bottom || self.right)
    }
}

impl FromIterator<Edge> for Edges {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        let mut edges = Self::default();
        for edge in iter {
            match edge {
                Edge::Top => edges.top = true,
                Edge::Left => edges.left = true,
                Edge::Bottom => edges.bottom = true,
                Edge::Right => edges.right = true,
            }
        }
        edges
    }
}

/// Which edges fade and over how many pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatherSpec {
    /// Fading edges.
    pub edges: Edges,
    /// Fade length in pixels. Clamped to `1..=min(width, height)` at use.
    pub distance: u32,
}

/// How the feather distance is derived from the patch size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatherPolicy {
    /// Fixed number of pixels.
    Fixed(u32),
    /// Percentage of the patch's shorter side, rounded down.
    PercentOfPatch(f64),
}

impl FeatherPolicy {
    /// Resolve the feather distance for a `width` x `height` patch.
    ///
    /// The result is always within `1..=min(width, height)` (or 1 for an
    /// empty patch).
    #[must_use]
    pub fn distance_for(&self, width: u32, height: u32) -> u32 {
        let side = width.min(height);
        let raw = match *self {
            Self::Fixed(px) => px,
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::PercentOfPatch(pct) => (f64::from(side) * pct / 100.0).max(0.0) as u32,
        };
        clamp_distance(raw, side)
    }
}

fn clamp_distance(distance: u32, side: u32) -> u32 {
    distance.min(side).max(1)
}

/// The ramp primitive: `distance` samples rising from 0 towards 255.
///
/// Sample `i` is `round(i / distance * 255)`; everything at or past
/// `distance` is implicitly 255.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ramp(distance: u32) -> Vec<u8> {
    let d = distance.max(1);
    (0..d)
        .map(|i| (f64::from(i) / f64::from(d) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Opacity profile along one axis of length `len`, fading from the start,
/// the end, or both.
fn axis_profile(len: u32, ramp: &[u8], from_start: bool, from_end: bool) -> Vec<u8> {
    let len = len as usize;
    let at = |i: usize| ramp.get(i).copied().unwrap_or(u8::MAX);
    (0..len)
        .map(|i| {
            let mut v = u8::MAX;
            if from_start {
                v = v.min(at(i));
            }
            if from_end {
                v = v.min(at(len - 1 - i));
            }
            v
        })
        .collect()
}

/// Build a `width` x `height` feather mask.
///
/// 0 keeps the destination, 255 takes the patch. The mask is a pure
/// function of its inputs.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if either dimension is zero.
pub fn feather_mask(width: u32, height: u32, spec: &FeatherSpec) -> Result<GrayImage> {
    if width == 0 || height == 0 {
        return Err(Error::Geometry(format!(
            "mask size must be positive, got {width}x{height}"
        )));
    }
    let distance = clamp_distance(spec.distance, width.min(height));
    let ramp = ramp(distance);
    let cols = axis_profile(width, &ramp, spec.edges.left, spec.edges.right);
    let rows = axis_profile(height, &ramp, spec.edges.top, spec.edges.bottom);

    let mut mask = GrayImage::new(width, height);
    let buf: &mut [u8] = &mut mask;
    let fill = |(y, row): (usize, &mut [u8])| {
        let v = rows[y];
        for (px, &c) in row.iter_mut().zip(&cols) {
            *px = c.min(v);
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buf.par_chunks_mut(width as usize).enumerate().for_each(fill);
    }

    #[cfg(not(feature = "parallel"))]
    {
        buf.chunks_mut(width as usize).enumerate().for_each(fill);
    }

    Ok(mask)
}
