//! Darken blending and masked compositing.
//!
//! The corner patch is first fused with the destination background by
//! keeping the darker of each color channel, then pasted back through a
//! feather mask:
//! `output = destination * (1 - mask / 255) + patch * (mask / 255)`

use image::{GrayImage, Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::geometry::Rect;

fn ensure_same_size(a: (u32, u32), b: (u32, u32)) -> Result<()> {
    if a == b {
        return Ok(());
    }
    Err(Error::DimensionMismatch {
        left_w: a.0,
        left_h: a.1,
        right_w: b.0,
        right_h: b.1,
    })
}

/// Per-channel darken of two equally sized images.
///
/// Each RGB channel is the minimum of the two inputs. Both inputs are
/// treated as opaque, so the result alpha is always 255.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the sizes differ.
pub fn darken(background: &RgbaImage, overlay: &RgbaImage) -> Result<RgbaImage> {
    ensure_same_size(background.dimensions(), overlay.dimensions())?;

    let mut out = RgbaImage::new(background.width(), background.height());
    for ((o, b), p) in out.pixels_mut().zip(background.pixels()).zip(overlay.pixels()) {
        *o = Rgba([b[0].min(p[0]), b[1].min(p[1]), b[2].min(p[2]), u8::MAX]);
    }
    Ok(out)
}

/// Mix one channel: `(d * (255 - m) + p * m) / 255`, rounded.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn mix(dest: u8, patch: u8, m: u8) -> u8 {
    let m = u32::from(m);
    ((u32::from(dest) * (255 - m) + u32::from(patch) * m + 127) / 255) as u8
}

/// Composite `patch` onto `dest` at (`x`, `y`) using `mask` as opacity.
///
/// Only pixels under the patch footprint change. A mask value of 0 leaves
/// the destination byte-identical and 255 copies the patch pixel exactly.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the patch and mask differ in size,
/// or [`Error::Geometry`] if the footprint does not fit inside `dest`.
pub fn composite_masked(
    dest: &mut RgbaImage,
    patch: &RgbaImage,
    mask: &GrayImage,
    x: u32,
    y: u32,
) -> Result<()> {
    ensure_same_size(patch.dimensions(), mask.dimensions())?;
    let footprint = Rect::from_origin(x, y, patch.width(), patch.height())?;
    footprint.ensure_within(dest.width(), dest.height())?;

    let stride = dest.width() as usize * 4;
    let left = x as usize * 4;
    let span = patch.width() as usize * 4;
    let patch_rows = patch.chunks_exact(span);
    let mask_rows = mask.chunks_exact(patch.width() as usize);

    let apply = |((dest_row, patch_row), mask_row): ((&mut [u8], &[u8]), &[u8])| {
        let dest_px = &mut dest_row[left..left + span];
        for ((d, p), &m) in dest_px
            .chunks_exact_mut(4)
            .zip(patch_row.chunks_exact(4))
            .zip(mask_row)
        {
            match m {
                0 => {}
                u8::MAX => d.copy_from_slice(p),
                _ => {
                    for (dc, &pc) in d.iter_mut().zip(p) {
                        *dc = mix(*dc, pc, m);
                    }
                }
            }
        }
    };

    let buf: &mut [u8] = dest;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let patch_rows: Vec<&[u8]> = patch_rows.collect();
        let mask_rows: Vec<&[u8]> = mask_rows.collect();
        buf.par_chunks_exact_mut(stride)
            .skip(y as usize)
            .take(patch.height() as usize)
            .zip(patch_rows)
            .zip(mask_rows)
            .for_each(apply);
    }

    #[cfg(not(feature = "parallel"))]
    {
        buf.chunks_exact_mut(stride)
            .skip(y as usize)
            .zip(patch_rows)
            .zip(mask_rows)
            .for_each(apply);
    }

    Ok(())
}
