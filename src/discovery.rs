//! Pairing originals with their clean variants by file name.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Stem suffix marking a clean variant in [`PairLayout::Suffix`] mode.
pub const CLEAN_SUFFIX: &str = "-clean";
/// Subdirectory holding clean variants in [`PairLayout::CleanDir`] mode.
pub const CLEAN_DIR: &str = "clean";
/// Prefix of intermediate debug dumps.
pub const DEBUG_PREFIX: &str = "debug_";
/// Prefix of in-flight temporary outputs.
pub const TEMP_PREFIX: &str = ".corner-merge-";

/// Where the clean variant of `name.ext` lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PairLayout {
    /// Sibling file `name-clean.ext`.
    Suffix,
    /// `clean/name.ext` below the input directory.
    CleanDir,
}

/// An original image and its clean counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    /// Image receiving the merged corner.
    pub original: PathBuf,
    /// Clean variant the corner is taken from.
    pub clean: PathBuf,
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Whether `path` was produced by this tool (a clean variant, a debug dump
/// or a temporary file) and must not be treated as an original.
#[must_use]
pub fn is_pipeline_artifact(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    name.starts_with(DEBUG_PREFIX) || name.starts_with(TEMP_PREFIX) || stem.ends_with(CLEAN_SUFFIX)
}

/// Path where the clean variant of `original` is expected.
///
/// Example: `"shots/a.png"` pairs with `"shots/a-clean.png"` or
/// `"shots/clean/a.png"`.
#[must_use]
pub fn clean_counterpart(original: &Path, layout: PairLayout) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    match layout {
        PairLayout::Suffix => {
            let stem = original.file_stem().unwrap_or_default().to_string_lossy();
            match original.extension() {
                Some(ext) => parent.join(format!(
                    "{stem}{CLEAN_SUFFIX}.{}",
                    ext.to_string_lossy()
                )),
                None => parent.join(format!("{stem}{CLEAN_SUFFIX}")),
            }
        }
        PairLayout::CleanDir => {
            parent.join(CLEAN_DIR).join(original.file_name().unwrap_or_default())
        }
    }
}

/// Find every original in `dir` (non-recursive) that has a clean counterpart.
///
/// Originals without a counterpart are skipped silently. Pairs are sorted
/// by original path.
///
/// # Errors
///
/// Returns an I/O error if `dir` cannot be read.
pub fn discover_pairs(dir: &Path, layout: PairLayout) -> Result<Vec<ImagePair>> {
    let mut pairs: Vec<ImagePair> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_supported_image(p) && !is_pipeline_artifact(p))
        .filter_map(|original| {
            let clean = clean_counterpart(&original, layout);
            if clean.is_file() {
                Some(ImagePair { original, clean })
            } else {
                log::debug!("no clean counterpart for {}", original.display());
                None
            }
        })
        .collect();
    pairs.sort_by(|a, b| a.original.cmp(&b.original));
    Ok(pairs)
}
