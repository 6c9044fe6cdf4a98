//! Opt-in inspection of intermediate pipeline images.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::discovery::DEBUG_PREFIX;
use crate::error::Result;

/// Intermediate images produced while merging one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Feather mask (grayscale).
    Mask,
    /// Clean corner after scaling to the paste size.
    Patch,
    /// Patch after darken blending with the destination background.
    Blended,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mask => "mask",
            Self::Patch => "patch",
            Self::Blended => "blended",
        })
    }
}

/// Receives intermediate images from [`crate::MergeEngine::merge`].
pub trait Inspector {
    /// Called once per stage, in pipeline order.
    ///
    /// # Errors
    ///
    /// Failures are logged by the caller and never abort the merge.
    fn record(&mut self, stage: Stage, image: &DynamicImage) -> Result<()>;
}

/// Writes each stage as `debug_{stage}_{stem}.png` into a directory.
#[derive(Debug, Clone)]
pub struct DebugDump {
    dir: PathBuf,
    stem: String,
}

impl DebugDump {
    /// Dump stages for the image named `stem` into `dir`.
    #[must_use]
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
        }
    }

    /// File a stage is written to.
    #[must_use]
    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.dir
            .join(format!("{DEBUG_PREFIX}{stage}_{}.png", self.stem))
    }
}

impl Inspector for DebugDump {
    fn record(&mut self, stage: Stage, image: &DynamicImage) -> Result<()> {
        let path = self.path_for(stage);
        image.save_with_format(&path, ImageFormat::Png)?;
        log::debug!("debug image saved: {}", path.display());
        Ok(())
    }
}
