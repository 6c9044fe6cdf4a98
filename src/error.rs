//! Error types for the corner-merge crate.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors that can occur while merging an image pair.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A crop, target size, or paste footprint is empty or out of bounds.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Two images that must be the same size are not.
    #[error("dimension mismatch: {left_w}x{left_h} vs {right_w}x{right_h}")]
    DimensionMismatch {
        /// Width of the first image.
        left_w: u32,
        /// Height of the first image.
        left_h: u32,
        /// Width of the second image.
        right_w: u32,
        /// Height of the second image.
        right_h: u32,
    },

    /// A file could not be decoded as a raster image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// The external encoder binary could not be located.
    #[error("encoder '{0}' not found; install libwebp and add it to PATH")]
    EncoderNotFound(String),

    /// The external encoder ran but did not exit successfully.
    #[error("encoder failed for {}: {status}", output.display())]
    EncoderFailure {
        /// Output the encoder was asked to write.
        output: PathBuf,
        /// Exit status reported by the process.
        status: ExitStatus,
    },

    /// The output path would overwrite the original without archiving it first.
    #[error("output {} would overwrite its input", .0.display())]
    OutputCollision(PathBuf),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (resize, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
