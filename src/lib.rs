//! Merge the clean corner of a retouched image into its original.
//!
//! An original image and a clean variant of the same subject usually differ
//! in resolution and in the content of the bottom-right corner (where a
//! watermark sits). This crate takes that corner from the clean variant,
//! scales it to the original's resolution, darken-blends it with the
//! original's corner and pastes it back through a feather mask so no seam
//! is visible.
//!
//! # Quick Start
//!
//! ```no_run
//! use corner_merge::{MergeEngine, MergeOptions};
//!
//! let engine = MergeEngine::new(MergeOptions::scaled_corner());
//! let original = image::open("cover.png").unwrap().to_rgba8();
//! let clean = image::open("clean/cover.png").unwrap().to_rgba8();
//! let merged = engine.merge(&original, &clean, None).expect("corner fits");
//! merged.save("cover-merged.png").unwrap();
//! ```
//!
//! # Batch processing
//!
//! Pairs are discovered by file name (`name-clean.ext` siblings or a
//! `clean/` subdirectory) and processed one at a time. Failures are reported
//! per pair and never stop the batch.
//!
//! ```no_run
//! use corner_merge::{MergeEngine, MergeOptions, Outcome};
//!
//! let engine = MergeEngine::new(MergeOptions::fixed_corner());
//! for r in engine.process_directory("shots".as_ref()) {
//!     if r.outcome == Outcome::Failed {
//!         eprintln!("{}: {}", r.path.display(), r.message);
//!     }
//! }
//! ```

#![deny(missing_docs)]

pub mod blending;
pub mod discovery;
pub mod encoder;
mod engine;
pub mod error;
pub mod geometry;
pub mod inspect;
pub mod mask;
pub mod patch;

pub use discovery::{ImagePair, PairLayout};
pub use encoder::LosslessEncoder;
pub use engine::{
    plan_corner, save_image, CornerPlan, CropPolicy, MergeEngine, MergeOptions, Outcome,
    ProcessResult, MERGED_DIR, ORIG_DIR,
};
pub use error::{Error, Result};
pub use mask::{Edge, Edges, FeatherPolicy, FeatherSpec};
