//! Corner merge pipeline and batch driver.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use tempfile::NamedTempFile;

use crate::blending;
use crate::discovery::{self, ImagePair, PairLayout, TEMP_PREFIX};
use crate::encoder::LosslessEncoder;
use crate::error::{Error, Result};
use crate::geometry::{self, Rect};
use crate::inspect::{DebugDump, Inspector, Stage};
use crate::mask::{self, Edges, FeatherPolicy, FeatherSpec};
use crate::patch;

/// Subdirectory that processed originals are moved into.
pub const ORIG_DIR: &str = "orig";
/// Default output subdirectory.
pub const MERGED_DIR: &str = "merged";

/// How the size of the corner square is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropPolicy {
    /// Fixed side length, in the original image's pixels.
    ///
    /// The clean crop is `round(size / ratio)` with `ratio` taken from the
    /// widths alone and applied to both axes, so the crop stays square even
    /// when the two images differ in aspect ratio. A crop that does not fit
    /// the clean image is a geometry error.
    Fixed(u32),
    /// Percentage of the clean image's width, rounded down, in the clean
    /// image's pixels.
    PercentOfCleanWidth(f64),
}

/// Options controlling how pairs are merged and where results go.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Corner square size.
    pub crop: CropPolicy,
    /// Feather distance.
    pub feather: FeatherPolicy,
    /// Patch edges that fade into the original.
    pub edges: Edges,
    /// Where clean variants live.
    pub layout: PairLayout,
    /// Output directory (default: `<input>/merged`).
    pub output_dir: Option<PathBuf>,
    /// Move processed originals into `<input>/orig`.
    pub archive: bool,
    /// Write mask, patch and blended images next to each output.
    pub save_intermediate: bool,
}

impl MergeOptions {
    /// 200 px corner with a 10 px top/left feather; clean files are
    /// `name-clean.ext` siblings.
    #[must_use]
    pub fn fixed_corner() -> Self {
        Self {
            crop: CropPolicy::Fixed(200),
            feather: FeatherPolicy::Fixed(10),
            edges: Edges::TOP_LEFT,
            layout: PairLayout::Suffix,
            output_dir: None,
            archive: false,
            save_intermediate: false,
        }
    }

    /// Corner of 10% of the clean width with a 33% top/left feather; clean
    /// files live in `clean/` and originals are archived.
    #[must_use]
    pub fn scaled_corner() -> Self {
        Self {
            crop: CropPolicy::PercentOfCleanWidth(10.0),
            feather: FeatherPolicy::PercentOfPatch(33.0),
            edges: Edges::TOP_LEFT,
            layout: PairLayout::CleanDir,
            output_dir: None,
            archive: true,
            save_intermediate: false,
        }
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::fixed_corner()
    }
}

/// Geometry of one merge, resolved from the two image sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerPlan {
    /// Region copied from the clean image.
    pub clean_rect: Rect,
    /// Original width over clean width.
    pub ratio: f64,
    /// Region of the original that is replaced.
    pub paste: Rect,
    /// Resolved feather distance in pixels.
    pub feather_distance: u32,
}

/// Resolve crop, scale and paste geometry for an original of size
/// `original` and a clean variant of size `clean`.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if the corner is empty or does not fit
/// either image.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn plan_corner(
    original: (u32, u32),
    clean: (u32, u32),
    opts: &MergeOptions,
) -> Result<CornerPlan> {
    let (orig_w, orig_h) = original;
    let (clean_w, clean_h) = clean;
    if orig_w == 0 || orig_h == 0 || clean_w == 0 || clean_h == 0 {
        return Err(Error::Geometry(format!(
            "empty image: original {orig_w}x{orig_h}, clean {clean_w}x{clean_h}"
        )));
    }
    let ratio = geometry::scale_ratio(orig_w, clean_w);

    let (crop, side) = match opts.crop {
        CropPolicy::PercentOfCleanWidth(pct) => {
            let crop = (f64::from(clean_w) * pct / 100.0).max(0.0) as u32;
            (crop, (f64::from(crop) * ratio) as u32)
        }
        CropPolicy::Fixed(px) => {
            let crop = (f64::from(px) / ratio).round() as u32;
            (crop.max(1), px)
        }
    };

    let clean_rect = geometry::corner_box(clean_w, clean_h, crop)?;
    let paste = geometry::corner_box(orig_w, orig_h, side)?;
    let feather_distance = opts.feather.distance_for(side, side);

    Ok(CornerPlan {
        clean_rect,
        ratio,
        paste,
        feather_distance,
    })
}

/// What happened to one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Composite written.
    Merged,
    /// Left alone because it was already processed.
    Skipped,
    /// Aborted; any partial output was discarded.
    Failed,
}

/// Result of processing a single pair.
#[derive(Debug)]
pub struct ProcessResult {
    /// Original image of the pair.
    pub path: PathBuf,
    /// Final output file, when one was written.
    pub output: Option<PathBuf>,
    /// What happened.
    pub outcome: Outcome,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path, outcome: Outcome, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            outcome,
            message,
        }
    }
}

/// Drives the merge pipeline over single pairs or whole directories.
///
/// Pairs are processed one at a time; nothing is shared between them.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
    encoder: Option<LosslessEncoder>,
}

impl MergeEngine {
    /// Create an engine writing composites in their original format.
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            encoder: None,
        }
    }

    /// Re-encode every composite losslessly to WebP with `encoder`.
    #[must_use]
    pub fn with_encoder(mut self, encoder: LosslessEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Options in use.
    #[must_use]
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge the bottom-right corner of `clean` into a copy of `original`.
    ///
    /// The clean corner is scaled to the original's resolution, darkened
    /// against the original's corner and pasted through a feather mask.
    /// When `inspector` is given it receives the mask, scaled patch and
    /// blended patch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] if the corner does not fit either image.
    pub fn merge(
        &self,
        original: &RgbaImage,
        clean: &RgbaImage,
        inspector: Option<&mut dyn Inspector>,
    ) -> Result<RgbaImage> {
        let plan = plan_corner(original.dimensions(), clean.dimensions(), &self.options)?;
        let side = plan.paste.width();
        log::info!(
            "original {}x{}, clean {}x{}, crop {}px, ratio {:.4}, patch {side}x{side} at ({}, {}), feather {}px",
            original.width(),
            original.height(),
            clean.width(),
            clean.height(),
            plan.clean_rect.width(),
            plan.ratio,
            plan.paste.left,
            plan.paste.top,
            plan.feather_distance,
        );

        let scaled = patch::extract_scaled(clean, plan.clean_rect, side, side)?;
        let background = patch::extract(original, plan.paste)?;
        let blended = blending::darken(&background, &scaled)?;
        let spec = FeatherSpec {
            edges: self.options.edges,
            distance: plan.feather_distance,
        };
        let mask = mask::feather_mask(side, side, &spec)?;

        if let Some(inspector) = inspector {
            let stages = [
                (Stage::Mask, DynamicImage::ImageLuma8(mask.clone())),
                (Stage::Patch, DynamicImage::ImageRgba8(scaled)),
                (Stage::Blended, DynamicImage::ImageRgba8(blended.clone())),
            ];
            for (stage, img) in &stages {
                if let Err(e) = inspector.record(*stage, img) {
                    log::warn!("could not record {stage} image: {e}");
                }
            }
        }

        let mut composite = original.clone();
        blending::composite_masked(
            &mut composite,
            &blended,
            &mask,
            plan.paste.left,
            plan.paste.top,
        )?;
        Ok(composite)
    }

    /// Final path for `original`'s composite.
    ///
    /// Example: `"shots/a.png"` becomes `"shots/merged/a.png"`, or
    /// `"shots/merged/a.webp"` when re-encoding.
    #[must_use]
    pub fn output_path(&self, original: &Path) -> PathBuf {
        let parent = original.parent().unwrap_or(Path::new("."));
        let dir = self
            .options
            .output_dir
            .clone()
            .unwrap_or_else(|| parent.join(MERGED_DIR));
        let name = Path::new(original.file_name().unwrap_or_default());
        if self.encoder.is_some() {
            dir.join(name.with_extension("webp"))
        } else {
            dir.join(name)
        }
    }

    /// Process one pair: load, merge, persist, then archive the original.
    ///
    /// Never fails; errors are reported in the returned [`ProcessResult`].
    #[must_use]
    pub fn process_pair(&self, pair: &ImagePair) -> ProcessResult {
        let name = display_name(&pair.original);
        match self.try_process_pair(pair) {
            Ok(Some(output)) => {
                log::info!("{name} -> {}", output.display());
                ProcessResult {
                    output: Some(output),
                    ..ProcessResult::new(&pair.original, Outcome::Merged, "Corner merged".to_string())
                }
            }
            Ok(None) => {
                log::info!("skipping {name}: already processed");
                ProcessResult::new(
                    &pair.original,
                    Outcome::Skipped,
                    "Already processed".to_string(),
                )
            }
            Err(e) => {
                log::error!("failed to process {name}: {e}");
                ProcessResult::new(&pair.original, Outcome::Failed, e.to_string())
            }
        }
    }

    fn try_process_pair(&self, pair: &ImagePair) -> Result<Option<PathBuf>> {
        let output = self.output_path(&pair.original);
        let overwrites_input = output == pair.original;

        if !overwrites_input && output.exists() {
            return Ok(None);
        }
        if self.options.archive && archive_path(&pair.original).exists() {
            return Ok(None);
        }
        if overwrites_input && !self.options.archive {
            return Err(Error::OutputCollision(output));
        }

        let original = open_rgba(&pair.original)?;
        let clean = open_rgba(&pair.clean)?;

        let out_dir = output.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(out_dir)?;

        let mut dump = self.options.save_intermediate.then(|| {
            let stem = pair.original.file_stem().unwrap_or_default();
            DebugDump::new(out_dir, &stem.to_string_lossy())
        });
        let composite = self.merge(
            &original,
            &clean,
            dump.as_mut().map(|d| d as &mut dyn Inspector),
        )?;
        drop(original);

        let staged = self.stage(&composite, &output, out_dir)?;

        match (self.options.archive, overwrites_input) {
            (true, true) => archive_then_persist(staged, &pair.original, &output)?,
            (true, false) => persist_then_archive(staged, &pair.original, &output)?,
            _ => staged.persist(&output).map_err(|e| Error::Io(e.error)).map(drop)?,
        }

        Ok(Some(output))
    }

    /// Write the final bytes for `output` into a temporary file in
    /// `out_dir`. The file is deleted if it is dropped without being
    /// persisted.
    fn stage(&self, composite: &RgbaImage, output: &Path, out_dir: &Path) -> Result<NamedTempFile> {
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&format!(".{ext}"))
            .tempfile_in(out_dir)?;

        match &self.encoder {
            Some(encoder) => {
                let intermediate = tempfile::Builder::new()
                    .prefix(TEMP_PREFIX)
                    .suffix(".png")
                    .tempfile_in(out_dir)?;
                composite.save_with_format(intermediate.path(), ImageFormat::Png)?;
                log::info!("encoding {}", display_name(output));
                encoder.encode(intermediate.path(), staged.path())?;
            }
            None => save_image(composite, staged.path(), output)?,
        }
        Ok(staged)
    }

    /// Merge every pair found in `dir`.
    #[must_use]
    pub fn process_directory(&self, dir: &Path) -> Vec<ProcessResult> {
        self.process_directory_until(dir, || false)
    }

    /// Merge every pair found in `dir`, checking `stop` before each pair.
    ///
    /// Once `stop` returns `true` no further pair is started; the pair in
    /// flight always runs to completion.
    #[must_use]
    pub fn process_directory_until(
        &self,
        dir: &Path,
        mut stop: impl FnMut() -> bool,
    ) -> Vec<ProcessResult> {
        let pairs = match discovery::discover_pairs(dir, self.options.layout) {
            Ok(pairs) => pairs,
            Err(e) => {
                return vec![ProcessResult::new(
                    dir,
                    Outcome::Failed,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };
        log::info!("found {} pair(s) in {}", pairs.len(), dir.display());

        let mut results = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            if stop() {
                log::info!("stop requested, {} pair(s) left", pairs.len() - results.len());
                break;
            }
            log::debug!(
                "pair: {} + {}",
                display_name(&pair.original),
                display_name(&pair.clean)
            );
            results.push(self.process_pair(pair));
        }
        results
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

fn open_rgba(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn archive_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    parent
        .join(ORIG_DIR)
        .join(original.file_name().unwrap_or_default())
}

fn archive_original(original: &Path) -> Result<PathBuf> {
    let target = archive_path(original);
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::rename(original, &target)?;
    log::info!("moved source to {}", target.display());
    Ok(target)
}

/// Move `original` into the archive, then rename `staged` to `output`.
///
/// If the rename fails the original is moved back.
fn archive_then_persist(staged: NamedTempFile, original: &Path, output: &Path) -> Result<()> {
    let archived = archive_original(original)?;
    if let Err(e) = staged.persist(output) {
        if let Err(restore) = std::fs::rename(&archived, original) {
            log::error!(
                "could not restore {} from {}: {restore}",
                original.display(),
                archived.display()
            );
        }
        return Err(Error::Io(e.error));
    }
    Ok(())
}

/// Rename `staged` to `output`, then move `original` into the archive.
///
/// If archiving fails the output is removed again.
fn persist_then_archive(staged: NamedTempFile, original: &Path, output: &Path) -> Result<()> {
    staged.persist(output).map_err(|e| Error::Io(e.error))?;
    if let Err(e) = archive_original(original) {
        if let Err(remove) = std::fs::remove_file(output) {
            log::error!("could not remove {}: {remove}", output.display());
        }
        return Err(e);
    }
    Ok(())
}

/// Save an RGBA image to `path` in the format implied by `format_hint`'s
/// extension.
///
/// JPEG drops the alpha channel and is written at quality 100.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path, format_hint: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(format_hint).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&DynamicImage::ImageRgba8(img.clone()).to_rgb8())?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct Recorder(Vec<(Stage, (u32, u32))>);

    impl Inspector for Recorder {
        fn record(&mut self, stage: Stage, image: &DynamicImage) -> Result<()> {
            self.0.push((stage, (image.width(), image.height())));
            Ok(())
        }
    }

    fn percent_opts() -> MergeOptions {
        MergeOptions::scaled_corner()
    }

    #[test]
    fn percent_plan_projects_clean_corner_onto_original() {
        let plan = plan_corner((1000, 1000), (500, 500), &percent_opts()).unwrap();
        assert!((plan.ratio - 2.0).abs() < f64::EPSILON);
        assert_eq!(plan.clean_rect, geometry::corner_box(500, 500, 50).unwrap());
        assert_eq!(
            plan.paste,
            Rect {
                left: 900,
                top: 900,
                right: 1000,
                bottom: 1000
            }
        );
        assert_eq!(plan.feather_distance, 33);
    }

    #[test]
    fn fixed_plan_keeps_size_in_original_pixels() {
        let plan = plan_corner((800, 600), (400, 300), &MergeOptions::fixed_corner()).unwrap();
        assert_eq!(plan.paste.width(), 200);
        assert_eq!((plan.paste.left, plan.paste.top), (600, 400));
        assert_eq!(plan.clean_rect.width(), 100);
        assert_eq!(plan.feather_distance, 10);
    }

    #[test]
    fn plan_rejects_corner_larger_than_original() {
        let err = plan_corner((150, 150), (150, 150), &MergeOptions::fixed_corner()).unwrap_err();
        assert!(matches!(err, Error::Geometry(_)));
    }

    #[test]
    fn fixed_plan_rejects_crop_larger_than_clean() {
        let err = plan_corner((800, 800), (400, 50), &MergeOptions::fixed_corner()).unwrap_err();
        assert!(matches!(err, Error::Geometry(_)));
    }

    #[test]
    fn fixed_plan_uses_width_ratio_on_both_axes() {
        let plan = plan_corner((800, 800), (400, 300), &MergeOptions::fixed_corner()).unwrap();
        assert_eq!(plan.clean_rect.width(), 100);
        assert_eq!(plan.clean_rect.height(), 100);
    }

    fn staged_in(dir: &Path, bytes: &[u8]) -> NamedTempFile {
        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .expect("create staged file");
        std::io::Write::write_all(&mut staged, bytes).expect("write staged file");
        staged
    }

    #[test]
    fn failed_persist_restores_archived_original() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let original = dir.path().join("a.png");
        std::fs::write(&original, b"original").unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), b"x").unwrap();

        let staged = staged_in(dir.path(), b"merged");
        assert!(archive_then_persist(staged, &original, &blocked).is_err());
        assert_eq!(std::fs::read(&original).unwrap(), b"original");
        assert!(!archive_path(&original).exists());
    }

    #[test]
    fn failed_archive_removes_persisted_output() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let original = dir.path().join("a.png");
        std::fs::write(&original, b"original").unwrap();
        std::fs::write(dir.path().join(ORIG_DIR), b"not a directory").unwrap();
        let output = dir.path().join("out.png");

        let staged = staged_in(dir.path(), b"merged");
        assert!(persist_then_archive(staged, &original, &output).is_err());
        assert!(!output.exists());
        assert!(original.exists());
    }

    #[test]
    fn plan_rejects_empty_percent_crop() {
        let err = plan_corner((9, 9), (9, 9), &percent_opts()).unwrap_err();
        assert!(matches!(err, Error::Geometry(_)));
    }

    #[test]
    fn merge_darkens_corner_and_keeps_rest() {
        let original = RgbaImage::from_pixel(100, 100, Rgba([200, 200, 200, 255]));
        let clean = RgbaImage::from_pixel(50, 50, Rgba([50, 50, 50, 255]));
        let engine = MergeEngine::new(percent_opts());
        let out = engine.merge(&original, &clean, None).unwrap();

        // 10 px patch at (90, 90); feather 3 px on top/left
        assert_eq!(*out.get_pixel(89, 99), Rgba([200, 200, 200, 255]));
        assert_eq!(*out.get_pixel(99, 89), Rgba([200, 200, 200, 255]));
        assert_eq!(*out.get_pixel(90, 95), Rgba([200, 200, 200, 255]));
        assert_eq!(*out.get_pixel(99, 99), Rgba([50, 50, 50, 255]));
        assert_eq!(*out.get_pixel(93, 93), Rgba([50, 50, 50, 255]));
        let mid = out.get_pixel(91, 95)[0];
        assert!(mid > 50 && mid < 200);
    }

    #[test]
    fn merge_reports_stages_in_order() {
        let original = RgbaImage::from_pixel(100, 100, Rgba([200, 200, 200, 255]));
        let clean = RgbaImage::from_pixel(50, 50, Rgba([50, 50, 50, 255]));
        let engine = MergeEngine::new(percent_opts());
        let mut rec = Recorder(Vec::new());
        engine.merge(&original, &clean, Some(&mut rec)).unwrap();
        assert_eq!(
            rec.0,
            vec![
                (Stage::Mask, (10, 10)),
                (Stage::Patch, (10, 10)),
                (Stage::Blended, (10, 10)),
            ]
        );
    }

    #[test]
    fn output_path_defaults_to_merged_dir() {
        let engine = MergeEngine::new(MergeOptions::fixed_corner());
        assert_eq!(
            engine.output_path(Path::new("/shots/a.png")),
            PathBuf::from("/shots/merged/a.png")
        );

        let engine = MergeEngine::new(MergeOptions {
            output_dir: Some(PathBuf::from("/out")),
            ..MergeOptions::fixed_corner()
        })
        .with_encoder(LosslessEncoder::with_program(Path::new("cwebp")));
        assert_eq!(
            engine.output_path(Path::new("/shots/a.png")),
            PathBuf::from("/out/a.webp")
        );
    }

    #[test]
    fn output_over_input_requires_archival() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let pair = ImagePair {
            original: dir.path().join("a.png"),
            clean: dir.path().join("a-clean.png"),
        };
        let engine = MergeEngine::new(MergeOptions {
            output_dir: Some(dir.path().to_path_buf()),
            ..MergeOptions::fixed_corner()
        });
        let result = engine.process_pair(&pair);
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.message.contains("overwrite"));
    }

    #[test]
    fn undecodable_input_fails_without_output() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let original = dir.path().join("a.png");
        let clean = dir.path().join("a-clean.png");
        std::fs::write(&original, b"not a png").expect("write");
        std::fs::write(&clean, b"not a png").expect("write");

        let engine = MergeEngine::new(MergeOptions::fixed_corner());
        let result = engine.process_pair(&ImagePair { original, clean });
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.message.contains("decode"));
        assert!(!dir.path().join(MERGED_DIR).join("a.png").exists());
    }

    #[test]
    fn save_image_rejects_unknown_format() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let img = RgbaImage::new(2, 2);
        let path = dir.path().join("a.xyz");
        assert!(save_image(&img, &path, &path).is_err());
    }
}
