use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use corner_merge::discovery::{self, clean_counterpart};
use corner_merge::encoder::CWEBP;
use corner_merge::{
    CropPolicy, Edge, FeatherPolicy, ImagePair, LosslessEncoder, MergeEngine, MergeOptions,
    Outcome, PairLayout, ProcessResult,
};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// 200px corner, 10px feather, `name-clean.ext` pairs
    Fixed,
    /// 10% of clean width, 33% feather, `clean/` pairs, archive originals
    Scaled,
}

#[derive(Parser)]
#[command(
    name = "corner-merge",
    about = "Merge the clean bottom-right corner of retouched images into their originals",
    version,
    after_help = "Pairs are found by name: `a.png` + `a-clean.png` (suffix layout) or\n\
                  `a.png` + `clean/a.png` (clean-dir layout). Existing outputs are skipped."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input directory, or a single original image
    input: PathBuf,

    /// Output directory (default: <input>/merged)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Preset for sizes, layout and archival
    #[arg(short, long, value_enum, default_value = "fixed")]
    mode: Mode,

    /// Corner size in pixels of the original image
    #[arg(long, conflicts_with = "crop_percent")]
    crop_px: Option<u32>,

    /// Corner size as a percentage of the clean image width
    #[arg(long)]
    crop_percent: Option<f64>,

    /// Feather distance in pixels
    #[arg(long, conflicts_with = "feather_percent")]
    feather_px: Option<u32>,

    /// Feather distance as a percentage of the patch size
    #[arg(long)]
    feather_percent: Option<f64>,

    /// Patch edges that fade in (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    edges: Vec<Edge>,

    /// Where clean variants live
    #[arg(long, value_enum)]
    layout: Option<PairLayout>,

    /// Move processed originals into <input>/orig
    #[arg(long, overrides_with = "no_archive")]
    archive: bool,

    /// Leave originals in place
    #[arg(long)]
    no_archive: bool,

    /// Re-encode composites as lossless WebP with cwebp
    #[arg(long)]
    webp: bool,

    /// Path or name of the cwebp binary (default: cwebp on PATH)
    #[arg(long, requires = "webp")]
    encoder: Option<String>,

    /// Also save mask, patch and blended images as debug_*.png
    #[arg(long)]
    debug_dump: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    for pct in [cli.crop_percent, cli.feather_percent].into_iter().flatten() {
        if !(pct > 0.0 && pct <= 100.0) {
            eprintln!("Error: Percentages must be in (0, 100], got {pct}");
            process::exit(1);
        }
    }

    let opts = build_options(&cli);

    let mut engine = MergeEngine::new(opts);
    if cli.webp {
        match LosslessEncoder::locate_program(cli.encoder.as_deref().unwrap_or(CWEBP)) {
            Ok(enc) => engine = engine.with_encoder(enc.show_progress(cli.verbose)),
            Err(e) => {
                eprintln!("Fatal: {e}");
                process::exit(1);
            }
        }
    }

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }

    let results = if cli.input.is_dir() {
        engine.process_directory(&cli.input)
    } else {
        let clean = clean_counterpart(&cli.input, engine.options().layout);
        if discovery::is_pipeline_artifact(&cli.input) || !clean.is_file() {
            eprintln!(
                "Error: No clean counterpart for {} (expected {})",
                cli.input.display(),
                clean.display()
            );
            process::exit(1);
        }
        vec![engine.process_pair(&ImagePair {
            original: cli.input.clone(),
            clean,
        })]
    };

    let mut merged = 0u32;
    let mut skipped = 0u32;
    let mut failed = 0u32;

    for r in &results {
        print_result(r, cli.quiet);
        match r.outcome {
            Outcome::Merged => merged += 1,
            Outcome::Skipped => skipped += 1,
            Outcome::Failed => failed += 1,
        }
    }

    if !cli.quiet {
        eprintln!();
        eprint!("[Summary] Merged: {merged}");
        if skipped > 0 {
            eprint!(", Skipped: {skipped}");
        }
        if failed > 0 {
            eprint!(", Failed: {failed}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if failed > 0 {
        process::exit(1);
    }
}

fn build_options(cli: &Cli) -> MergeOptions {
    let mut opts = match cli.mode {
        Mode::Fixed => MergeOptions::fixed_corner(),
        Mode::Scaled => MergeOptions::scaled_corner(),
    };

    if let Some(px) = cli.crop_px {
        opts.crop = CropPolicy::Fixed(px);
    } else if let Some(pct) = cli.crop_percent {
        opts.crop = CropPolicy::PercentOfCleanWidth(pct);
    }
    if let Some(px) = cli.feather_px {
        opts.feather = FeatherPolicy::Fixed(px);
    } else if let Some(pct) = cli.feather_percent {
        opts.feather = FeatherPolicy::PercentOfPatch(pct);
    }
    if !cli.edges.is_empty() {
        opts.edges = cli.edges.iter().copied().collect();
    }
    if let Some(layout) = cli.layout {
        opts.layout = layout;
    }
    if cli.archive {
        opts.archive = true;
    } else if cli.no_archive {
        opts.archive = false;
    }
    opts.output_dir.clone_from(&cli.output);
    opts.save_intermediate = cli.debug_dump;
    opts
}

fn print_result(result: &ProcessResult, quiet: bool) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    match result.outcome {
        Outcome::Skipped if !quiet => eprintln!("[SKIP] {filename}: {}", result.message),
        Outcome::Merged if !quiet => match &result.output {
            Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
            None => eprintln!("[OK] {filename}"),
        },
        Outcome::Failed => eprintln!("[FAIL] {filename}: {}", result.message),
        _ => {}
    }
}
