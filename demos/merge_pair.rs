//! Merge the clean corner of one image pair and save the composite.
//!
//! Usage:
//! ```sh
//! cargo run --example merge_pair -- original.png clean.png output.png
//! ```

use std::env;
use std::process;

use corner_merge::{MergeEngine, MergeOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <original> <clean> <output>", args[0]);
        process::exit(1);
    }

    let original = image::open(&args[1]).expect("failed to open original").to_rgba8();
    let clean = image::open(&args[2]).expect("failed to open clean variant").to_rgba8();

    let engine = MergeEngine::new(MergeOptions::scaled_corner());
    match engine.merge(&original, &clean, None) {
        Ok(merged) => {
            merged.save(&args[3]).expect("failed to save output");
            println!("Done: {}", args[3]);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
