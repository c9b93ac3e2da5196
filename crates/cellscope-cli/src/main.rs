//! cellscope: CLI driver for the cell analysis pipeline.
//!
//! Runs the full analysis on a given image file and prints the two
//! report blocks. This is the non-interactive stand-in for a
//! presentation layer: it parses the sample-type tag at the boundary,
//! surfaces pipeline errors on stderr, and leaves all domain logic to
//! `cellscope-pipeline`.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cellscope -- --sample-type blood <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use cellscope_pipeline::{Analyzer, SampleType, ThresholdTable};
use clap::Parser;

/// Cell analysis over a microscope photograph.
///
/// Locates cell-like regions, classifies them with sample-specific
/// threshold rules, and prints a technical listing plus a clinical
/// narrative. Optionally writes a color-coded annotated copy of the
/// input image.
#[derive(Parser)]
#[command(name = "cellscope", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Sample type the image was taken from ("blood" or "urine").
    #[arg(long)]
    sample_type: String,

    /// Full threshold table as a JSON string.
    ///
    /// When provided, replaces the default table wholesale. The JSON
    /// must be a valid `ThresholdTable` serialization.
    #[arg(long)]
    thresholds_json: Option<String>,

    /// Write the annotated image to this path.
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Print only the clinical narrative, skipping the technical
    /// listing.
    #[arg(long)]
    narrative_only: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let sample_type: SampleType = match cli.sample_type.parse() {
        Ok(tag) => tag,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let thresholds = match cli.thresholds_json.as_deref() {
        Some(json) => match serde_json::from_str::<ThresholdTable>(json) {
            Ok(table) => table,
            Err(e) => {
                eprintln!("Error parsing --thresholds-json: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ThresholdTable::default(),
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut analyzer = Analyzer::with_thresholds(thresholds);
    match analyzer.analyze_bytes(&image_bytes, sample_type) {
        Ok(result) => {
            eprintln!(
                "Analyzed {} ({} bytes): {} region(s) as {sample_type}",
                cli.image_path.display(),
                image_bytes.len(),
                result.len(),
            );
        }
        Err(e) => {
            eprintln!("Analysis error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match analyzer.generate_report() {
        Ok(report) => {
            if !cli.narrative_only {
                println!("{}", report.technical);
            }
            println!("{}", report.narrative);
        }
        Err(e) => {
            eprintln!("Report error: {e}");
            return ExitCode::FAILURE;
        }
    }

    if let Some(ref path) = cli.annotated {
        match analyzer.write_annotated(path) {
            Ok(()) => eprintln!("Annotated image written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
