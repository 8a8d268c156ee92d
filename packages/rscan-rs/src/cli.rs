//! Command line arguments backing the `rscan` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "rscan",
  about = "A CLI tool for running receipt images through hosted OCR and entity-extraction models",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Run a receipt image through the OCR and extraction stages
  Scan {
    /// Path to the receipt image file
    image: PathBuf,

    /// Override the OCR model reference
    #[arg(long)]
    ocr_model: Option<String>,

    /// Override the extraction model reference
    #[arg(long)]
    extraction_model: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Only print the formatted receipt text
    #[arg(long, short = 'q')]
    quiet: bool,
  },
  /// Push a model directory to the hosting platform with bounded retries
  Deploy {
    /// Model directory containing the build manifest
    dir: PathBuf,

    /// Destination image reference (e.g. r8.im/whidge/deepseekocr)
    image_ref: String,

    /// Maximum number of push attempts
    #[arg(long, default_value = "3")]
    attempts: u32,

    /// Fixed delay between attempts, in seconds
    #[arg(long, default_value = "30")]
    delay_secs: u64,
  },
}
