mod cli;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cli::{Args, Commands};
use rscan_infer::{OcrInput, ReplicateClient, ReplicateConfig};
use rscan_rs::deploy::{cog_push, push_with_retry, RetryPolicy};
use rscan_rs::pipeline::{image_size, Pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let args = Args::parse();

  let result = match args.command {
    Commands::Version => {
      println!("rscan {}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Commands::Scan {
      image,
      ocr_model,
      extraction_model,
      json,
      quiet,
    } => scan(image, ocr_model, extraction_model, json, quiet).await,
    Commands::Deploy {
      dir,
      image_ref,
      attempts,
      delay_secs,
    } => deploy(dir, image_ref, attempts, delay_secs).await,
  };

  if let Err(e) = result {
    eprintln!("Error: {e}");
    std::process::exit(1);
  }
}

async fn scan(
  image: PathBuf,
  ocr_model: Option<String>,
  extraction_model: Option<String>,
  json: bool,
  quiet: bool,
) -> anyhow::Result<()> {
  let mut config = ReplicateConfig::from_env()?;
  if let Some(model) = ocr_model {
    config.ocr_model = model;
  }
  if let Some(model) = extraction_model {
    config.extraction_model = model;
  }

  let client = ReplicateClient::new(config)?;
  let input = OcrInput::FilePath(image.clone());
  let dimensions = image_size(&input)?;

  if !quiet {
    println!("Processing receipt: {}", image.display());
  }

  let mut pipeline = Pipeline::new(&client, &client);
  let result = pipeline.run(&input, dimensions).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&result)?);
    return Ok(());
  }

  if !quiet {
    println!("\n==================================================");
    println!("EXTRACTED INFORMATION");
    println!("==================================================\n");
  }
  println!("{}", result.formatted_text);
  if !quiet {
    println!("\nEntities:");
    for (label, values) in result.entities.iter() {
      println!("  {label}: {values:?}");
    }
  }
  Ok(())
}

async fn deploy(
  dir: PathBuf,
  image_ref: String,
  attempts: u32,
  delay_secs: u64,
) -> anyhow::Result<()> {
  let policy = RetryPolicy {
    attempts: attempts.max(1),
    delay: Duration::from_secs(delay_secs),
  };
  let total = policy.attempts;
  println!("Pushing {} from {}", image_ref, dir.display());

  let used = push_with_retry(&policy, |attempt| {
    let dir = dir.clone();
    let image_ref = image_ref.clone();
    async move {
      println!("Push attempt {attempt} of {total}...");
      cog_push(&dir, &image_ref).await
    }
  })
  .await?;

  println!("Push succeeded after {used} attempt(s)");
  Ok(())
}
