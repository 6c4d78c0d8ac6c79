//! # rank-sheet CLI
//!
//! Usage:
//!   rank-sheet request.json -o yellow-belt.pdf
//!   echo '{ ... }' | rank-sheet -o output.pdf
//!   rank-sheet --example > request.json

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Render a rank curriculum sheet to PDF
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sheet request JSON. Read from stdin when omitted.
    input: Option<PathBuf>,

    /// Where to write the PDF
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// Print a sample request and exit
    #[arg(long)]
    example: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if args.example {
        print!("{}", example_request_json());
        return Ok(());
    }

    let input = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let pdf_bytes = rank_sheet::render_json(&input).context("Failed to render sheet")?;
    fs::write(&args.output, &pdf_bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(bytes = pdf_bytes.len(), output = %args.output.display(), "wrote sheet");
    eprintln!(
        "✓ Written {} bytes to {}",
        pdf_bytes.len(),
        args.output.display()
    );
    Ok(())
}

fn example_request_json() -> &'static str {
    r##"{
  "styleName": "Kenpo",
  "rankName": "Yellow Belt",
  "themeColor": "#F2C94C",
  "date": "2026-02-14",
  "gym": {
    "name": "Tiger Martial Arts",
    "address": "123 Main St",
    "city": "Springfield",
    "state": "IL",
    "zipCode": "62701",
    "phone": "2175550123",
    "email": "info@tigermartialarts.com",
    "website": "www.tigermartialarts.com"
  },
  "categories": [
    {
      "name": "Terminology",
      "description": "Know these before testing",
      "items": [
        {
          "name": "Dojo",
          "kind": "knowledge",
          "description": "The **training hall**. Bow when entering and leaving."
        },
        {
          "name": "Kiai",
          "kind": "knowledge",
          "description": "A short shout used to focus energy.",
          "videoUrl": "https://example.com/videos/kiai"
        }
      ]
    },
    {
      "name": "Kicks",
      "items": [
        { "name": "Front kick", "sets": 3, "reps": 10, "timeLimit": "30", "timeLimitOperator": "lte", "videoUrl": "https://example.com/videos/front-kick" },
        { "name": "Side kick", "sets": 3, "reps": 10 },
        { "name": "Roundhouse kick", "reps": 20 }
      ]
    },
    {
      "name": "Blocks",
      "items": [
        { "name": "High block" },
        { "name": "Low block" },
        { "name": "Inward block", "description": "Both sides" }
      ]
    },
    {
      "name": "Conditioning",
      "items": [
        { "name": "Push-ups", "reps": 25, "timeLimit": 60, "timeLimitOperator": "lte" },
        { "name": "Plank", "duration": "1 min" },
        { "name": "Run", "distance": "1 mile", "timeLimit": "10 min", "timeLimitOperator": "lt" }
      ]
    }
  ]
}
"##
}
