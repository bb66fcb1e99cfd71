// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio command-line front end.
//
// Entry point. Initialises logging, loads the configuration, and runs one of
// the document operations against the local filesystem. Reports are printed
// to stdout as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folio_core::error::{FolioError, Result};
use folio_core::{CompressionTier, FolioConfig, OutputFormat};
use folio_document::{DocumentService, RasterImage};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Build PDFs from images, split PDFs into pages, and recompress PDFs", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "FOLIO_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble images into one PDF, one page per image
    Build {
        /// Input images, in page order
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Document name (defaults to the first image's file name)
        #[arg(long)]
        name: Option<String>,

        /// Author written into the document metadata
        #[arg(long, default_value = "")]
        author: String,

        /// Write "<name> (Copy).pdf" instead of overwriting
        #[arg(long)]
        copy: bool,
    },

    /// Write every page of a PDF as its own file
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Per-page output format (pdf or jpg)
        #[arg(long, default_value = "pdf")]
        format: OutputFormat,

        #[arg(long, default_value = "")]
        author: String,

        #[arg(long)]
        copy: bool,
    },

    /// Recompress PDFs by rasterising every page
    Compress {
        /// Input PDF files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Compression tier (none, low, medium, high)
        #[arg(long, default_value = "medium")]
        tier: CompressionTier,

        #[arg(long, default_value = "")]
        author: String,

        #[arg(long)]
        copy: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Operation failed");
            eprintln!("folio: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            FolioConfig::load(path)?
        }
        None => FolioConfig::default(),
    };
    let service = DocumentService::local(config);

    match cli.command {
        Commands::Build {
            images,
            output,
            name,
            author,
            copy,
        } => {
            let name = name.unwrap_or_else(|| default_name(&images));
            let decoded = images
                .iter()
                .map(|path| load_image(path))
                .collect::<Result<Vec<_>>>()?;
            let path = service.build_document_file(&name, &decoded, &author, &output, copy)?;
            print_json(&serde_json::json!({ "written": path }))
        }
        Commands::Split {
            input,
            output,
            format,
            author,
            copy,
        } => {
            let report = service
                .split_document(&input, &output, format, copy, &author)
                .await?;
            print_json(&report)
        }
        Commands::Compress {
            inputs,
            output,
            tier,
            author,
            copy,
        } => {
            let report = service
                .compress_documents(&inputs, &output, tier, copy, &author)
                .await?;
            print_json(&report)
        }
    }
}

fn load_image(path: &Path) -> Result<RasterImage> {
    let bytes = std::fs::read(path)
        .map_err(|err| FolioError::OpenFailure(format!("{}: {}", path.display(), err)))?;
    RasterImage::from_bytes(&bytes).map_err(|err| match err {
        FolioError::EncodeFailure(msg) => {
            FolioError::EncodeFailure(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

fn default_name(images: &[PathBuf]) -> String {
    images
        .first()
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Document".to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
