//! Embed CLI
//!
//! Generates PDFs from template jobs and converts files to and from data
//! URLs. Logs go to stderr so stdout can carry a data URL.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use embed_core::{codec, GenerateJob};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "embed-cli")]
#[command(version, about = "Embed images and PDF pages into PDF templates")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a PDF from a `{ template, inputs }` JSON job
    Generate {
        /// Job file
        #[arg(short, long)]
        job: PathBuf,

        /// Output PDF
        #[arg(short, long, default_value = "out.pdf")]
        out: PathBuf,
    },
    /// Print a file as a `data:application/pdf;base64,` URL
    Encode {
        file: PathBuf,
    },
    /// Write the bytes behind a data URL (read from a file) to disk
    Decode {
        file: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Generate { job, out } => {
            let size = generate_file(&job, &out)?;
            tracing::info!("Wrote {} ({} bytes)", out.display(), size);
        }
        Command::Encode { file } => {
            println!("{}", encode_file(&file)?);
        }
        Command::Decode { file, out } => {
            let size = decode_file(&file, &out)?;
            tracing::info!("Wrote {} ({} bytes)", out.display(), size);
        }
    }

    Ok(())
}

fn generate_file(job_path: &Path, out: &Path) -> Result<usize> {
    let json = fs::read_to_string(job_path)
        .with_context(|| format!("Failed to read job {}", job_path.display()))?;
    let job = GenerateJob::from_json(&json)
        .with_context(|| format!("Invalid job {}", job_path.display()))?;

    let bytes = job.run().context("Generation failed")?;
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(bytes.len())
}

fn encode_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(codec::encode(Some(bytes.as_slice())))
}

fn decode_file(path: &Path, out: &Path) -> Result<usize> {
    let data_url = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data_url = data_url.trim();
    if data_url.is_empty() {
        bail!("{} is empty", path.display());
    }

    let bytes = codec::decode(data_url).context("Invalid data URL")?;
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(bytes.len())
}
