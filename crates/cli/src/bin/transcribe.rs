//! Transcribe audio and video found in a file, directory or zip/ufdr archive.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tatame_core::ledger::{sink_paths, LogFiles};
use tatame_core::media::Locator;
use tatame_core::speech::{FasterWhisper, Language, WhisperConfig};
use tatame_core::transcribe::transcribe_all;
use tracing::info;

/// Command line options for the transcriber.
#[derive(Parser)]
#[command(
    name = "tatame-transcribe",
    about = "Transcribe audio/video from a file, directory or ZIP/UFDR archive into TXT and CSV logs"
)]
struct Cli {
    /// Language code to transcribe with, or `auto` to detect it per file.
    #[arg(long, default_value = "pt")]
    language: Language,

    /// Directory receiving the `_transcricao.txt` and `.csv` logs.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// faster-whisper model name or path.
    #[arg(long, default_value = "large-v3")]
    model: String,

    /// Inference device passed to faster-whisper.
    #[arg(long, default_value = "cuda")]
    device: String,

    /// Compute type passed to faster-whisper.
    #[arg(long, default_value = "float32")]
    compute_type: String,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,

    /// Audio or video file, directory, or .zip/.ufdr archive.
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tatame::init_logging("tatame_transcribe", cli.debug)?;

    let recognizer = FasterWhisper::new(WhisperConfig {
        model: cli.model,
        device: cli.device,
        compute_type: cli.compute_type,
        ..WhisperConfig::default()
    });

    let scratch = tempfile::Builder::new()
        .prefix("tatame-")
        .tempdir()
        .context("creating scratch directory")?;
    let files = Locator::new(scratch.path()).locate(&cli.input);

    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let (text_path, table_path) = sink_paths(&cli.input, &cli.output_dir);
    let mut logs = LogFiles::open(&text_path, &table_path)?;
    let summary = transcribe_all(&files, &recognizer, &cli.language, &mut logs)?;
    info!(
        "done: {} transcribed, {} skipped, {} failed; logs in {} and {}",
        summary.transcribed,
        summary.skipped,
        summary.failed,
        text_path.display(),
        table_path.display()
    );
    scratch.close().context("removing scratch directory")?;
    Ok(())
}
