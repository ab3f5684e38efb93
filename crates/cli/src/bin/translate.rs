//! Translate an English SRT file to Brazilian Portuguese, block by block.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tatame_core::translate::openai::{OpenAiConfig, OpenAiTranslator};
use tatame_core::translate::{process_file, TranslateOptions};

/// Command line options for the translator.
#[derive(Parser)]
#[command(
    name = "tatame-translate",
    about = "Translate an .srt file from English to Brazilian Portuguese using Jiu-Jitsu vocabulary"
)]
struct Cli {
    /// Override the chat model (defaults to OPENAI_MODEL or gpt-4o).
    #[arg(long)]
    model: Option<String>,

    /// Enable verbose debug and trace logs.
    #[arg(long)]
    debug: bool,

    /// English .srt file to read.
    input: PathBuf,

    /// Translated .srt file to write.
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tatame::init_logging("tatame_translate", cli.debug)?;

    let mut config = OpenAiConfig::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    let translator = OpenAiTranslator::new(config);
    process_file(&cli.input, &cli.output, &translator, &TranslateOptions::default()).await
}
