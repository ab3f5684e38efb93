//! Translation orchestration utilities.
//! This module wires subtitle parsing, model calls, output cleanup and writing.

use crate::srt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info, trace};

pub mod openai;

/// Pause after every block so we stay under the provider's rate limit.
pub const DEFAULT_BLOCK_DELAY: Duration = Duration::from_millis(1200);

/// Fixed English to Brazilian Portuguese terms the model must use.
pub const GLOSSARY: &[(&str, &str)] = &[
    ("half guard", "meia guarda"),
    ("Belt", "faixa"),
    ("sweep", "raspar ou raspagem (depende do contexto)"),
    ("side control", "cem quilo"),
    ("hip scape", "fuga de quadril"),
    ("z-guard", "meia escudo"),
];

/// Translates a single piece of subtitle text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Return the model's raw answer for `text`.
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Knobs for a subtitle translation run.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Sleep applied after every block, whether the call succeeded or not.
    pub delay: Duration,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_BLOCK_DELAY,
        }
    }
}

/// Remove the introductions the model sometimes puts before the translation.
pub fn clean(raw: &str) -> String {
    static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^(claro,?\s*)?(aqui está a tradução.*?:|# legenda traduzida:)")
            .expect("valid regex")
    });
    PREAMBLE_RE.replace(raw, "").trim().to_string()
}

/// Translate every block of `blocks` in order, one request at a time.
/// A failed request keeps the original text for that block; the run goes on.
pub async fn translate_blocks<T: Translator>(
    blocks: Vec<srt::SrtBlock>,
    translator: &T,
    options: &TranslateOptions,
) -> Vec<srt::SrtBlock> {
    let mut out = Vec::with_capacity(blocks.len());
    for mut block in blocks {
        let text = block.flat_text();
        info!("block {}: {}", block.index, text);
        block.text = match translator.translate(&text).await {
            Ok(raw) => {
                let translated = clean(&raw);
                info!("translated block {}: {}", block.index, translated);
                translated
            }
            Err(err) => {
                error!("translation failed for block {}: {:#}", block.index, err);
                text
            }
        };
        out.push(block);
        tokio::time::sleep(options.delay).await;
    }
    out
}

/// Read the SRT at `input`, translate it and write the result to `output`.
/// The output file is replaced, never appended to.
pub async fn process_file<T: Translator>(
    input: &Path,
    output: &Path,
    translator: &T,
    options: &TranslateOptions,
) -> Result<()> {
    trace!("process_file input={} output={}", input.display(), output.display());
    let content = fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let blocks = srt::parse(&content);
    info!("{} blocks found in {}", blocks.len(), input.display());

    let translated = translate_blocks(blocks, translator, options).await;

    fs::write(output, srt::format(&translated))
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}
