//! Transcription run: hash, skip what is already logged, recognise the rest
//! and append each result to the store.

use crate::hash::file_sha256;
use crate::ledger::{TranscriptRecord, TranscriptStore};
use crate::media::MediaFile;
use crate::speech::{Language, SpeechRecognizer};
use anyhow::Result;
use tracing::{error, info, warn};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub transcribed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Transcribe every file in `files` that the store has not seen yet.
///
/// The set of known hashes is read once before the loop. A recogniser error
/// or an empty transcript leaves the file unrecorded, so the next run tries
/// it again. Store write errors abort the run.
pub fn transcribe_all<R, S>(
    files: &[MediaFile],
    recognizer: &R,
    language: &Language,
    store: &mut S,
) -> Result<RunSummary>
where
    R: SpeechRecognizer,
    S: TranscriptStore,
{
    let seen = store.processed_hashes()?;
    let mut summary = RunSummary::default();
    for file in files {
        let hash = match file_sha256(&file.path) {
            Ok(h) => h,
            Err(err) => {
                error!("could not hash {}: {:#}", file.path.display(), err);
                summary.failed += 1;
                continue;
            }
        };
        if seen.contains(&hash) {
            info!("{} already processed, skipping", file.path.display());
            summary.skipped += 1;
            continue;
        }

        info!("transcribing {}", file.path.display());
        let text = match recognizer.recognize(&file.path, language) {
            Ok(rec) => {
                match language {
                    Language::Auto => info!(
                        "detected language '{}' with probability {:.6}",
                        rec.language.as_deref().unwrap_or("unknown"),
                        rec.language_probability.unwrap_or_default()
                    ),
                    Language::Code(code) => info!("transcribed using language {code}"),
                }
                rec.transcript()
            }
            Err(err) => {
                error!("error transcribing {}: {:#}", file.path.display(), err);
                summary.failed += 1;
                continue;
            }
        };
        if text.is_empty() {
            warn!("no speech found in {}", file.path.display());
            summary.failed += 1;
            continue;
        }

        store.append(&TranscriptRecord {
            name: file.name.clone(),
            path: file.log_path.display().to_string(),
            hash,
            text,
        })?;
        summary.transcribed += 1;
    }
    Ok(summary)
}
