//! Speech recognition backends.
//! The default backend runs faster-whisper in a Python subprocess and reads
//! its segments back as JSON.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace};
use wait_timeout::ChildExt;

/// Which language the recogniser should assume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// Let the model detect the spoken language.
    Auto,
    /// A fixed language code such as `pt` or `en`.
    Code(String),
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("language must not be empty");
        }
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            Ok(Self::Code(s.to_lowercase()))
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Code(code) => f.write_str(code),
        }
    }
}

/// One recognised stretch of speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// What the recogniser returned for one file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recognition {
    /// Detected (or forced) language.
    #[serde(default)]
    pub language: Option<String>,
    /// Confidence of the detected language, when the model reports one.
    #[serde(default)]
    pub language_probability: Option<f64>,
    pub segments: Vec<Segment>,
}

impl Recognition {
    /// All segment texts joined by single spaces, trimmed.
    pub fn transcript(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

/// Anything able to turn an audio or video file into text.
pub trait SpeechRecognizer {
    fn recognize(&self, path: &Path, language: &Language) -> Result<Recognition>;
}

/// Settings for the faster-whisper subprocess.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub python: String,
    pub model: String,
    pub device: String,
    pub compute_type: String,
    pub beam_size: u32,
    pub timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            python: std::env::var("TATAME_PYTHON")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "python3".to_string()),
            model: "large-v3".to_string(),
            device: "cuda".to_string(),
            compute_type: "float32".to_string(),
            beam_size: 5,
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

const SCRIPT: &str = r#"
import json
import os
from faster_whisper import WhisperModel

language = os.environ.get("WHISPER_LANGUAGE", "auto")
model = WhisperModel(
    os.environ["WHISPER_MODEL"],
    device=os.environ.get("WHISPER_DEVICE", "cpu"),
    compute_type=os.environ.get("WHISPER_COMPUTE_TYPE", "default"),
)
segments, info = model.transcribe(
    os.environ["WHISPER_AUDIO"],
    beam_size=int(os.environ.get("WHISPER_BEAM_SIZE", "5")),
    language=None if language == "auto" else language,
)
result = {
    "language": info.language,
    "language_probability": info.language_probability,
    "segments": [{"start": s.start, "end": s.end, "text": s.text} for s in segments],
}
print(json.dumps(result, ensure_ascii=False))
"#;

/// faster-whisper driven through `python -`, the script fed on stdin.
pub struct FasterWhisper {
    config: WhisperConfig,
}

impl FasterWhisper {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    fn command(&self, path: &Path, language: &Language) -> Command {
        let mut cmd = Command::new(&self.config.python);
        cmd.arg("-")
            .env("KMP_DUPLICATE_LIB_OK", "TRUE")
            .env("WHISPER_MODEL", &self.config.model)
            .env("WHISPER_DEVICE", &self.config.device)
            .env("WHISPER_COMPUTE_TYPE", &self.config.compute_type)
            .env("WHISPER_BEAM_SIZE", self.config.beam_size.to_string())
            .env("WHISPER_LANGUAGE", language.to_string())
            .env("WHISPER_AUDIO", path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl SpeechRecognizer for FasterWhisper {
    fn recognize(&self, path: &Path, language: &Language) -> Result<Recognition> {
        trace!("recognize path={} language={}", path.display(), language);
        let mut child = self
            .command(path, language)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.config.python))?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(SCRIPT.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err).context("failed to send script to faster-whisper");
            }
        }

        // The child blocks once a pipe buffer is full, so read both while waiting.
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| anyhow!("no stderr"))?;
        let out_reader = drain(stdout);
        let err_reader = drain(stderr);

        let status = match child.wait_timeout(self.config.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                bail!(
                    "faster-whisper timed out after {}s",
                    self.config.timeout.as_secs()
                );
            }
        };
        let out = out_reader
            .join()
            .map_err(|_| anyhow!("stdout reader panicked"))??;
        let err = err_reader.join().ok().and_then(|r| r.ok()).unwrap_or_default();
        if !status.success() {
            bail!("faster-whisper failed ({status}): {}", err.trim());
        }
        debug!("faster-whisper finished for {}", path.display());
        parse_output(&out)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<String>> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        pipe.read_to_string(&mut buf).map(|_| buf)
    })
}

/// Decode the JSON line printed by the recognition script.
pub fn parse_output(stdout: &str) -> Result<Recognition> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| anyhow!("faster-whisper produced no output"))?;
    serde_json::from_str(line.trim()).context("failed to parse faster-whisper output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_selection() {
        assert_eq!("auto".parse::<Language>().unwrap(), Language::Auto);
        assert_eq!("AUTO".parse::<Language>().unwrap(), Language::Auto);
        assert_eq!(
            "PT".parse::<Language>().unwrap(),
            Language::Code("pt".into())
        );
        assert!("  ".parse::<Language>().is_err());
        assert_eq!(Language::Code("en".into()).to_string(), "en");
    }

    #[test]
    fn joins_segments_with_single_spaces() {
        let rec = parse_output(
            r#"{"language":"pt","language_probability":0.98,"segments":[{"start":0.0,"end":1.0,"text":" Olá"},{"start":1.0,"end":2.0,"text":"tudo bem? "}]}"#,
        )
        .unwrap();
        assert_eq!(rec.language.as_deref(), Some("pt"));
        assert_eq!(rec.transcript(), "Olá tudo bem?");
    }

    #[test]
    fn takes_last_line_of_noisy_output() {
        let out = "loading model...\n{\"segments\":[]}\n\n";
        let rec = parse_output(out).unwrap();
        assert!(rec.segments.is_empty());
        assert_eq!(rec.language, None);
        assert_eq!(rec.transcript(), "");
    }

    #[test]
    fn rejects_garbage_output() {
        assert!(parse_output("").is_err());
        assert!(parse_output("Traceback (most recent call last)").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn interpreter_exiting_early_is_an_error() {
        // `true` quits without reading stdin, so the script write may hit a
        // closed pipe; either way the call must fail and not hang.
        let rec = FasterWhisper::new(WhisperConfig {
            python: "true".into(),
            timeout: Duration::from_secs(10),
            ..WhisperConfig::default()
        });
        assert!(rec.recognize(Path::new("a.wav"), &Language::Auto).is_err());
    }

    #[test]
    fn missing_interpreter_is_an_error() {
        let rec = FasterWhisper::new(WhisperConfig {
            python: "/nonexistent/python-for-tatame".into(),
            ..WhisperConfig::default()
        });
        assert!(rec
            .recognize(Path::new("a.wav"), &Language::Auto)
            .is_err());
    }
}
