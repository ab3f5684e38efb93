//! Append-only transcript logs and the dedup index rebuilt from them.
//!
//! Two sink files are kept side by side: a human-readable text log and a CSV
//! table. The CSV is the source of truth for which content hashes were
//! already transcribed; there is no separate index file.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Header of the CSV table (file name, path, hash, transcript).
pub const CSV_HEADER: [&str; 4] = ["arquivo", "caminho", "hash", "texto"];

const HASH_COLUMN: usize = 2;
const SEPARATOR: &str = "--------------------------------------------------------------";

/// One successfully transcribed file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub name: String,
    pub path: String,
    pub hash: String,
    pub text: String,
}

/// Where transcripts are written and where already-seen hashes come from.
pub trait TranscriptStore {
    /// Hashes of every file already recorded.
    fn processed_hashes(&self) -> Result<HashSet<String>>;
    /// Persist one record.
    fn append(&mut self, record: &TranscriptRecord) -> Result<()>;
}

/// Default sink paths for an input: `<stem>_transcricao.txt` and `.csv` in `out_dir`.
pub fn sink_paths(input: &Path, out_dir: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    (
        out_dir.join(format!("{stem}_transcricao.txt")),
        out_dir.join(format!("{stem}_transcricao.csv")),
    )
}

/// Read the hash column of every data row in the CSV at `path`.
/// A missing file means nothing was processed yet.
pub fn load_hashes(path: &Path) -> Result<HashSet<String>> {
    trace!("load_hashes path={}", path.display());
    let mut hashes = HashSet::new();
    if !path.exists() {
        return Ok(hashes);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for row in reader.records() {
        match row {
            Ok(row) => {
                if let Some(hash) = row.get(HASH_COLUMN) {
                    hashes.insert(hash.to_string());
                }
            }
            Err(err) => warn!("skipping unreadable row in {}: {}", path.display(), err),
        }
    }
    debug!("{} hashes already recorded in {}", hashes.len(), path.display());
    Ok(hashes)
}

/// The text log plus CSV table pair, both opened in append mode.
pub struct LogFiles {
    table_path: PathBuf,
    text: File,
    table: csv::Writer<File>,
}

impl LogFiles {
    /// Open (creating if needed) both sinks. The CSV header is written only
    /// when the table is empty, so a file never carries it twice.
    pub fn open(text_path: &Path, table_path: &Path) -> Result<Self> {
        let text = append(text_path)?;
        let table_file = append(table_path)?;
        let empty = table_file.metadata()?.len() == 0;
        let mut table = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(table_file);
        if empty {
            table.write_record(CSV_HEADER)?;
            table.flush()?;
        }
        Ok(Self {
            table_path: table_path.to_path_buf(),
            text,
            table,
        })
    }
}

fn append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Human-readable block written to the text log for one file.
pub fn text_entry(record: &TranscriptRecord) -> String {
    format!(
        "Nome do Arquivo: {}\nCaminho: {}\nHASH: {}\n{}\n\n{SEPARATOR}\n",
        record.name, record.path, record.hash, record.text
    )
}

impl TranscriptStore for LogFiles {
    fn processed_hashes(&self) -> Result<HashSet<String>> {
        load_hashes(&self.table_path)
    }

    fn append(&mut self, record: &TranscriptRecord) -> Result<()> {
        self.text.write_all(text_entry(record).as_bytes())?;
        self.text.flush()?;
        self.table.write_record([
            record.name.as_str(),
            record.path.as_str(),
            record.hash.as_str(),
            record.text.as_str(),
        ])?;
        self.table.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(hash: &str, text: &str) -> TranscriptRecord {
        TranscriptRecord {
            name: "a.wav".into(),
            path: "dir/a.wav".into(),
            hash: hash.into(),
            text: text.into(),
        }
    }

    #[test]
    fn names_sinks_after_input() {
        let (txt, csv) = sink_paths(Path::new("/data/case.ufdr"), Path::new("out"));
        assert_eq!(txt, Path::new("out/case_transcricao.txt"));
        assert_eq!(csv, Path::new("out/case_transcricao.csv"));
    }

    #[test]
    fn header_written_once_across_opens() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("t.txt");
        let csv = dir.path().join("t.csv");
        for i in 0..3 {
            let mut logs = LogFiles::open(&txt, &csv).unwrap();
            logs.append(&record(&format!("h{i}"), "olá, mundo")).unwrap();
        }
        let content = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "arquivo,caminho,hash,texto");
        assert_eq!(lines.iter().filter(|l| l.starts_with("arquivo,")).count(), 1);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "a.wav,dir/a.wav,h0,\"olá, mundo\"");
    }

    #[test]
    fn reads_back_recorded_hashes() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("t.txt");
        let csv = dir.path().join("t.csv");
        let mut logs = LogFiles::open(&txt, &csv).unwrap();
        assert!(logs.processed_hashes().unwrap().is_empty());
        logs.append(&record("abc", "multi\nline")).unwrap();
        logs.append(&record("def", "x")).unwrap();
        let hashes = logs.processed_hashes().unwrap();
        assert_eq!(hashes, HashSet::from(["abc".to_string(), "def".to_string()]));
    }

    #[test]
    fn short_rows_are_ignored() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("t.csv");
        fs::write(&csv, "arquivo,caminho,hash,texto\nonly,two\na,b,h1,t\n").unwrap();
        assert_eq!(load_hashes(&csv).unwrap(), HashSet::from(["h1".to_string()]));
        assert!(load_hashes(&dir.path().join("missing.csv")).unwrap().is_empty());
    }

    #[test]
    fn text_entry_layout() {
        let entry = text_entry(&record("abc", "oi"));
        assert_eq!(
            entry,
            format!("Nome do Arquivo: a.wav\nCaminho: dir/a.wav\nHASH: abc\noi\n\n{}\n", "-".repeat(62))
        );
    }
}
