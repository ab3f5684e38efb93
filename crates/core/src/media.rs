//! Finding the audio and video files behind an input path.
//! The input can be a single media file, a directory tree or a zip-based
//! archive whose media members get extracted to a scratch directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Audio suffixes recognised by default.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "opus", "aac"];
/// Video suffixes recognised by default.
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mkv", "mov"];
/// Containers we open and search for media. UFDR reports are zip files.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "ufdr"];

/// A media file ready to be hashed and transcribed.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    /// Where the bytes live on disk (inside the scratch dir for archive members).
    pub path: PathBuf,
    /// File name shown in the logs.
    pub name: String,
    /// Path recorded in the logs.
    pub log_path: PathBuf,
}

impl MediaFile {
    /// A file found on disk, logged relative to `base` when both share a root.
    pub fn on_disk(path: &Path, base: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: file_name(path),
            log_path: relative_to(path, base),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `path` relative to `base` when both live under the same root (drive on
/// Windows), otherwise the absolute path.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let base = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
    if abs.components().next() != base.components().next() {
        return abs;
    }
    pathdiff::diff_paths(&abs, &base).unwrap_or(abs)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Resolves an input path into the list of media files to process.
pub struct Locator {
    extensions: Vec<String>,
    scratch: PathBuf,
}

impl Locator {
    /// Locator using the default audio and video suffixes, extracting
    /// archive members under `scratch`.
    pub fn new(scratch: impl Into<PathBuf>) -> Self {
        let extensions = AUDIO_EXTENSIONS
            .iter()
            .chain(VIDEO_EXTENSIONS)
            .map(|e| e.to_string())
            .collect();
        Self {
            extensions,
            scratch: scratch.into(),
        }
    }

    /// Replace the recognised media suffixes (without the leading dot).
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn is_media(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }

    fn is_archive(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| ARCHIVE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Every media file reachable from `input`. Problems are logged and
    /// yield an empty or partial list instead of an error.
    pub fn locate(&self, input: &Path) -> Vec<MediaFile> {
        trace!("locate input={}", input.display());
        let base = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let found = if input.is_file() {
            if self.is_media(input) {
                vec![MediaFile::on_disk(input, base)]
            } else if Self::is_archive(input) {
                self.extract_archive(input)
            } else {
                warn!("{} is neither a media file nor a supported archive", input.display());
                Vec::new()
            }
        } else if input.is_dir() {
            self.walk(input, base)
        } else {
            error!(
                "invalid input {}: expected an audio or video file, a zip/ufdr archive or a directory",
                input.display()
            );
            Vec::new()
        };
        info!("{} media files found in {}", found.len(), input.display());
        found
    }

    fn walk(&self, dir: &Path, base: &Path) -> Vec<MediaFile> {
        let mut found = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_media(entry.path()) {
                found.push(MediaFile::on_disk(entry.path(), base));
            }
        }
        found
    }

    fn extract_archive(&self, archive: &Path) -> Vec<MediaFile> {
        let mut found = Vec::new();
        if let Err(err) = self.extract_into(archive, &mut found) {
            error!("failed to process archive {}: {:#}", archive.display(), err);
        }
        found
    }

    /// Extract matching members one by one; members already pushed to
    /// `found` stay there when a later one fails.
    fn extract_into(&self, archive: &Path, found: &mut Vec<MediaFile>) -> Result<()> {
        let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
        let mut zip = ZipArchive::new(file).context("not a valid zip archive")?;
        let label = file_name(archive);
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() || !self.is_media(Path::new(entry.name())) {
                continue;
            }
            let Some(rel) = entry.enclosed_name() else {
                warn!("skipping archive member with unsafe path {}", entry.name());
                continue;
            };
            let dest = self.scratch.join(&rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)?;
            io::copy(&mut entry, &mut out)?;
            debug!("extracted {} to {}", entry.name(), dest.display());
            found.push(MediaFile {
                name: file_name(&dest),
                log_path: Path::new(&label).join(&rel),
                path: dest,
            });
        }
        Ok(())
    }
}
