use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::classifier::VideoClassifier;
use crate::history::LedgerError;

/// Kind of library a release is linked into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Series,
    Movie,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Series => "series",
            MediaType::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" | "tv" | "show" => Ok(MediaType::Series),
            "movie" | "film" => Ok(MediaType::Movie),
            other => Err(format!(
                "unknown media type '{}' (expected 'series' or 'movie')",
                other
            )),
        }
    }
}

/// Resolved filesystem roots the engine works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub download_dir: PathBuf,
    pub media_dir: PathBuf,
    pub movies_dir: PathBuf,
    pub classifier: VideoClassifier,
}

impl LinkConfig {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        media_dir: impl Into<PathBuf>,
        movies_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            media_dir: media_dir.into(),
            movies_dir: movies_dir.into(),
            classifier: VideoClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: VideoClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Whether `dir` is one of the library roots (never pruned)
    pub fn is_library_root(&self, dir: &Path) -> bool {
        dir == self.media_dir || dir == self.movies_dir
    }
}

/// One link invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    /// Name of the download (file or directory) relative to the download root
    pub source: String,

    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// Show or movie title used as the destination directory name
    pub name: String,

    /// Only meaningful for series
    #[serde(default)]
    pub season: u32,

    #[serde(default)]
    pub dry_run: bool,
}

impl LinkRequest {
    pub fn series(source: impl Into<String>, name: impl Into<String>, season: u32) -> Self {
        Self {
            source: source.into(),
            media_type: MediaType::Series,
            name: name.into(),
            season,
            dry_run: false,
        }
    }

    pub fn movie(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            media_type: MediaType::Movie,
            name: name.into(),
            season: 0,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.source.trim().is_empty() {
            return Err(LinkError::InvalidRequest("source is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(LinkError::InvalidRequest("name is required".to_string()));
        }
        Ok(())
    }

    /// Destination directory for a single-source link
    pub fn destination_dir(&self, config: &LinkConfig) -> PathBuf {
        match self.media_type {
            MediaType::Movie => config.movies_dir.join(&self.name),
            MediaType::Series => season_dir(&config.media_dir, &self.name, self.season),
        }
    }
}

/// `<media_dir>/<name>/Season <n>`
pub fn season_dir(media_dir: &Path, name: &str, season: u32) -> PathBuf {
    media_dir.join(name).join(format!("Season {}", season))
}

/// Per-file outcome of a link, undo or unlink step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Linked,
    Skipped,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Linked => "linked",
            FileStatus::Skipped => "skipped",
            FileStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one operation.
///
/// For undo and unlink `linked` counts removed files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    pub linked: usize,
    pub skipped: usize,
    pub failed: usize,

    #[serde(rename = "size")]
    pub total_bytes: u64,

    pub dest_dir: PathBuf,

    /// Destination paths of linked (or removed) files, in processing order
    pub files: Vec<PathBuf>,
}

impl LinkResult {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            ..Default::default()
        }
    }

    /// Count one file outcome; `path` is kept only for linked files
    pub fn record(&mut self, status: FileStatus, path: &Path, bytes: u64) {
        match status {
            FileStatus::Linked => {
                self.linked += 1;
                self.total_bytes += bytes;
                self.files.push(path.to_path_buf());
            }
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed => self.failed += 1,
        }
    }

    /// Add the counters and files of a sub-operation
    pub fn absorb(&mut self, other: LinkResult) {
        self.linked += other.linked;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.total_bytes += other.total_bytes;
        self.files.extend(other.files);
    }

    pub fn total(&self) -> usize {
        self.linked + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Error types for link, undo and unlink operations
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source not found: {name} (searched in {download_dir:?})")]
    SourceNotFound {
        name: String,
        download_dir: PathBuf,
    },

    #[error("Cannot read source {path:?}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot create destination directory {path:?}: {source}")]
    DestinationCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Season {season}: {source}")]
    SeasonFailed {
        season: u32,
        #[source]
        source: Box<LinkError>,
    },

    #[error("No history entries to undo")]
    NoHistoryToUndo,

    #[error("Target directory not found: {0:?}")]
    TargetNotFound(PathBuf),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl LinkError {
    /// The innermost error, unwrapping season failures
    pub fn root(&self) -> &LinkError {
        match self {
            LinkError::SeasonFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
