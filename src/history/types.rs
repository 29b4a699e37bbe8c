use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::linker::MediaType;

/// A persisted link operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Generated, increases with every insert
    pub id: i64,

    /// When the operation was recorded
    pub timestamp: DateTime<Utc>,

    pub media_type: MediaType,

    pub show_name: String,

    /// Present for series only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,

    /// Number of linked files recorded under this entry
    pub file_count: usize,

    #[serde(rename = "totalSize")]
    pub total_bytes: u64,

    #[serde(rename = "destPath")]
    pub dest_dir: PathBuf,

    /// Base name of the download the files came from
    #[serde(rename = "source")]
    pub source_label: String,
}

/// Insert payload for a history entry; id and timestamp are assigned by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub media_type: MediaType,
    pub show_name: String,
    pub season: Option<u32>,
    pub file_count: usize,
    pub total_bytes: u64,
    pub dest_dir: PathBuf,
    pub source_label: String,
}

impl NewHistoryEntry {
    pub fn into_entry(self, id: i64, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id,
            timestamp,
            media_type: self.media_type,
            show_name: self.show_name,
            season: self.season,
            file_count: self.file_count,
            total_bytes: self.total_bytes,
            dest_dir: self.dest_dir,
            source_label: self.source_label,
        }
    }
}

/// A single hardlink created under a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedFileRecord {
    pub id: i64,
    pub history_id: i64,
    #[serde(rename = "filePath")]
    pub dest_path: PathBuf,
    pub source_path: PathBuf,
}

/// Destination/source pair of a file linked during an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedPath {
    pub dest_path: PathBuf,
    pub source_path: PathBuf,
}

impl LinkedPath {
    pub fn new(dest_path: impl Into<PathBuf>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            dest_path: dest_path.into(),
            source_path: source_path.into(),
        }
    }
}

impl HistoryEntry {
    /// Short human label: "Show - Season 2" or "Movie (movie)"
    pub fn describe(&self) -> String {
        match (self.media_type, self.season) {
            (MediaType::Series, Some(season)) => format!("{} - Season {}", self.show_name, season),
            (MediaType::Series, None) => self.show_name.clone(),
            (MediaType::Movie, _) => format!("{} (movie)", self.show_name),
        }
    }

    /// Library root the entry was linked under, derived from its destination:
    /// `<root>/<name>` for movies, `<root>/<name>/Season <n>` for series.
    pub fn library_root(&self) -> Option<&Path> {
        let name_dir = match self.media_type {
            MediaType::Movie => self.dest_dir.as_path(),
            MediaType::Series => self.dest_dir.parent()?,
        };
        name_dir.parent().filter(|root| !root.as_os_str().is_empty())
    }
}
