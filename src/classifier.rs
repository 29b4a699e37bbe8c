use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avi"];

// "Season 2", "season02", "S01", "s1" (whole name only)
static SEASON_DIR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:season\s*0*(\d+)|s0*(\d+))$").unwrap());

/// Season number -> season directory, ordered by season
pub type SeasonDirMap = BTreeMap<u32, PathBuf>;

/// Recognizes video files by extension (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoClassifier {
    extensions: Vec<String>,
}

impl Default for VideoClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_EXTENSIONS)
    }
}

impl VideoClassifier {
    /// Build from a list of extensions; a leading dot is accepted and ignored
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_video(&self, filename: impl AsRef<Path>) -> bool {
        filename
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// Season number encoded in a directory name such as `Season 2` or `S02`
pub fn season_number_of(dirname: &str) -> Option<u32> {
    let caps = SEASON_DIR_REGEX.captures(dirname.trim())?;
    let digits = caps.get(1).or_else(|| caps.get(2))?;
    digits.as_str().parse().ok()
}

/// Scan the immediate subdirectories of `path` for season directories.
///
/// A missing or unreadable path yields an empty map.
pub fn find_season_dirs(path: &Path) -> SeasonDirMap {
    let mut seasons = SeasonDirMap::new();

    let read_dir = match fs::read_dir(path) {
        Ok(rd) => rd,
        Err(e) => {
            debug!(path = ?path, error = %e, "Cannot read directory for season scan");
            return seasons;
        }
    };

    for entry in read_dir.flatten() {
        let entry_path = entry.path();
        if !entry_path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(number) = season_number_of(&name) {
            trace!(season = number, dir = %name, "Found season directory");
            seasons.insert(number, entry_path);
        }
    }

    debug!(path = ?path, count = seasons.len(), "Season scan complete");

    seasons
}

/// Video files directly inside `dir`, sorted by file name
pub fn list_video_files(dir: &Path, classifier: &VideoClassifier) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            continue;
        }

        if !classifier.is_video(&path) {
            trace!(path = ?path, "Skipping non-video file");
            continue;
        }

        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}
