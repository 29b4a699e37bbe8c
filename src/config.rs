//! Runtime configuration resolved from the environment.

use std::env;
use std::path::PathBuf;

use crate::classifier::{VideoClassifier, DEFAULT_VIDEO_EXTENSIONS};
use crate::linker::LinkConfig;

/// Environment variable names
pub const ENV_DOWNLOAD_DIR: &str = "LA_DOWNLOAD_DIR";
pub const ENV_MEDIA_DIR: &str = "LA_MEDIA_DIR";
pub const ENV_MOVIES_DIR: &str = "LA_MOVIES_DIR";
pub const ENV_DATA_DIR: &str = "LA_DATA_DIR";
pub const ENV_VIDEO_EXTENSIONS: &str = "LA_VIDEO_EXTENSIONS";

pub const DEFAULT_DOWNLOAD_DIR: &str = "/data/downloads/complete/anime";
pub const DEFAULT_MEDIA_DIR: &str = "/data/media/anime";
pub const DEFAULT_MOVIES_DIR: &str = "/data/media/anime-movies";

const APP_DIR_NAME: &str = "link-anime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    pub media_dir: PathBuf,
    pub movies_dir: PathBuf,
    /// Where the history database lives
    pub data_dir: PathBuf,
    pub video_extensions: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            movies_dir: PathBuf::from(DEFAULT_MOVIES_DIR),
            data_dir: default_data_dir(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `LA_DOWNLOAD_DIR`: where completed downloads land
    /// - `LA_MEDIA_DIR`: series library root
    /// - `LA_MOVIES_DIR`: movie library root
    /// - `LA_DATA_DIR`: directory holding the history database
    /// - `LA_VIDEO_EXTENSIONS`: comma-separated list, e.g. `mkv,mp4`
    ///
    /// These can be set in a `.env` file in the working directory.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let video_extensions = get(ENV_VIDEO_EXTENSIONS)
            .map(|v| parse_extensions(&v))
            .filter(|exts| !exts.is_empty())
            .unwrap_or(defaults.video_extensions);

        Self {
            download_dir: get(ENV_DOWNLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            media_dir: get(ENV_MEDIA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            movies_dir: get(ENV_MOVIES_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.movies_dir),
            data_dir: get(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            video_extensions,
        }
    }

    pub fn classifier(&self) -> VideoClassifier {
        VideoClassifier::new(&self.video_extensions)
    }

    /// The engine-facing part of the configuration
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(&self.download_dir, &self.media_dir, &self.movies_dir)
            .with_classifier(self.classifier())
    }
}

fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./data"))
}
