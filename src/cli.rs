use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::linker::{LinkRequest, MediaType};

#[derive(Parser, Debug)]
#[command(name = "link-anime")]
#[command(author, version, long_about = None)]
#[command(about = "Hardlink downloaded anime releases into a media library, with undo")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub dirs: DirArgs,
}

/// Directory overrides; each falls back to its environment variable
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct DirArgs {
    /// Directory containing completed downloads [env: LA_DOWNLOAD_DIR]
    #[arg(long, value_name = "DIR", global = true)]
    pub download_dir: Option<PathBuf>,

    /// Series library root [env: LA_MEDIA_DIR]
    #[arg(long, value_name = "DIR", global = true)]
    pub media_dir: Option<PathBuf>,

    /// Movie library root [env: LA_MOVIES_DIR]
    #[arg(long, value_name = "DIR", global = true)]
    pub movies_dir: Option<PathBuf>,

    /// Directory holding the history database [env: LA_DATA_DIR]
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

impl DirArgs {
    /// Apply the flags on top of an environment-derived configuration
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(dir) = &self.media_dir {
            config.media_dir = dir.clone();
        }
        if let Some(dir) = &self.movies_dir {
            config.movies_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a release name into show name and season
    Parse {
        /// Release folder or file name
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Hardlink a download into the library
    Link(LinkArgs),

    /// Show what `link` would do without changing anything
    Preview(LinkArgs),

    /// Revert the most recent link operation
    Undo {
        /// Only show what would be removed
        #[arg(short, long)]
        dry: bool,
    },

    /// List recent link operations, newest first
    History {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Remove every video file below a library directory
    Unlink {
        /// Library directory to clean
        target: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LinkArgs {
    /// Download name, relative to the download directory
    pub source: String,

    /// Destination name; parsed from the source when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Link as a movie instead of a series
    #[arg(long)]
    pub movie: bool,

    /// Season number; parsed from the source when omitted, else 1
    #[arg(short, long)]
    pub season: Option<u32>,

    /// Simulate changes without modifying the filesystem
    #[arg(short, long)]
    pub dry: bool,
}

impl LinkArgs {
    /// Build a request, filling name and season from the parsed source
    pub fn to_request(&self) -> Result<LinkRequest, AppError> {
        let parsed = crate::parser::parse_release_name(&self.source);
        let name = match &self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::InvalidArguments(
                    "--name must not be empty".to_string(),
                ));
            }
            Some(name) => name.clone(),
            None if parsed.has_name() => parsed.name,
            None => {
                return Err(AppError::InvalidArguments(format!(
                    "Cannot derive a name from {:?}; pass --name",
                    self.source
                )));
            }
        };

        let media_type = if self.movie {
            MediaType::Movie
        } else {
            MediaType::Series
        };

        let season = match media_type {
            MediaType::Series => self.season.or(parsed.season).unwrap_or(1),
            MediaType::Movie => 0,
        };

        Ok(LinkRequest {
            source: self.source.clone(),
            media_type,
            name,
            season,
            dry_run: self.dry,
        })
    }
}
