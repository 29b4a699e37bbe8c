//! Hardlink placement, undo and unlink.

mod engine;
mod types;
mod undo;

pub use engine::{link_file, resolve_source, LinkEngine};
pub use types::{
    season_dir, FileStatus, LinkConfig, LinkError, LinkRequest, LinkResult, MediaType,
};
pub use undo::{prune_empty_dirs, unlink};
