use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::engine::LinkEngine;
use super::types::{FileStatus, LinkConfig, LinkError, LinkResult};
use crate::history::{HistoryEntry, LinkedFileRecord};

impl<'a> LinkEngine<'a> {
    /// Newest history entries first
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, LinkError> {
        Ok(self.ledger().list_history(limit)?)
    }

    /// Reverse the newest link operation.
    ///
    /// Removes exactly the files recorded for that entry, prunes directories
    /// left empty (never the library roots) and deletes the entry.
    pub fn undo(&self, config: &LinkConfig) -> Result<(LinkResult, HistoryEntry), LinkError> {
        let (entry, records) = self.last_operation()?;
        info!(history_id = entry.id, "Undoing {}", entry.describe());

        let mut result = LinkResult::new(&entry.dest_dir);
        let mut parents = BTreeSet::new();

        for record in &records {
            let path = &record.dest_path;
            let size = match path.symlink_metadata() {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = ?path, "Already removed");
                    result.record(FileStatus::Skipped, path, 0);
                    continue;
                }
                Err(_) => 0,
            };

            match fs::remove_file(path) {
                Ok(()) => {
                    result.record(FileStatus::Linked, path, size);
                    if let Some(parent) = path.parent() {
                        parents.insert(parent.to_path_buf());
                    }
                }
                Err(e) => {
                    warn!("Failed to remove {:?}: {}", path, e);
                    result.record(FileStatus::Failed, path, 0);
                }
            }
        }

        match entry.library_root() {
            Some(root) => {
                for dir in &parents {
                    prune_upwards(dir, root, config);
                }
            }
            None => debug!(dest = ?entry.dest_dir, "No library root for entry, not pruning"),
        }

        self.ledger().delete_history(entry.id)?;

        info!(
            removed = result.linked,
            skipped = result.skipped,
            failed = result.failed,
            "Undo complete"
        );

        Ok((result, entry))
    }

    /// What `undo` would do right now, without touching anything
    pub fn undo_preview(&self) -> Result<(LinkResult, HistoryEntry), LinkError> {
        let (entry, records) = self.last_operation()?;
        let mut result = LinkResult::new(&entry.dest_dir);

        for record in &records {
            match record.dest_path.symlink_metadata() {
                Ok(meta) => result.record(FileStatus::Linked, &record.dest_path, meta.len()),
                Err(_) => result.record(FileStatus::Skipped, &record.dest_path, 0),
            }
        }

        Ok((result, entry))
    }

    fn last_operation(&self) -> Result<(HistoryEntry, Vec<LinkedFileRecord>), LinkError> {
        let entry = self
            .ledger()
            .last_history_entry()?
            .ok_or(LinkError::NoHistoryToUndo)?;
        let records = self.ledger().linked_files(entry.id)?;
        Ok((entry, records))
    }
}

/// Remove every video file below `target`, then prune empty directories.
///
/// Works from the filesystem alone; the ledger is not consulted or updated.
pub fn unlink(target: &Path, config: &LinkConfig) -> Result<LinkResult, LinkError> {
    if !target.is_dir() {
        return Err(LinkError::TargetNotFound(target.to_path_buf()));
    }

    info!(target = ?target, "Unlinking");
    let mut result = LinkResult::new(target);

    let videos: Vec<PathBuf> = WalkDir::new(target)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && config.classifier.is_video(e.path()))
        .map(|e| e.into_path())
        .collect();

    for path in &videos {
        let size = path.metadata().map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(path) {
            Ok(()) => result.record(FileStatus::Linked, path, size),
            Err(e) => {
                warn!("Failed to remove {:?}: {}", path, e);
                result.record(FileStatus::Failed, path, 0);
            }
        }
    }

    prune_dirs(target, &|dir| config.is_library_root(dir));

    info!(removed = result.linked, failed = result.failed, "Unlink complete");

    Ok(result)
}

/// Remove `dir` and its subdirectories bottom-up when they are empty.
///
/// Returns true if `dir` itself was removed.
pub fn prune_empty_dirs(dir: &Path) -> bool {
    prune_dirs(dir, &|_| false)
}

fn prune_dirs(dir: &Path, keep: &dyn Fn(&Path) -> bool) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten() {
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            prune_dirs(&entry.path(), keep);
        }
    }

    if keep(dir) || !is_empty_dir(dir) {
        return false;
    }

    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!(dir = ?dir, "Removed empty directory");
            true
        }
        Err(e) => {
            debug!(dir = ?dir, error = %e, "Could not remove directory");
            false
        }
    }
}

/// Prune `dir`, then keep removing empty ancestors until `root`, a configured
/// library root or a non-empty directory is reached.
///
/// Only directories strictly below `root` are ever removed.
fn prune_upwards(dir: &Path, root: &Path, config: &LinkConfig) {
    let keep = |d: &Path| d == root || !d.starts_with(root) || config.is_library_root(d);
    if keep(dir) || !prune_dirs(dir, &keep) {
        return;
    }

    let mut current = dir.parent();
    while let Some(parent) = current {
        if keep(parent) || !is_empty_dir(parent) {
            break;
        }
        if fs::remove_dir(parent).is_err() {
            break;
        }
        debug!(dir = ?parent, "Removed empty directory");
        current = parent.parent();
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}
