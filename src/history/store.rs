use std::path::Path;
use thiserror::Error;

use super::types::{HistoryEntry, LinkedFileRecord, LinkedPath, NewHistoryEntry};

/// Error types for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare ledger storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("History entry {0} not found")]
    NotFound(i64),

    #[error("Invalid ledger row: {0}")]
    InvalidRow(String),
}

/// Persistent record of link operations, used for history and undo.
///
/// Implementations must serialize their own writes so that concurrent callers
/// cannot corrupt rows.
pub trait Ledger: Send + Sync {
    fn insert_history(&self, entry: &NewHistoryEntry) -> Result<i64, LedgerError>;

    fn insert_linked_file(
        &self,
        history_id: i64,
        dest_path: &Path,
        source_path: &Path,
    ) -> Result<(), LedgerError>;

    /// Newest entry, if any
    fn last_history_entry(&self) -> Result<Option<HistoryEntry>, LedgerError>;

    fn linked_files(&self, history_id: i64) -> Result<Vec<LinkedFileRecord>, LedgerError>;

    /// Delete an entry together with its linked-file rows
    fn delete_history(&self, id: i64) -> Result<(), LedgerError>;

    /// Newest first
    fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, LedgerError>;

    /// Record an entry and all of its files as one unit.
    ///
    /// The default runs the inserts one after another; stores with transactions
    /// should override it.
    fn record_link(
        &self,
        entry: &NewHistoryEntry,
        files: &[LinkedPath],
    ) -> Result<i64, LedgerError> {
        let id = self.insert_history(entry)?;
        for file in files {
            if let Err(e) = self.insert_linked_file(id, &file.dest_path, &file.source_path) {
                let _ = self.delete_history(id);
                return Err(e);
            }
        }
        Ok(id)
    }
}
