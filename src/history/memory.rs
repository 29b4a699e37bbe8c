use chrono::Utc;
use parking_lot::Mutex;
use std::path::Path;

use super::store::{Ledger, LedgerError};
use super::types::{HistoryEntry, LinkedFileRecord, LinkedPath, NewHistoryEntry};

/// Non-persistent ledger kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_history_id: i64,
    last_file_id: i64,
    entries: Vec<HistoryEntry>,
    files: Vec<LinkedFileRecord>,
}

impl MemoryState {
    fn insert_history(&mut self, entry: &NewHistoryEntry) -> i64 {
        self.last_history_id += 1;
        let id = self.last_history_id;
        self.entries.push(entry.clone().into_entry(id, Utc::now()));
        id
    }

    fn insert_linked_file(
        &mut self,
        history_id: i64,
        dest_path: &Path,
        source_path: &Path,
    ) -> Result<(), LedgerError> {
        if !self.entries.iter().any(|e| e.id == history_id) {
            return Err(LedgerError::NotFound(history_id));
        }

        self.last_file_id += 1;
        self.files.push(LinkedFileRecord {
            id: self.last_file_id,
            history_id,
            dest_path: dest_path.to_path_buf(),
            source_path: source_path.to_path_buf(),
        });
        Ok(())
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored history entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ledger for MemoryLedger {
    fn insert_history(&self, entry: &NewHistoryEntry) -> Result<i64, LedgerError> {
        Ok(self.state.lock().insert_history(entry))
    }

    fn insert_linked_file(
        &self,
        history_id: i64,
        dest_path: &Path,
        source_path: &Path,
    ) -> Result<(), LedgerError> {
        self.state
            .lock()
            .insert_linked_file(history_id, dest_path, source_path)
    }

    fn last_history_entry(&self) -> Result<Option<HistoryEntry>, LedgerError> {
        Ok(self.state.lock().entries.last().cloned())
    }

    fn linked_files(&self, history_id: i64) -> Result<Vec<LinkedFileRecord>, LedgerError> {
        Ok(self
            .state
            .lock()
            .files
            .iter()
            .filter(|f| f.history_id == history_id)
            .cloned()
            .collect())
    }

    fn delete_history(&self, id: i64) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() == before {
            return Err(LedgerError::NotFound(id));
        }
        state.files.retain(|f| f.history_id != id);
        Ok(())
    }

    fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, LedgerError> {
        Ok(self
            .state
            .lock()
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn record_link(
        &self,
        entry: &NewHistoryEntry,
        files: &[LinkedPath],
    ) -> Result<i64, LedgerError> {
        let mut state = self.state.lock();
        let id = state.insert_history(entry);
        for file in files {
            state.insert_linked_file(id, &file.dest_path, &file.source_path)?;
        }
        Ok(id)
    }
}
