//! SQLite-backed ledger.
//!
//! One database file per data directory. A single connection behind a mutex
//! serializes every read and write.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::store::{Ledger, LedgerError};
use super::types::{HistoryEntry, LinkedFileRecord, LinkedPath, NewHistoryEntry};
use crate::linker::MediaType;

pub const DATABASE_FILE: &str = "link-anime.db";

const MIGRATIONS: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS history (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp  TEXT NOT NULL,
        media_type TEXT NOT NULL,
        show_name  TEXT NOT NULL,
        season     INTEGER,
        file_count INTEGER NOT NULL,
        total_size INTEGER NOT NULL DEFAULT 0,
        dest_path  TEXT NOT NULL,
        source     TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS linked_files (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        history_id  INTEGER NOT NULL REFERENCES history(id) ON DELETE CASCADE,
        file_path   TEXT NOT NULL,
        source_path TEXT NOT NULL DEFAULT ''
    )",
    "CREATE INDEX IF NOT EXISTS idx_linked_files_history ON linked_files(history_id)",
];

const HISTORY_COLUMNS: &str =
    "id, timestamp, media_type, show_name, season, file_count, total_size, dest_path, source";

pub struct SqliteLedger {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, LedgerError> {
        fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join(DATABASE_FILE);
        let conn = Connection::open(&db_path)?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let ledger = Self::from_connection(conn, Some(db_path.clone()))?;
        info!("Ledger opened at {:?}", db_path);
        Ok(ledger)
    }

    /// In-memory database, discarded on drop
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, LedgerError> {
        conn.pragma_update(None, "foreign_keys", true)?;

        for migration in MIGRATIONS {
            conn.execute_batch(migration)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file location, `None` for in-memory ledgers
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn parse_history_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
        Ok(HistoryRow {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            media_type: row.get(2)?,
            show_name: row.get(3)?,
            season: row.get(4)?,
            file_count: row.get(5)?,
            total_size: row.get(6)?,
            dest_path: row.get(7)?,
            source: row.get(8)?,
        })
    }

    fn insert_history_with(conn: &Connection, entry: &NewHistoryEntry) -> Result<i64, LedgerError> {
        conn.execute(
            "INSERT INTO history (timestamp, media_type, show_name, season, file_count, total_size, dest_path, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Utc::now(),
                entry.media_type.as_str(),
                entry.show_name,
                entry.season,
                entry.file_count as i64,
                entry.total_bytes as i64,
                entry.dest_dir.to_string_lossy().into_owned(),
                entry.source_label,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_linked_file_with(
        conn: &Connection,
        history_id: i64,
        dest_path: &Path,
        source_path: &Path,
    ) -> Result<(), LedgerError> {
        conn.execute(
            "INSERT INTO linked_files (history_id, file_path, source_path) VALUES (?1, ?2, ?3)",
            params![
                history_id,
                dest_path.to_string_lossy().into_owned(),
                source_path.to_string_lossy().into_owned()
            ],
        )?;
        Ok(())
    }
}

/// Raw column values of a `history` row
struct HistoryRow {
    id: i64,
    timestamp: DateTime<Utc>,
    media_type: String,
    show_name: String,
    season: Option<u32>,
    file_count: i64,
    total_size: i64,
    dest_path: String,
    source: String,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = LedgerError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let media_type: MediaType = row
            .media_type
            .parse()
            .map_err(|_| LedgerError::InvalidRow(format!("unknown media type '{}'", row.media_type)))?;

        Ok(HistoryEntry {
            id: row.id,
            timestamp: row.timestamp,
            media_type,
            show_name: row.show_name,
            season: row.season,
            file_count: usize::try_from(row.file_count).unwrap_or(0),
            total_bytes: u64::try_from(row.total_size).unwrap_or(0),
            dest_dir: PathBuf::from(row.dest_path),
            source_label: row.source,
        })
    }
}

impl Ledger for SqliteLedger {
    fn insert_history(&self, entry: &NewHistoryEntry) -> Result<i64, LedgerError> {
        let conn = self.conn.lock();
        Self::insert_history_with(&conn, entry)
    }

    fn insert_linked_file(
        &self,
        history_id: i64,
        dest_path: &Path,
        source_path: &Path,
    ) -> Result<(), LedgerError> {
        let conn = self.conn.lock();
        Self::insert_linked_file_with(&conn, history_id, dest_path, source_path)
    }

    fn last_history_entry(&self) -> Result<Option<HistoryEntry>, LedgerError> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            &format!("SELECT {} FROM history ORDER BY id DESC LIMIT 1", HISTORY_COLUMNS),
            [],
            Self::parse_history_row,
        );

        match result {
            Ok(row) => Ok(Some(HistoryEntry::try_from(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn linked_files(&self, history_id: i64) -> Result<Vec<LinkedFileRecord>, LedgerError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, history_id, file_path, source_path FROM linked_files
             WHERE history_id = ?1 ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![history_id], |row| {
                Ok(LinkedFileRecord {
                    id: row.get(0)?,
                    history_id: row.get(1)?,
                    dest_path: PathBuf::from(row.get::<_, String>(2)?),
                    source_path: PathBuf::from(row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn delete_history(&self, id: i64) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM linked_files WHERE history_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM history WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(LedgerError::NotFound(id));
        }

        tx.commit()?;
        debug!(history_id = id, "Deleted history entry");
        Ok(())
    }

    fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, LedgerError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM history ORDER BY id DESC LIMIT ?1",
            HISTORY_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit as i64], Self::parse_history_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(HistoryEntry::try_from).collect()
    }

    fn record_link(
        &self,
        entry: &NewHistoryEntry,
        files: &[LinkedPath],
    ) -> Result<i64, LedgerError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let id = Self::insert_history_with(&tx, entry)?;
        for file in files {
            Self::insert_linked_file_with(&tx, id, &file.dest_path, &file.source_path)?;
        }

        tx.commit()?;
        debug!(history_id = id, files = files.len(), "Recorded link operation");
        Ok(id)
    }
}
