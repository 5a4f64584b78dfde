use lattice_scanner::ConnectionRecord;
use rusqlite::{Connection, OptionalExtension, Result, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

const PROGRESS_KEY: &str = "scanProgress";
const STOP_KEY: &str = "stopRequested";

/// Transient state of an in-flight scan. Present only while a scan is
/// active; deleted on completion, cancellation, and fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub current: u64,
    /// `None` only in the brief window before the engine knows the root count.
    pub total: Option<u64>,
}

/// Durable store backing the crawl: the accumulated connection map plus the
/// scan-state keys (`scanProgress`, the stop flag).
///
/// The engine is the only writer; any number of observers may open their own
/// connection to the same file and poll. WAL mode keeps those reads from
/// blocking the writer.
pub struct Store {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn json_err(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

impl Store {
    pub fn drop(path: &Path) {
        fs::remove_file(path).unwrap();
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- The accumulated connection map, one record per discovered id.
            CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY,
                record TEXT NOT NULL,       -- ConnectionRecord JSON
                discovered_at INTEGER NOT NULL
            );

            -- Scan bookkeeping: scanProgress, stopRequested.
            CREATE TABLE IF NOT EXISTS scan_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // Connection map operations

    /// Insert one record and the matching progress update in a single
    /// transaction, so no observer ever sees one without the other.
    /// Existing records are never overwritten; returns whether the record
    /// was newly inserted.
    pub fn insert_record(
        &mut self,
        record: &ConnectionRecord,
        progress: &CrawlProgress,
    ) -> Result<bool> {
        let record_json = serde_json::to_string(record).map_err(json_err)?;
        let progress_json = serde_json::to_string(progress).map_err(json_err)?;

        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO connections (id, record, discovered_at) VALUES (?1, ?2, ?3)",
            params![&record.id, record_json, current_timestamp()],
        )?;
        upsert_state(&tx, PROGRESS_KEY, &progress_json)?;
        tx.commit()?;

        Ok(inserted > 0)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM connections WHERE id = ?1")?;
        let found: Option<i64> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        Ok(found.is_some())
    }

    pub fn connection_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM connections", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn load_connections(&self) -> Result<HashMap<String, ConnectionRecord>> {
        let mut stmt = self.conn.prepare("SELECT id, record FROM connections")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (id, json) = row?;
            match serde_json::from_str::<ConnectionRecord>(&json) {
                Ok(record) => {
                    map.insert(id, record);
                }
                Err(e) => warn!("skipping unreadable record {}: {}", id, e),
            }
        }
        Ok(map)
    }

    /// Replace the whole map with the given one (import path).
    pub fn replace_connections(
        &mut self,
        connections: &HashMap<String, ConnectionRecord>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM connections", [])?;
        for record in connections.values() {
            let json = serde_json::to_string(record).map_err(json_err)?;
            tx.execute(
                "INSERT OR IGNORE INTO connections (id, record, discovered_at) VALUES (?1, ?2, ?3)",
                params![&record.id, json, current_timestamp()],
            )?;
        }
        tx.commit()
    }

    // Progress operations

    pub fn progress(&self) -> Result<Option<CrawlProgress>> {
        match self.get_state(PROGRESS_KEY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(progress) => Ok(Some(progress)),
                Err(e) => {
                    warn!("unreadable scan progress, treating as absent: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn set_progress(&self, progress: &CrawlProgress) -> Result<()> {
        let json = serde_json::to_string(progress).map_err(json_err)?;
        upsert_state(&self.conn, PROGRESS_KEY, &json)
    }

    pub fn clear_progress(&self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM scan_state WHERE key = ?1",
            params![PROGRESS_KEY],
        )?;
        Ok(())
    }

    // Cancellation flag. Durable so a second process can stop a scan.

    pub fn request_stop(&self) -> Result<()> {
        upsert_state(&self.conn, STOP_KEY, "1")
    }

    pub fn stop_requested(&self) -> Result<bool> {
        Ok(self.get_state(STOP_KEY)?.as_deref() == Some("1"))
    }

    pub fn clear_stop(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM scan_state WHERE key = ?1", params![STOP_KEY])?;
        Ok(())
    }

    /// Delete the connection map and all scan state.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM connections", [])?;
        tx.execute("DELETE FROM scan_state", [])?;
        tx.commit()
    }

    fn get_state(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM scan_state WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }
}

fn upsert_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}
