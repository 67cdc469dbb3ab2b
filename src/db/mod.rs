pub mod schema;

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One append-only record of a revoke check.
///
/// The log lives outside the engine's transactional boundary: a failed write
/// must never affect the scan result that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub wallet: String,
    pub chain: String,
    pub timestamp: String,
    pub approvals_found: usize,
}

pub struct Database {
    conn: Connection,
}

/// Thread-safe wrapper around Database.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let db = Database::open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
        })
    }

    /// Append one scan-log record, timestamped now.
    pub fn append_scan(
        &self,
        wallet: &str,
        chain: &str,
        approvals_found: usize,
    ) -> Result<(), rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.append_scan(wallet, chain, approvals_found)
    }

    /// Read the full log, most recent first.
    pub fn all_scans(&self) -> Result<Vec<ScanLogEntry>, rusqlite::Error> {
        let db = self.inner.lock().unwrap();
        db.all_scans()
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn append_scan(
        &self,
        wallet: &str,
        chain: &str,
        approvals_found: usize,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO scan_logs (wallet, chain, approvals_found, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![wallet, chain, approvals_found as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn all_scans(&self) -> Result<Vec<ScanLogEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT wallet, chain, created_at, approvals_found
             FROM scan_logs ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ScanLogEntry {
                wallet: row.get(0)?,
                chain: row.get(1)?,
                timestamp: row.get(2)?,
                approvals_found: row.get::<_, i64>(3)? as usize,
            })
        })?;
        rows.collect()
    }
}
