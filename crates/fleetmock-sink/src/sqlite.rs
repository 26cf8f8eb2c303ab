// ============================================
// File: crates/fleetmock-sink/src/sqlite.rs
// ============================================
//! # SQLite Document Sink
//!
//! ## Creation Reason
//! Durable local store for normalized log records, usable without running
//! a separate database server next to the mock.
//!
//! ## Main Functionality
//! - `SqliteSink::open()`: Opens (and creates) the database file
//! - `LogSink::store()`: One transaction per batch
//! - `count()` / `documents()`: Inspection helpers
//!
//! ## Schema
//! ```text
//! log_records
//! ├── record_id   TEXT PRIMARY KEY   synthetic _id (hex)
//! ├── collection  TEXT NOT NULL      table name from the submission
//! ├── document    TEXT NOT NULL      record as JSON, _id included
//! └── inserted_at INTEGER NOT NULL   unix seconds
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Collection names come from agents: always bind them, never format
//!   them into SQL
//! - rusqlite is blocking; every call goes through `spawn_blocking`
//! - A failed batch is rolled back entirely
//!
//! ## Last Modified
//! v0.1.0 - Initial SQLite sink

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::{debug, info};

use fleetmock_common::time::Timestamp;
use fleetmock_core::logs::NormalizedRecord;

use crate::error::{Result, SinkError};
use crate::traits::LogSink;

// ============================================
// Schema
// ============================================

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS log_records (
        record_id   TEXT PRIMARY KEY,
        collection  TEXT NOT NULL,
        document    TEXT NOT NULL,
        inserted_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_log_records_collection ON log_records(collection);
";

// ============================================
// SqliteSink
// ============================================

/// `SQLite`-backed record store.
///
/// # Example
/// ```no_run
/// use fleetmock_sink::SqliteSink;
///
/// let sink = SqliteSink::open("fleetmock.db")?;
/// # Ok::<(), fleetmock_sink::SinkError>(())
/// ```
#[derive(Clone)]
pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteSink {
    /// Opens the database at `path`, creating the file, its parent
    /// directory and the schema as needed.
    ///
    /// # Errors
    /// Returns `OpenFailed` if the file cannot be opened and
    /// `SchemaFailed` if the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SinkError::open_failed(path, e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| SinkError::open_failed(path, e.to_string()))?;
        let sink = Self::with_connection(conn, path.to_path_buf())?;
        info!(path = %path.display(), "SQLite sink opened");
        Ok(sink)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    /// Returns `SchemaFailed` if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SinkError::open_failed(":memory:", e.to_string()))?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(|e| SinkError::SchemaFailed {
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Returns the database location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counts the records stored in `collection`.
    ///
    /// # Errors
    /// Returns `QueryFailed` on database errors.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        let conn = Arc::clone(&self.conn);
        let collection = collection.to_string();

        tokio::task::spawn_blocking(move || -> Result<u64> {
            let count: i64 = conn.lock().query_row(
                "SELECT COUNT(*) FROM log_records WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await?
    }

    /// Returns the documents stored in `collection`, in insertion order.
    ///
    /// # Errors
    /// Returns `QueryFailed` on database errors or unreadable documents.
    pub async fn documents(&self, collection: &str) -> Result<Vec<Value>> {
        let conn = Arc::clone(&self.conn);
        let collection = collection.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            let conn = conn.lock();
            let mut stmt = conn.prepare(
                "SELECT document FROM log_records WHERE collection = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

            let mut docs = Vec::new();
            for raw in rows {
                let doc = serde_json::from_str(&raw?).map_err(|e| SinkError::QueryFailed {
                    reason: format!("stored document is not JSON: {e}"),
                })?;
                docs.push(doc);
            }
            Ok(docs)
        })
        .await?
    }
}

#[async_trait]
impl LogSink for SqliteSink {
    async fn store(&self, collection: &str, records: &[NormalizedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // Serialize on the async side so the blocking closure owns plain strings
        let rows: Vec<(String, String)> = records
            .iter()
            .map(|r| (r.id.to_string(), r.to_document().to_string()))
            .collect();
        let conn = Arc::clone(&self.conn);
        let name = collection.to_string();

        let written = tokio::task::spawn_blocking(move || -> Result<usize> {
            let insert_failed = |e: rusqlite::Error| SinkError::insert_failed(&name, e.to_string());
            let now = Timestamp::now().as_secs();

            let mut conn = conn.lock();
            let tx = conn.transaction().map_err(insert_failed)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO log_records (record_id, collection, document, inserted_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(insert_failed)?;
                for (id, doc) in &rows {
                    stmt.execute(params![id, name, doc, now]).map_err(insert_failed)?;
                }
            }
            tx.commit().map_err(insert_failed)?;
            Ok(rows.len())
        })
        .await??;

        debug!(collection, written, "Batch stored");
        Ok(written)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
