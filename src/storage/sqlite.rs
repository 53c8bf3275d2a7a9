//! `SQLite`-backed vector store.
//!
//! Vectors are stored as JSON arrays and scored by brute force inside a single scope.
//! This trades query speed for zero extra dependencies; partitions are expected to stay
//! in the low thousands of records.

use super::{ScoredRecord, StoreFilter, StoredRecord, VectorStore, top_k};
use crate::embedding::cosine_similarity;
use crate::models::{RecordKind, TenantScope};
use crate::sync::acquire_lock;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    scope TEXT NOT NULL,
    kind TEXT NOT NULL,
    vector TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_scope_kind ON records(scope, kind);
";

/// Persistent store backed by a single `SQLite` database file.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Opens (or creates) a database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::backend("create_db_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::backend("open_sqlite", e))?;
        Self::init(conn, Some(db_path))
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if initialization fails.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::backend("open_sqlite", e))?;
        Self::init(conn, None)
    }

    /// Returns the database path, if file-backed.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        // journal_mode returns a row; the result is ignored like the other pragmas.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let _ = conn.pragma_update(None, "busy_timeout", "5000");
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::backend("init_schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    fn owner(conn: &Connection, id: &str) -> Result<Option<String>> {
        conn.query_row("SELECT scope FROM records WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| Error::backend("locate_record", e))
    }

    fn load(
        conn: &Connection,
        scope: &TenantScope,
        filter: &StoreFilter,
    ) -> Result<Vec<StoredRecord>> {
        let scope_key = scope.key();
        let kind = filter.kind.map(|k| k.as_str());
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, kind, vector, payload FROM records
                 WHERE scope = ?1 AND (?2 IS NULL OR kind = ?2)
                 ORDER BY seq",
            )
            .map_err(|e| Error::backend("prepare_load", e))?;
        let rows = stmt
            .query_map(params![scope_key, kind], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| Error::backend("load_records", e))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, kind, vector, payload) = row.map_err(|e| Error::backend("load_records", e))?;
            let record = decode(id, scope, &kind, &vector, &payload)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn decode(
    id: String,
    scope: &TenantScope,
    kind: &str,
    vector: &str,
    payload: &str,
) -> Result<StoredRecord> {
    let kind = RecordKind::parse(kind)
        .ok_or_else(|| Error::backend("decode_record", format!("unknown kind '{kind}'")))?;
    let vector = serde_json::from_str(vector).map_err(|e| Error::backend("decode_vector", e))?;
    let payload =
        serde_json::from_str(payload).map_err(|e| Error::backend("decode_payload", e))?;
    Ok(StoredRecord {
        id,
        scope: scope.clone(),
        kind,
        vector,
        payload,
    })
}

fn record_metrics(operation: &'static str, start: Instant) {
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => "sqlite",
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(name = "contextfold.storage.upsert", skip(self, record), fields(id = %record.id, scope = %record.scope))]
    fn upsert(&self, record: StoredRecord) -> Result<()> {
        let start = Instant::now();
        let scope_key = record.scope.key();
        let vector =
            serde_json::to_string(&record.vector).map_err(|e| Error::backend("encode_vector", e))?;
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| Error::backend("encode_payload", e))?;

        let conn = acquire_lock(&self.conn);
        if let Some(owner) = Self::owner(&conn, &record.id)?
            && owner != scope_key
        {
            return Err(Error::Validation(format!(
                "record {} already belongs to scope {owner}",
                record.id
            )));
        }
        conn.execute(
            "INSERT INTO records (id, scope, kind, vector, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET vector = excluded.vector, payload = excluded.payload",
            params![record.id, scope_key, record.kind.as_str(), vector, payload],
        )
        .map_err(|e| Error::backend("upsert_record", e))?;
        drop(conn);

        record_metrics("upsert", start);
        Ok(())
    }

    fn get(&self, scope: &TenantScope, id: &str) -> Result<Option<StoredRecord>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                "SELECT kind, vector, payload FROM records WHERE scope = ?1 AND id = ?2",
                params![scope.key(), id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::backend("get_record", e))?;
        drop(conn);

        row.map(|(kind, vector, payload)| decode(id.to_string(), scope, &kind, &vector, &payload))
            .transpose()
    }

    fn delete(&self, scope: &TenantScope, id: &str) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let deleted = conn
            .execute(
                "DELETE FROM records WHERE scope = ?1 AND id = ?2",
                params![scope.key(), id],
            )
            .map_err(|e| Error::backend("delete_record", e))?;
        Ok(deleted > 0)
    }

    #[instrument(name = "contextfold.storage.query", skip_all, fields(scope = %scope, limit = limit))]
    fn query(
        &self,
        scope: &TenantScope,
        vector: &[f32],
        filter: &StoreFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredRecord>> {
        let start = Instant::now();
        let records = {
            let conn = acquire_lock(&self.conn);
            Self::load(&conn, scope, filter)?
        };
        let scored = records
            .into_iter()
            .map(|record| ScoredRecord {
                score: cosine_similarity(vector, &record.vector),
                record,
            })
            .collect();
        let results = top_k(scored, limit);
        record_metrics("query", start);
        Ok(results)
    }

    fn list(&self, scope: &TenantScope, filter: &StoreFilter) -> Result<Vec<StoredRecord>> {
        let conn = acquire_lock(&self.conn);
        Self::load(&conn, scope, filter)
    }

    fn locate(&self, id: &str) -> Result<Option<TenantScope>> {
        let conn = acquire_lock(&self.conn);
        let Some(key) = Self::owner(&conn, id)? else {
            return Ok(None);
        };
        TenantScope::from_key(&key)
            .map(Some)
            .ok_or_else(|| Error::backend("locate_record", format!("malformed scope key '{key}'")))
    }
}
