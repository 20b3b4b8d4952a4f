//! SQLite cache store
//!
//! 생성 결과를 저장하는 영속 테이블:
//! - cache_entries: 생성 레코드 (시그니처, 타입, 생성 시각으로 인덱싱)
//! - cache_counters: 히트/미스 카운터 (엔트리 테이블과 분리)
//!
//! 레코드는 수정되지 않는다. 재생성은 항상 새 행을 추가한다.
//!
//! ## Schema
//!
//! 스키마는 생성 시점에 한 번 만들어진다 (`schema_version` 테이블로 추적).
//! - Version 1: cache_entries, cache_counters

use crate::clock::{timestamp, Clock, SystemClock};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Slack added to tolerance comparisons so `|0.8 - 0.7| <= 0.1` holds
const TOLERANCE_EPSILON: f64 = 1e-9;

const ENTRY_COLUMNS: &str = "id, field_signature, field_type, creativity_level, \
     generated_content, provider, model, created_at, expires_at";

// ============================================================================
// Records
// ============================================================================

/// A stored generation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub id: i64,
    pub field_signature: String,
    pub field_type: String,
    pub creativity_level: f64,
    pub generated_content: String,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Entry before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewCacheEntry {
    pub field_signature: String,
    pub field_type: String,
    pub creativity_level: f64,
    pub generated_content: String,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Aggregate view over valid entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_entries: u64,
    pub entries_by_type: BTreeMap<String, u64>,
    pub entries_by_creativity: BTreeMap<String, u64>,
    /// Sum of each entry's JSON length
    pub storage_size: u64,
}

/// What one cleanup pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub expired_removed: usize,
    pub evicted: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.expired_removed + self.evicted
    }
}

/// Four-way creativity bucket used by [`StoreStats`]
pub fn creativity_bucket(level: f64) -> &'static str {
    if level <= 0.3 {
        "Predictable"
    } else if level <= 0.7 {
        "Balanced"
    } else if level <= 1.2 {
        "Creative"
    } else {
        "Experimental"
    }
}

/// Signature with its last `-` segment dropped; `""` when there is no hyphen
pub fn base_signature(signature: &str) -> &str {
    match signature.rfind('-') {
        Some(idx) => &signature[..idx],
        None => "",
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn storage_error(context: &str, e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        if matches!(
            failure.code,
            ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::DiskFull
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
                | ErrorCode::NotADatabase
        ) {
            return Error::StorageUnavailable(format!("{}: {}", context, e));
        }
    }
    Error::Storage(format!("{}: {}", context, e))
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        id: row.get(0)?,
        field_signature: row.get(1)?,
        field_type: row.get(2)?,
        creativity_level: row.get(3)?,
        generated_content: row.get(4)?,
        provider: row.get(5)?,
        model: row.get(6)?,
        created_at: parse_timestamp(7, row.get(7)?)?,
        expires_at: parse_timestamp(8, row.get(8)?)?,
    })
}

fn collect_entries(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    context: &str,
) -> Result<Vec<CacheEntry>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| storage_error("Failed to prepare query", e))?;
    let rows = stmt
        .query_map(params, row_to_entry)
        .map_err(|e| storage_error(context, e))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| storage_error(context, e))
}

// ============================================================================
// CacheStore
// ============================================================================

/// Durable table of generation records
///
/// All async methods run their SQL on the blocking pool.
#[derive(Clone)]
pub struct CacheStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Open (or create) the database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StorageUnavailable(format!("Failed to create data directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::StorageUnavailable(format!("Failed to open database: {}", e))
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| storage_error("Failed to set pragmas", e))?;

        Self::from_connection(conn)
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::StorageUnavailable(format!("Failed to create in-memory database: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Internal("Lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Internal(format!("Storage task failed: {}", e)))?
    }

    pub async fn schema_version(&self) -> Result<i32> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|e| storage_error("Failed to get schema version", e))
        })
        .await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a record, returning its new id
    pub async fn insert(&self, entry: NewCacheEntry) -> Result<i64> {
        if entry.expires_at <= entry.created_at {
            return Err(Error::Validation(format!(
                "Cache entry for {} expires before it is created",
                entry.field_signature
            )));
        }

        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO cache_entries
                    (field_signature, field_type, creativity_level, generated_content,
                     provider, model, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    entry.field_signature,
                    entry.field_type,
                    entry.creativity_level,
                    entry.generated_content,
                    entry.provider,
                    entry.model,
                    timestamp(entry.created_at),
                    timestamp(entry.expires_at),
                ],
            )
            .map_err(|e| storage_error("Failed to insert cache entry", e))?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Delete expired rows, then keep only the `max_entries` newest, in one transaction
    pub async fn cleanup(&self, max_entries: usize) -> Result<CleanupReport> {
        let now = timestamp(self.clock.now());
        let keep = i64::try_from(max_entries).unwrap_or(i64::MAX);

        let report = self
            .with_conn(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| storage_error("Failed to begin cleanup", e))?;

                let expired_removed = tx
                    .execute(
                        "DELETE FROM cache_entries WHERE expires_at <= ?1",
                        params![now],
                    )
                    .map_err(|e| storage_error("Failed to delete expired entries", e))?;

                let evicted = tx
                    .execute(
                        r#"
                        DELETE FROM cache_entries WHERE id NOT IN (
                            SELECT id FROM cache_entries
                            ORDER BY created_at DESC, id DESC
                            LIMIT ?1
                        )
                        "#,
                        params![keep],
                    )
                    .map_err(|e| storage_error("Failed to evict old entries", e))?;

                tx.commit()
                    .map_err(|e| storage_error("Failed to commit cleanup", e))?;

                Ok(CleanupReport {
                    expired_removed,
                    evicted,
                })
            })
            .await?;

        if report.total() > 0 {
            info!(
                "Cache cleanup removed {} expired and {} excess entries",
                report.expired_removed, report.evicted
            );
        }
        Ok(report)
    }

    /// Delete every record, returning how many were removed
    pub async fn clear(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries", [])
                .map_err(|e| storage_error("Failed to clear cache", e))
        })
        .await
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Closest valid entry for `signature` within `tolerance` of `creativity`
    pub async fn query_by_signature(
        &self,
        signature: &str,
        creativity: f64,
        tolerance: f64,
    ) -> Result<Option<CacheEntry>> {
        let mut found = self
            .query_by_signature_many(signature, creativity, tolerance, 1)
            .await?;
        Ok(found.pop())
    }

    /// Up to `limit` valid entries for `signature`, closest creativity first
    pub async fn query_by_signature_many(
        &self,
        signature: &str,
        creativity: f64,
        tolerance: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        let now = timestamp(self.clock.now());
        let signature = signature.to_string();
        let window = tolerance + TOLERANCE_EPSILON;
        let limit = limit as i64;

        self.with_conn(move |conn| {
            let sql = format!(
                r#"
                SELECT {} FROM cache_entries
                WHERE field_signature = ?1
                  AND ABS(creativity_level - ?2) <= ?3
                  AND expires_at > ?4
                ORDER BY ROUND(ABS(creativity_level - ?2), 9) ASC, created_at DESC, id DESC
                LIMIT ?5
                "#,
                ENTRY_COLUMNS
            );
            collect_entries(
                conn,
                &sql,
                params![signature, creativity, window, now, limit],
                "Failed to query cache by signature",
            )
        })
        .await
    }

    /// Valid entries for this signature or any sharing its base signature
    ///
    /// Exact matches sort first, then closest creativity, then newest.
    pub async fn query_all_similar(
        &self,
        signature: &str,
        creativity: f64,
        limit: usize,
    ) -> Result<Vec<CacheEntry>> {
        let now = timestamp(self.clock.now());
        let base = base_signature(signature).to_string();
        let signature = signature.to_string();
        let limit = limit as i64;

        self.with_conn(move |conn| {
            let sql = format!(
                r#"
                SELECT {} FROM cache_entries
                WHERE (field_signature = ?1 OR substr(field_signature, 1, length(?2)) = ?2)
                  AND expires_at > ?3
                ORDER BY (field_signature = ?1) DESC,
                         ROUND(ABS(creativity_level - ?4), 9) ASC,
                         created_at DESC,
                         id DESC
                LIMIT ?5
                "#,
                ENTRY_COLUMNS
            );
            collect_entries(
                conn,
                &sql,
                params![signature, base, now, creativity, limit],
                "Failed to query similar cache entries",
            )
        })
        .await
    }

    /// Valid entries of one field type within `tolerance`
    pub async fn query_by_type(
        &self,
        field_type: &str,
        creativity: f64,
        limit: usize,
        tolerance: f64,
    ) -> Result<Vec<CacheEntry>> {
        let now = timestamp(self.clock.now());
        let field_type = field_type.to_string();
        let window = tolerance + TOLERANCE_EPSILON;
        let limit = limit as i64;

        self.with_conn(move |conn| {
            let sql = format!(
                r#"
                SELECT {} FROM cache_entries
                WHERE field_type = ?1
                  AND ABS(creativity_level - ?2) <= ?3
                  AND expires_at > ?4
                ORDER BY ROUND(ABS(creativity_level - ?2), 9) ASC, created_at DESC, id DESC
                LIMIT ?5
                "#,
                ENTRY_COLUMNS
            );
            collect_entries(
                conn,
                &sql,
                params![field_type, creativity, window, now, limit],
                "Failed to query cache by type",
            )
        })
        .await
    }

    /// Counts, buckets and size over valid entries
    pub async fn stats(&self) -> Result<StoreStats> {
        let now = timestamp(self.clock.now());

        let entries = self
            .with_conn(move |conn| {
                let sql = format!(
                    "SELECT {} FROM cache_entries WHERE expires_at > ?1",
                    ENTRY_COLUMNS
                );
                collect_entries(conn, &sql, params![now], "Failed to read cache stats")
            })
            .await?;

        let mut stats = StoreStats::default();
        for entry in &entries {
            stats.total_entries += 1;
            *stats
                .entries_by_type
                .entry(entry.field_type.clone())
                .or_insert(0) += 1;
            *stats
                .entries_by_creativity
                .entry(creativity_bucket(entry.creativity_level).to_string())
                .or_insert(0) += 1;
            stats.storage_size += serde_json::to_string(entry)?.len() as u64;
        }
        Ok(stats)
    }

    /// Every row, expired or not
    pub async fn count_all(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(|e| storage_error("Failed to count cache entries", e))
        })
        .await
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub async fn increment_counter(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO cache_counters (name, value) VALUES (?1, 1)
                ON CONFLICT(name) DO UPDATE SET value = value + 1
                "#,
                params![name],
            )
            .map_err(|e| storage_error("Failed to update counter", e))?;
            Ok(())
        })
        .await
    }

    /// 0 when the counter was never written
    pub async fn counter(&self, name: &str) -> Result<u64> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COALESCE(MAX(value), 0) FROM cache_counters WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| storage_error("Failed to read counter", e))
        })
        .await
    }

    pub async fn reset_counters(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_counters", [])
                .map_err(|e| storage_error("Failed to reset counters", e))?;
            Ok(())
        })
        .await
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Generation records
        CREATE TABLE IF NOT EXISTS cache_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            field_signature TEXT NOT NULL,
            field_type TEXT NOT NULL,
            creativity_level REAL NOT NULL,
            generated_content TEXT NOT NULL,
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cache_signature ON cache_entries(field_signature);
        CREATE INDEX IF NOT EXISTS idx_cache_type ON cache_entries(field_type);
        CREATE INDEX IF NOT EXISTS idx_cache_created ON cache_entries(created_at);
        CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at);

        -- Hit/miss counters
        CREATE TABLE IF NOT EXISTS cache_counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .map_err(|e| storage_error("Failed to initialize schema", e))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![CURRENT_SCHEMA_VERSION],
    )
    .map_err(|e| storage_error("Failed to record schema version", e))?;

    debug!("Cache schema ready (version {})", CURRENT_SCHEMA_VERSION);
    Ok(())
}
