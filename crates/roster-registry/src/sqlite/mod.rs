//! Durable registry on `SQLite`.
//!
//! All statements run on the blocking pool; each one touches a single key
//! (or a single keyset page), so per-key atomicity comes from `SQLite`
//! itself and no application lock is taken.

pub mod connection;
pub mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{ConnectionId, ConnectionRecord};
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{RegistryError, Result};
use crate::traits::{ConnectionRegistry, DeleteOutcome, ScanPage};

pub use connection::{ConnectionConfig, ConnectionPool};

/// Registry backed by a pooled `SQLite` database.
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: ConnectionPool,
}

impl SqliteRegistry {
    /// Open (creating if needed) a database file and apply migrations.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        Self::from_pool(pool)
    }

    /// In-memory database, mainly for tests.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        Self::from_pool(pool)
    }

    /// Wrap an existing pool and apply migrations.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        {
            let conn = pool.get()?;
            let _ = migrations::run_migrations(&conn)?;
        }
        Ok(Self { pool })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            op(&conn)
        })
        .await
        .map_err(|e| RegistryError::Internal(format!("registry task failed: {e}")))?
    }
}

type RawRow = (String, String, String);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode((connection_id, user_name, joined_at): RawRow) -> Result<ConnectionRecord> {
    let joined_at = DateTime::parse_from_rfc3339(&joined_at)
        .map_err(|e| RegistryError::Corrupt {
            connection_id: connection_id.clone(),
            message: format!("joined_at `{joined_at}`: {e}"),
        })?
        .with_timezone(&Utc);
    Ok(ConnectionRecord {
        connection_id: ConnectionId::from(connection_id),
        user_name,
        joined_at,
    })
}

#[async_trait]
impl ConnectionRegistry for SqliteRegistry {
    async fn insert(&self, record: ConnectionRecord) -> Result<()> {
        self.run(move |conn| {
            let _ = conn.execute(
                "INSERT INTO connections (connection_id, user_name, joined_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(connection_id) DO UPDATE SET
                     user_name = excluded.user_name,
                     joined_at = excluded.joined_at",
                params![
                    record.connection_id.as_str(),
                    record.user_name,
                    record.joined_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<ConnectionRecord>> {
        let id = connection_id.clone();
        self.run(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT connection_id, user_name, joined_at
                     FROM connections WHERE connection_id = ?1",
                    params![id.as_str()],
                    read_raw,
                )
                .optional()?;
            raw.map(decode).transpose()
        })
        .await
    }

    async fn delete(&self, connection_id: &ConnectionId) -> Result<DeleteOutcome> {
        let id = connection_id.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM connections WHERE connection_id = ?1",
                params![id.as_str()],
            )?;
            Ok(if changed > 0 {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::NotFound
            })
        })
        .await
    }

    async fn scan_page(&self, after: Option<&ConnectionId>, limit: usize) -> Result<ScanPage> {
        let after = after.map(|id| id.as_str().to_owned());
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT connection_id, user_name, joined_at
                 FROM connections
                 WHERE ?1 IS NULL OR connection_id > ?1
                 ORDER BY connection_id
                 LIMIT ?2",
            )?;
            let max = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![after, max], read_raw)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(decode(row?)?);
            }
            Ok(ScanPage::from_records(records, limit))
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.run(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM connections", [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        })
        .await
    }
}
