// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, schema gate
//! and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::time::Duration;

use kiosk_config::model::StorageConfig;
use kiosk_core::KioskError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::migrations;

/// Schema version this engine reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

/// Handle to the kiosk database.
///
/// Cloning is cheap; every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at `path` with default storage settings.
    pub async fn open(path: &str) -> Result<Self, KioskError> {
        Self::open_with(path, &StorageConfig::default()).await
    }

    /// Open the database described by a storage config section.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, KioskError> {
        Self::open_with(&config.database_path, config).await
    }

    async fn open_with(path: &str, config: &StorageConfig) -> Result<Self, KioskError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| KioskError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| KioskError::Storage {
                source: Box::new(e),
            })?;

        let wal_mode = config.wal_mode;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        conn.call(move |conn| Ok::<_, rusqlite::Error>(prepare(conn, wal_mode, busy_timeout)))
            .await
            .map_err(map_tr_err)??;

        info!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run `f` against the connection outside of an explicit transaction.
    ///
    /// Suitable for reads and single-statement writes.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, KioskError>
    where
        F: FnOnce(&Connection) -> Result<T, KioskError> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok::<_, rusqlite::Error>(f(conn)))
            .await
            .map_err(map_tr_err)?
    }

    /// Run `f` as one unit of work inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// Commits when `f` returns `Ok`. On `Err` the transaction is dropped,
    /// which rolls it back, and the error is returned unchanged.
    pub async fn transact<T, F>(&self, f: F) -> Result<T, KioskError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, KioskError> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok::<_, rusqlite::Error>(run_immediate(conn, f)))
            .await
            .map_err(map_tr_err)?
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), KioskError> {
        self.conn.close().await.map_err(|e| KioskError::Storage {
            source: Box::new(e),
        })
    }
}

fn run_immediate<T, F>(conn: &mut Connection, f: F) -> Result<T, KioskError>
where
    F: FnOnce(&mut Transaction<'_>) -> Result<T, KioskError>,
{
    let mut tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = f(&mut tx)?;
    tx.commit()?;
    Ok(out)
}

/// Apply connection PRAGMAs, gate on the schema version and run migrations.
fn prepare(
    conn: &mut Connection,
    wal_mode: bool,
    busy_timeout: Duration,
) -> Result<(), KioskError> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    if wal_mode {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(mode, "journal mode set");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(KioskError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        });
    }

    migrations::run_migrations(conn)?;

    let found = user_version(conn)?;
    if found != SCHEMA_VERSION {
        return Err(KioskError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        });
    }
    Ok(())
}

fn user_version(conn: &Connection) -> Result<i64, KioskError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Convert a tokio-rusqlite error into `KioskError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> KioskError {
    KioskError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations_and_sets_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kiosk.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (version, fk) = db
            .with_conn(|conn| {
                let v = user_version(conn)?;
                let fk: i64 = conn.pragma_query_value(None, "foreign_keys", |r| r.get(0))?;
                Ok((v, fk))
            })
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kiosk.db");
        let path = path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kiosk.db");
        let path = path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.with_conn(|conn| {
            conn.pragma_update(None, "user_version", 99)?;
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();

        let err = Database::open(path).await.unwrap_err();
        assert!(matches!(
            err,
            KioskError::SchemaVersionMismatch {
                expected: 1,
                found: 99
            }
        ));
    }

    #[tokio::test]
    async fn transact_rolls_back_on_error() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("kiosk.db").to_str().unwrap())
            .await
            .unwrap();

        let result: Result<(), KioskError> = db
            .transact(|tx| {
                tx.execute(
                    "INSERT INTO global_config (key, value, updated_at) VALUES ('a', 'b', 0)",
                    [],
                )?;
                Err(KioskError::Internal("abort".into()))
            })
            .await;
        assert!(matches!(result, Err(KioskError::Internal(_))));

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM global_config", [], |r| r.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transact_commits_on_ok() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("kiosk.db").to_str().unwrap())
            .await
            .unwrap();

        db.transact(|tx| {
            tx.execute(
                "INSERT INTO global_config (key, value, updated_at) VALUES ('a', 'b', 0)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let value: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT value FROM global_config WHERE key = 'a'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(value, "b");
        db.close().await.unwrap();
    }
}
