// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted global-config key/value operations.

use kiosk_core::KioskError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert or replace a config override.
pub async fn set_value(db: &Database, key: &str, value: &str, now: i64) -> Result<(), KioskError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO global_config (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_value(db: &Database, key: &str) -> Result<Option<String>, KioskError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM global_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Remove an override. Returns whether it existed.
pub async fn remove_value(db: &Database, key: &str) -> Result<bool, KioskError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute("DELETE FROM global_config WHERE key = ?1", params![key])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All overrides ordered by key.
pub async fn list_values(db: &Database) -> Result<Vec<(String, String)>, KioskError> {
    db.connection()
        .call(|conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT key, value FROM global_config ORDER BY key")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
