// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator user CRUD operations.
//!
//! Only PHC-encoded password hashes are ever stored; hashing lives in
//! kiosk-auth.

use kiosk_core::{AccessLevel, KioskError, User};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Stored user row including the password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("user", &self.user)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Insert a user. Returns `false` when the name is already taken.
pub async fn insert_user(
    db: &Database,
    name: &str,
    password_hash: &str,
    access_level: AccessLevel,
) -> Result<bool, KioskError> {
    let name = name.to_string();
    let password_hash = password_hash.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO users (name, password, access_level, last_logged_in)
                 VALUES (?1, ?2, ?3, 0)",
                params![name, password_hash, access_level],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a user with its password hash.
pub async fn get_user(db: &Database, name: &str) -> Result<Option<UserRecord>, KioskError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT name, password, access_level, last_logged_in FROM users WHERE name = ?1",
                params![name],
                |row| {
                    Ok(UserRecord {
                        user: User {
                            name: row.get(0)?,
                            access_level: row.get(2)?,
                            last_logged_in: row.get(3)?,
                        },
                        password_hash: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List users without their hashes, by name.
pub async fn list_users(db: &Database) -> Result<Vec<User>, KioskError> {
    db.connection()
        .call(|conn| -> Result<Vec<User>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, access_level, last_logged_in FROM users ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(User {
                    name: row.get(0)?,
                    access_level: row.get(1)?,
                    last_logged_in: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_last_logged_in(db: &Database, name: &str, at: i64) -> Result<(), KioskError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE users SET last_logged_in = ?2 WHERE name = ?1",
                params![name, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a user's password hash. Returns `false` for unknown users.
pub async fn update_password(
    db: &Database,
    name: &str,
    password_hash: &str,
) -> Result<bool, KioskError> {
    let name = name.to_string();
    let password_hash = password_hash.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE users SET password = ?2 WHERE name = ?1",
                params![name, password_hash],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_user(db: &Database, name: &str) -> Result<bool, KioskError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute("DELETE FROM users WHERE name = ?1", params![name])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
