// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the kiosk reservation engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a schema version
//! gate, a single-writer concurrency model via `tokio-rusqlite`, and typed
//! query modules for the catalog, inventory slots, carts, reservations, order
//! history, operator users and persisted configuration.
//!
//! Query functions that take `&rusqlite::Connection` are synchronous building
//! blocks meant to be composed inside [`Database::transact`]; the async
//! functions taking `&Database` are self-contained operations.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod writer;

pub use database::{Database, SCHEMA_VERSION};
