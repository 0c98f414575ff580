// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer documentation and enforcement.
//!
//! All writes in kiosk-storage are serialized through `tokio-rusqlite`'s
//! single background thread. The `Database` struct IS the single writer.
//! Multi-statement changes go through `Database::transact`, which opens a
//! `BEGIN IMMEDIATE` transaction on that thread.
//!
//! **Do NOT create additional Connection instances for writes.**

// The single-writer pattern holds because:
// - `Database` wraps a single `tokio_rusqlite::Connection`
// - all query functions accept `&Database` or run inside `Database::transact`
// - tokio-rusqlite serializes all closure calls on one background thread
// - stock is only ever changed by guarded conditional updates, so a second
//   process sharing the file still cannot drive a slot negative
