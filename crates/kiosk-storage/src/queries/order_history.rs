// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order history queries.

use kiosk_core::{CompletionCause, KioskError, OrderHistoryRecord};
use rusqlite::{Connection, Row, params};

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<OrderHistoryRecord> {
    Ok(OrderHistoryRecord {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        order_info: row.get(2)?,
        completion_cause: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a record unless the same `(transaction_id, order_info, created_at)`
/// already exists. Returns whether a row was written.
pub fn insert_record(
    conn: &Connection,
    transaction_id: &str,
    order_info: &str,
    cause: CompletionCause,
    created_at: i64,
) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO order_history (transaction_id, order_info, completion_cause, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![transaction_id, order_info, cause, created_at],
    )?;
    Ok(changed > 0)
}

/// List records, optionally restricted to one order payload, oldest first.
pub fn list_records(
    conn: &Connection,
    order_info: Option<&str>,
) -> Result<Vec<OrderHistoryRecord>, KioskError> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, order_info, completion_cause, created_at
         FROM order_history
         WHERE ?1 IS NULL OR order_info = ?1
         ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![order_info], record_from_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

pub fn records_for_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Vec<OrderHistoryRecord>, KioskError> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, order_info, completion_cause, created_at
         FROM order_history WHERE transaction_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![transaction_id], record_from_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Delete records created strictly before `cutoff`.
pub fn delete_older_than(conn: &Connection, cutoff: i64) -> Result<usize, KioskError> {
    Ok(conn.execute(
        "DELETE FROM order_history WHERE created_at < ?1",
        params![cutoff],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_seeded;

    #[tokio::test]
    async fn identical_tuple_is_recorded_once() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            assert!(insert_record(conn, "tx-1", "{}", CompletionCause::Fulfilled, 100)?);
            assert!(!insert_record(conn, "tx-1", "{}", CompletionCause::Fulfilled, 100)?);
            assert!(insert_record(conn, "tx-1", "{}", CompletionCause::Cancelled, 101)?);
            assert_eq!(records_for_transaction(conn, "tx-1")?.len(), 2);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn filter_and_retention() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            insert_record(conn, "a", "PICKUP-1", CompletionCause::Fulfilled, 100)?;
            insert_record(conn, "b", "PICKUP-2", CompletionCause::Expired, 200)?;
            insert_record(conn, "c", "PICKUP-1", CompletionCause::Fulfilled, 300)?;

            let pickup_one = list_records(conn, Some("PICKUP-1"))?;
            assert_eq!(pickup_one.len(), 2);
            assert_eq!(list_records(conn, None)?.len(), 3);

            assert_eq!(delete_older_than(conn, 200)?, 1);
            let rest = list_records(conn, None)?;
            assert_eq!(rest[0].transaction_id, "b");
            assert_eq!(rest[0].completion_cause, CompletionCause::Expired);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }
}
