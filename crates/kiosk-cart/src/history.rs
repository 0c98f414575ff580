// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order history ledger.
//!
//! Append-only record of how each cart ended. Recording is idempotent on
//! `(transaction_id, order_info, created_at)`.

use kiosk_core::{CompletionCause, KioskError, OrderHistoryRecord};
use kiosk_storage::Database;
use kiosk_storage::queries::order_history;
use rusqlite::Connection;
use tracing::{debug, info};

/// Record one outcome on an open connection or transaction.
pub(crate) fn record_in(
    conn: &Connection,
    transaction_id: &str,
    order_info: &str,
    cause: CompletionCause,
    timestamp: i64,
) -> Result<bool, KioskError> {
    let written = order_history::insert_record(conn, transaction_id, order_info, cause, timestamp)?;
    if written {
        debug!(transaction_id, %cause, "order history recorded");
    } else {
        debug!(transaction_id, %cause, "order history already recorded");
    }
    Ok(written)
}

#[derive(Debug, Clone)]
pub struct OrderHistoryLedger {
    db: Database,
}

impl OrderHistoryLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record an outcome. Returns `false` when the identical tuple exists.
    pub async fn record(
        &self,
        transaction_id: &str,
        order_info: &str,
        cause: CompletionCause,
        timestamp: i64,
    ) -> Result<bool, KioskError> {
        let transaction_id = transaction_id.to_string();
        let order_info = order_info.to_string();
        self.db
            .with_conn(move |conn| record_in(conn, &transaction_id, &order_info, cause, timestamp))
            .await
    }

    /// Records oldest first, optionally only those with this order payload.
    pub async fn list(
        &self,
        order_info: Option<&str>,
    ) -> Result<Vec<OrderHistoryRecord>, KioskError> {
        let order_info = order_info.map(str::to_string);
        self.db
            .with_conn(move |conn| order_history::list_records(conn, order_info.as_deref()))
            .await
    }

    pub async fn for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<OrderHistoryRecord>, KioskError> {
        let transaction_id = transaction_id.to_string();
        self.db
            .with_conn(move |conn| order_history::records_for_transaction(conn, &transaction_id))
            .await
    }

    /// Delete records created before `cutoff` (Unix seconds).
    pub async fn purge_older_than(&self, cutoff: i64) -> Result<usize, KioskError> {
        let purged = self
            .db
            .with_conn(move |conn| order_history::delete_older_than(conn, cutoff))
            .await?;
        if purged > 0 {
            info!(purged, cutoff, "order history purged");
        }
        Ok(purged)
    }
}
