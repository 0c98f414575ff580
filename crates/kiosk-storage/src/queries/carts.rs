// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cart and cart-content queries.
//!
//! Status changes are conditional updates keyed on the status the caller
//! last observed. A `false` return means another writer got there first.

use kiosk_core::{Cart, CartItem, CartStatus, CartType, CheckoutMethod, KioskError};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

const CART_COLUMNS: &str = "id, display_id, transaction_id, type, order_info, status, \
                            checkout_method, locked_at, updated_at, created_at";

fn cart_from_row(row: &Row<'_>) -> rusqlite::Result<Cart> {
    Ok(Cart {
        id: row.get(0)?,
        display_id: row.get(1)?,
        transaction_id: row.get(2)?,
        cart_type: row.get(3)?,
        order_info: row.get(4)?,
        status: row.get(5)?,
        checkout_method: row.get(6)?,
        locked_at: row.get(7)?,
        updated_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Timestamp column a deadline is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineColumn {
    LockedAt,
    UpdatedAt,
}

impl DeadlineColumn {
    fn as_sql(self) -> &'static str {
        match self {
            DeadlineColumn::LockedAt => "locked_at",
            DeadlineColumn::UpdatedAt => "updated_at",
        }
    }
}

/// Insert a new open cart. Returns its id.
pub fn insert_cart(
    conn: &Connection,
    transaction_id: &str,
    cart_type: CartType,
    display_id: i64,
    now: i64,
) -> Result<i64, KioskError> {
    let result = conn.execute(
        "INSERT INTO cart (display_id, transaction_id, type, order_info, status,
                           checkout_method, locked_at, updated_at, created_at)
         VALUES (?1, ?2, ?3, '', ?4, ?5, 0, ?6, ?6)",
        params![
            display_id,
            transaction_id,
            cart_type,
            CartStatus::Open,
            CheckoutMethod::Undefined,
            now,
        ],
    );
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(KioskError::DuplicateTransaction(transaction_id.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_cart(conn: &Connection, id: i64) -> Result<Option<Cart>, KioskError> {
    let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], cart_from_row).optional()?)
}

pub fn get_cart_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Option<Cart>, KioskError> {
    let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE transaction_id = ?1");
    Ok(conn
        .query_row(&sql, params![transaction_id], cart_from_row)
        .optional()?)
}

/// List carts, optionally filtered by status, oldest first.
pub fn list_carts(conn: &Connection, status: Option<CartStatus>) -> Result<Vec<Cart>, KioskError> {
    let mut carts = Vec::new();
    match status {
        Some(status) => {
            let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE status = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status], cart_from_row)?;
            for row in rows {
                carts.push(row?);
            }
        }
        None => {
            let sql = format!("SELECT {CART_COLUMNS} FROM cart ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], cart_from_row)?;
            for row in rows {
                carts.push(row?);
            }
        }
    }
    Ok(carts)
}

/// Carts in `status` (and of `cart_type`, if given) whose `column` is
/// strictly before `cutoff`.
pub fn find_due(
    conn: &Connection,
    status: CartStatus,
    cart_type: Option<CartType>,
    column: DeadlineColumn,
    cutoff: i64,
) -> Result<Vec<Cart>, KioskError> {
    let col = column.as_sql();
    let sql = format!(
        "SELECT {CART_COLUMNS} FROM cart
         WHERE status = ?1 AND (?2 IS NULL OR type = ?2) AND {col} < ?3
         ORDER BY {col}, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![status, cart_type, cutoff], cart_from_row)?;
    let mut carts = Vec::new();
    for row in rows {
        carts.push(row?);
    }
    Ok(carts)
}

/// Move a cart from `from` to `to`.
///
/// Entering `locked` or `reserved` stamps `locked_at`. When `seen_updated_at`
/// is given the update also requires the activity timestamp to be unchanged.
/// Returns `false` when the guard did not match.
pub fn transition(
    conn: &Connection,
    id: i64,
    from: CartStatus,
    to: CartStatus,
    now: i64,
    seen_updated_at: Option<i64>,
) -> Result<bool, KioskError> {
    let stamps_lock = matches!(to, CartStatus::Locked | CartStatus::Reserved);
    let changed = conn.execute(
        "UPDATE cart
         SET status = ?3,
             updated_at = ?4,
             locked_at = CASE WHEN ?5 THEN ?4 ELSE locked_at END
         WHERE id = ?1 AND status = ?2 AND (?6 IS NULL OR updated_at = ?6)",
        params![id, from, to, now, stamps_lock, seen_updated_at],
    )?;
    Ok(changed > 0)
}

/// Confirm a remote pre-order for pickup: `open` to `reserved`.
pub fn confirm_reservation(
    conn: &Connection,
    id: i64,
    order_info: &str,
    now: i64,
) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "UPDATE cart
         SET status = ?2, locked_at = ?4, updated_at = ?4, checkout_method = ?5, order_info = ?3
         WHERE id = ?1 AND status = ?6 AND type = ?7",
        params![
            id,
            CartStatus::Reserved,
            order_info,
            now,
            CheckoutMethod::Pickup,
            CartStatus::Open,
            CartType::Remote,
        ],
    )?;
    Ok(changed > 0)
}

/// Refresh the activity timestamp of a cart still in `status`.
pub fn touch(conn: &Connection, id: i64, status: CartStatus, now: i64) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "UPDATE cart SET updated_at = ?3 WHERE id = ?1 AND status = ?2",
        params![id, status, now],
    )?;
    Ok(changed > 0)
}

pub fn set_checkout_method(
    conn: &Connection,
    id: i64,
    status: CartStatus,
    method: CheckoutMethod,
    now: i64,
) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "UPDATE cart SET checkout_method = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        params![id, status, method, now],
    )?;
    Ok(changed > 0)
}

pub fn set_order_info(
    conn: &Connection,
    id: i64,
    status: CartStatus,
    order_info: &str,
) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "UPDATE cart SET order_info = ?3 WHERE id = ?1 AND status = ?2",
        params![id, status, order_info],
    )?;
    Ok(changed > 0)
}

// --- Contents ---

pub fn contents(conn: &Connection, cart_id: i64) -> Result<Vec<CartItem>, KioskError> {
    let mut stmt = conn.prepare(
        "SELECT cart_id, variant_id, amount FROM cart_contents
         WHERE cart_id = ?1 ORDER BY variant_id",
    )?;
    let rows = stmt.query_map(params![cart_id], |row| {
        Ok(CartItem {
            cart_id: row.get(0)?,
            variant_id: row.get(1)?,
            amount: row.get(2)?,
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Amount of `variant_id` in the cart, 0 when absent.
pub fn content_amount(conn: &Connection, cart_id: i64, variant_id: i64) -> Result<i64, KioskError> {
    let amount = conn
        .query_row(
            "SELECT amount FROM cart_contents WHERE cart_id = ?1 AND variant_id = ?2",
            params![cart_id, variant_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(amount.unwrap_or(0))
}

/// Set the amount of `variant_id` in the cart; zero removes the line.
pub fn set_content_amount(
    conn: &Connection,
    cart_id: i64,
    variant_id: i64,
    amount: i64,
) -> Result<(), KioskError> {
    if amount < 0 {
        return Err(KioskError::InvalidAmount(format!(
            "cart content amount cannot be negative, got {amount}"
        )));
    }
    if amount == 0 {
        conn.execute(
            "DELETE FROM cart_contents WHERE cart_id = ?1 AND variant_id = ?2",
            params![cart_id, variant_id],
        )?;
    } else {
        conn.execute(
            "INSERT INTO cart_contents (cart_id, variant_id, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT (cart_id, variant_id) DO UPDATE SET amount = excluded.amount",
            params![cart_id, variant_id, amount],
        )?;
    }
    Ok(())
}

// --- Purge ---

/// Delete a cart with its reservations and contents, children first.
///
/// Does not touch inventory; callers release stock before purging a cart
/// that still holds any.
pub fn purge_cart(conn: &Connection, id: i64) -> Result<bool, KioskError> {
    conn.execute("DELETE FROM reservation WHERE cart_id = ?1", params![id])?;
    conn.execute("DELETE FROM cart_contents WHERE cart_id = ?1", params![id])?;
    let changed = conn.execute("DELETE FROM cart WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Purge terminal carts whose last activity is strictly before `cutoff`.
pub fn purge_terminal_before(conn: &Connection, cutoff: i64) -> Result<usize, KioskError> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM cart WHERE status IN (?1, ?2, ?3) AND updated_at < ?4 ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![
                CartStatus::CheckedOut,
                CartStatus::Expired,
                CartStatus::Cancelled,
                cutoff,
            ],
            |row| row.get(0),
        )?;
        rows.collect::<Result<_, _>>()?
    };
    let mut purged = 0;
    for id in ids {
        if purge_cart(conn, id)? {
            purged += 1;
        }
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_seeded;

    #[tokio::test]
    async fn insert_and_fetch_cart() {
        let (db, _dir) = open_seeded().await;
        let cart = db
            .with_conn(|conn| {
                let id = insert_cart(conn, "tx-1", CartType::Local, 2, 1000)?;
                get_cart(conn, id)
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.transaction_id, "tx-1");
        assert_eq!(cart.display_id, 2);
        assert_eq!(cart.status, CartStatus::Open);
        assert_eq!(cart.checkout_method, CheckoutMethod::Undefined);
        assert_eq!(cart.locked_at, 0);
        assert_eq!(cart.updated_at, 1000);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_transaction_is_rejected() {
        let (db, _dir) = open_seeded().await;
        let err = db
            .with_conn(|conn| {
                insert_cart(conn, "tx-1", CartType::Local, 1, 0)?;
                insert_cart(conn, "tx-1", CartType::Remote, 1, 0)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, KioskError::DuplicateTransaction(t) if t == "tx-1"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transition_is_first_writer_wins() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            let id = insert_cart(conn, "tx-1", CartType::Local, 1, 100)?;
            assert!(transition(conn, id, CartStatus::Open, CartStatus::Locked, 200, None)?);
            assert!(!transition(conn, id, CartStatus::Open, CartStatus::Locked, 300, None)?);

            let cart = get_cart(conn, id)?.unwrap();
            assert_eq!(cart.status, CartStatus::Locked);
            assert_eq!(cart.locked_at, 200);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transition_respects_activity_guard() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            let id = insert_cart(conn, "tx-1", CartType::Local, 1, 100)?;
            assert!(touch(conn, id, CartStatus::Open, 150)?);
            assert!(!transition(
                conn,
                id,
                CartStatus::Open,
                CartStatus::Expired,
                200,
                Some(100)
            )?);
            assert!(transition(
                conn,
                id,
                CartStatus::Open,
                CartStatus::Expired,
                200,
                Some(150)
            )?);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_due_filters_by_type_and_cutoff() {
        let (db, _dir) = open_seeded().await;
        let due = db
            .with_conn(|conn| {
                insert_cart(conn, "local-old", CartType::Local, 1, 100)?;
                insert_cart(conn, "local-new", CartType::Local, 1, 500)?;
                insert_cart(conn, "local-edge", CartType::Local, 1, 300)?;
                insert_cart(conn, "remote-old", CartType::Remote, 1, 100)?;
                find_due(
                    conn,
                    CartStatus::Open,
                    Some(CartType::Local),
                    DeadlineColumn::UpdatedAt,
                    300,
                )
            })
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].transaction_id, "local-old");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn content_amount_upserts_and_removes() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            let id = insert_cart(conn, "tx-1", CartType::Local, 1, 0)?;
            set_content_amount(conn, id, 7, 2)?;
            set_content_amount(conn, id, 7, 5)?;
            set_content_amount(conn, id, 8, 1)?;
            assert_eq!(content_amount(conn, id, 7)?, 5);
            assert_eq!(contents(conn, id)?.len(), 2);

            set_content_amount(conn, id, 8, 0)?;
            assert_eq!(content_amount(conn, id, 8)?, 0);
            assert_eq!(contents(conn, id)?.len(), 1);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn confirm_only_applies_to_open_remote_carts() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            let local = insert_cart(conn, "local", CartType::Local, 1, 0)?;
            let remote = insert_cart(conn, "remote", CartType::Remote, 1, 0)?;
            assert!(!confirm_reservation(conn, local, "{}", 10)?);
            assert!(confirm_reservation(conn, remote, "PICKUP-1", 10)?);

            let cart = get_cart(conn, remote)?.unwrap();
            assert_eq!(cart.status, CartStatus::Reserved);
            assert_eq!(cart.checkout_method, CheckoutMethod::Pickup);
            assert_eq!(cart.order_info, "PICKUP-1");
            assert_eq!(cart.locked_at, 10);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_old_terminal_carts() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            let done = insert_cart(conn, "done", CartType::Local, 1, 100)?;
            set_content_amount(conn, done, 7, 1)?;
            transition(conn, done, CartStatus::Open, CartStatus::Cancelled, 100, None)?;
            insert_cart(conn, "active", CartType::Local, 1, 100)?;

            assert_eq!(purge_terminal_before(conn, 100)?, 0);
            assert_eq!(purge_terminal_before(conn, 101)?, 1);
            assert!(get_cart(conn, done)?.is_none());
            assert!(contents(conn, done)?.is_empty());
            assert_eq!(list_carts(conn, None)?.len(), 1);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }
}
