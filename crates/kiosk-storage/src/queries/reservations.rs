// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reservation row queries.

use kiosk_core::{KioskError, Reservation};
use rusqlite::{Connection, Row, params};

const RESERVATION_COLUMNS: &str = "id, cart_id, variant_id, unit_id, location, quantity";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        cart_id: row.get(1)?,
        variant_id: row.get(2)?,
        unit_id: row.get(3)?,
        location: row.get(4)?,
        quantity: row.get(5)?,
    })
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Reservation>, KioskError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, reservation_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Insert a reservation row and return it.
pub fn insert_reservation(
    conn: &Connection,
    cart_id: i64,
    variant_id: i64,
    unit_id: i64,
    location: i64,
    quantity: i64,
) -> Result<Reservation, KioskError> {
    conn.execute(
        "INSERT INTO reservation (cart_id, variant_id, unit_id, location, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![cart_id, variant_id, unit_id, location, quantity],
    )?;
    Ok(Reservation {
        id: conn.last_insert_rowid(),
        cart_id,
        variant_id,
        unit_id,
        location,
        quantity,
    })
}

/// All reservations of a cart in creation order.
pub fn for_cart(conn: &Connection, cart_id: i64) -> Result<Vec<Reservation>, KioskError> {
    let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservation WHERE cart_id = ?1 ORDER BY id");
    collect(conn, &sql, params![cart_id])
}

/// Reservations of one variant in a cart, newest first.
pub fn for_cart_variant_newest_first(
    conn: &Connection,
    cart_id: i64,
    variant_id: i64,
) -> Result<Vec<Reservation>, KioskError> {
    let sql = format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservation
         WHERE cart_id = ?1 AND variant_id = ?2 ORDER BY id DESC"
    );
    collect(conn, &sql, params![cart_id, variant_id])
}

/// All reservations holding `variant_id`, across carts.
pub fn for_variant(conn: &Connection, variant_id: i64) -> Result<Vec<Reservation>, KioskError> {
    let sql =
        format!("SELECT {RESERVATION_COLUMNS} FROM reservation WHERE variant_id = ?1 ORDER BY id");
    collect(conn, &sql, params![variant_id])
}

/// Sum of reserved quantity of `variant_id` for the cart.
pub fn reserved_amount(conn: &Connection, cart_id: i64, variant_id: i64) -> Result<i64, KioskError> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0) FROM reservation WHERE cart_id = ?1 AND variant_id = ?2",
        params![cart_id, variant_id],
        |row| row.get(0),
    )?)
}

pub fn set_quantity(conn: &Connection, id: i64, quantity: i64) -> Result<(), KioskError> {
    let changed = conn.execute(
        "UPDATE reservation SET quantity = ?2 WHERE id = ?1",
        params![id, quantity],
    )?;
    if changed == 0 {
        return Err(KioskError::ReservationNotFound(id));
    }
    Ok(())
}

/// Point a reservation at another location of the same unit.
pub fn set_location(conn: &Connection, id: i64, location: i64) -> Result<(), KioskError> {
    let changed = conn.execute(
        "UPDATE reservation SET location = ?2 WHERE id = ?1",
        params![id, location],
    )?;
    if changed == 0 {
        return Err(KioskError::ReservationNotFound(id));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<(), KioskError> {
    let changed = conn.execute("DELETE FROM reservation WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(KioskError::ReservationNotFound(id));
    }
    Ok(())
}
