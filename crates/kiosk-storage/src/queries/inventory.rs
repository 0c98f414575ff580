// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory slot queries.
//!
//! Stock changes are single guarded `UPDATE` statements: the quantity check
//! and the write happen in one statement, never as read-modify-write.

use kiosk_core::{InventorySlot, KioskError};
use rusqlite::{Connection, OptionalExtension, Row, params};

const SLOT_COLUMNS: &str = "unit_id, tray_number, location, variant_id, quantity, width, depth";

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<InventorySlot> {
    Ok(InventorySlot {
        unit_id: row.get(0)?,
        tray_number: row.get(1)?,
        location: row.get(2)?,
        variant_id: row.get(3)?,
        quantity: row.get(4)?,
        width: row.get(5)?,
        depth: row.get(6)?,
    })
}

fn ensure_positive(amount: i64) -> Result<(), KioskError> {
    if amount <= 0 {
        return Err(KioskError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Fetch the slot at `(unit_id, location)`.
pub fn get_slot(
    conn: &Connection,
    unit_id: i64,
    location: i64,
) -> Result<Option<InventorySlot>, KioskError> {
    let sql = format!("SELECT {SLOT_COLUMNS} FROM inventory WHERE unit_id = ?1 AND location = ?2");
    Ok(conn
        .query_row(&sql, params![unit_id, location], slot_from_row)
        .optional()?)
}

/// Quantity of `variant_id` at the slot, 0 when the slot holds something else
/// or does not exist.
pub fn available(
    conn: &Connection,
    unit_id: i64,
    location: i64,
    variant_id: i64,
) -> Result<i64, KioskError> {
    let quantity = conn
        .query_row(
            "SELECT quantity FROM inventory
             WHERE unit_id = ?1 AND location = ?2 AND variant_id = ?3",
            params![unit_id, location, variant_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(quantity.unwrap_or(0))
}

/// Take `amount` units from the slot.
///
/// Fails with `InsufficientStock` and leaves the slot untouched when the
/// slot does not hold at least `amount` of the variant.
pub fn allocate(
    conn: &Connection,
    unit_id: i64,
    location: i64,
    variant_id: i64,
    amount: i64,
) -> Result<(), KioskError> {
    ensure_positive(amount)?;
    let changed = conn.execute(
        "UPDATE inventory SET quantity = quantity - ?4
         WHERE unit_id = ?1 AND location = ?2 AND variant_id = ?3 AND quantity >= ?4",
        params![unit_id, location, variant_id, amount],
    )?;
    if changed == 0 {
        return Err(KioskError::InsufficientStock {
            variant_id,
            requested: amount,
            available: available(conn, unit_id, location, variant_id)?,
        });
    }
    Ok(())
}

/// Return `amount` units to the slot.
pub fn release(
    conn: &Connection,
    unit_id: i64,
    location: i64,
    variant_id: i64,
    amount: i64,
) -> Result<(), KioskError> {
    ensure_positive(amount)?;
    let changed = conn.execute(
        "UPDATE inventory SET quantity = quantity + ?4
         WHERE unit_id = ?1 AND location = ?2 AND variant_id = ?3",
        params![unit_id, location, variant_id, amount],
    )?;
    if changed == 0 {
        return Err(KioskError::SlotNotFound {
            unit_id,
            location,
            variant_id,
        });
    }
    Ok(())
}

/// Adjust the slot's stock by `delta` units (positive to refill, negative
/// to take units out for servicing).
///
/// Reserved units are already deducted from `quantity`, so a delta never
/// touches what carts hold. A negative delta larger than the free stock
/// fails with `InsufficientStock` and changes nothing.
pub fn restock(
    conn: &Connection,
    unit_id: i64,
    location: i64,
    variant_id: i64,
    delta: i64,
) -> Result<i64, KioskError> {
    if delta == 0 {
        return Err(KioskError::InvalidAmount("restock delta cannot be zero".into()));
    }
    let quantity = conn
        .query_row(
            "UPDATE inventory SET quantity = quantity + ?4
             WHERE unit_id = ?1 AND location = ?2 AND variant_id = ?3 AND quantity + ?4 >= 0
             RETURNING quantity",
            params![unit_id, location, variant_id, delta],
            |row| row.get(0),
        )
        .optional()?;
    match quantity {
        Some(quantity) => Ok(quantity),
        None => match get_slot(conn, unit_id, location)? {
            Some(slot) if slot.variant_id == variant_id => Err(KioskError::InsufficientStock {
                variant_id,
                requested: -delta,
                available: slot.quantity,
            }),
            _ => Err(KioskError::SlotNotFound {
                unit_id,
                location,
                variant_id,
            }),
        },
    }
}

/// Insert or replace the slot at `(unit_id, location)`.
///
/// `slot.quantity` is the free stock after reservations, not the physical
/// count in the tray. Use [`restock`] to adjust a slot that carts may
/// already hold units from.
pub fn upsert_slot(conn: &Connection, slot: &InventorySlot) -> Result<(), KioskError> {
    conn.execute(
        "INSERT INTO inventory (unit_id, tray_number, location, variant_id, quantity, width, depth)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (unit_id, location) DO UPDATE SET
             tray_number = excluded.tray_number,
             variant_id = excluded.variant_id,
             quantity = excluded.quantity,
             width = excluded.width,
             depth = excluded.depth",
        params![
            slot.unit_id,
            slot.tray_number,
            slot.location,
            slot.variant_id,
            slot.quantity,
            slot.width,
            slot.depth,
        ],
    )?;
    Ok(())
}

/// Delete the slot. Returns whether a row existed.
pub fn delete_slot(conn: &Connection, unit_id: i64, location: i64) -> Result<bool, KioskError> {
    let changed = conn.execute(
        "DELETE FROM inventory WHERE unit_id = ?1 AND location = ?2",
        params![unit_id, location],
    )?;
    Ok(changed > 0)
}

/// Slots holding `variant_id`, ordered by unit then location.
pub fn slots_for_variant(
    conn: &Connection,
    variant_id: i64,
) -> Result<Vec<InventorySlot>, KioskError> {
    let sql = format!(
        "SELECT {SLOT_COLUMNS} FROM inventory WHERE variant_id = ?1 ORDER BY unit_id, location"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![variant_id], slot_from_row)?;
    let mut slots = Vec::new();
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

/// All slots of one vending unit, ordered by location.
pub fn slots_for_unit(conn: &Connection, unit_id: i64) -> Result<Vec<InventorySlot>, KioskError> {
    let sql = format!("SELECT {SLOT_COLUMNS} FROM inventory WHERE unit_id = ?1 ORDER BY location");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![unit_id], slot_from_row)?;
    let mut slots = Vec::new();
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

/// Sum of the quantities of `variant_id` across all slots.
pub fn total_available(conn: &Connection, variant_id: i64) -> Result<i64, KioskError> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0) FROM inventory WHERE variant_id = ?1",
        params![variant_id],
        |row| row.get(0),
    )?)
}
