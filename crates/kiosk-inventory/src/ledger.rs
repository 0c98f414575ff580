// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory ledger: authoritative stock per tray slot.
//!
//! `allocate` and `release` are single guarded statements, so a slot can
//! never be driven negative regardless of how callers interleave. The
//! synchronous forms in [`kiosk_storage::queries::inventory`] are the same
//! primitives for use inside an open transaction.

use kiosk_core::{InventorySlot, KioskError};
use kiosk_storage::Database;
use kiosk_storage::queries::inventory;
use tracing::{debug, info};

/// Async facade over the inventory table.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Database,
}

impl InventoryLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Quantity of `variant_id` at the slot; 0 when the slot holds another
    /// variant or does not exist.
    pub async fn get_available(
        &self,
        unit_id: i64,
        location: i64,
        variant_id: i64,
    ) -> Result<i64, KioskError> {
        self.db
            .with_conn(move |conn| inventory::available(conn, unit_id, location, variant_id))
            .await
    }

    /// Take `amount` from the slot or fail with `InsufficientStock`.
    pub async fn allocate(
        &self,
        unit_id: i64,
        location: i64,
        variant_id: i64,
        amount: i64,
    ) -> Result<(), KioskError> {
        self.db
            .with_conn(move |conn| inventory::allocate(conn, unit_id, location, variant_id, amount))
            .await?;
        debug!(unit_id, location, variant_id, amount, "stock allocated");
        Ok(())
    }

    /// Return `amount` to the slot. Must pair with an earlier allocation.
    pub async fn release(
        &self,
        unit_id: i64,
        location: i64,
        variant_id: i64,
        amount: i64,
    ) -> Result<(), KioskError> {
        self.db
            .with_conn(move |conn| inventory::release(conn, unit_id, location, variant_id, amount))
            .await?;
        debug!(unit_id, location, variant_id, amount, "stock released");
        Ok(())
    }

    /// Insert or replace a slot after checking its stocking data.
    ///
    /// `slot.quantity` becomes the slot's free stock as is: units held by
    /// outstanding reservations are not added back. Refill a slot that is
    /// in use with [`InventoryLedger::restock`] instead.
    pub async fn stock_slot(&self, slot: InventorySlot) -> Result<(), KioskError> {
        validate_slot(&slot)?;
        self.db
            .with_conn(move |conn| inventory::upsert_slot(conn, &slot))
            .await?;
        info!(
            unit_id = slot.unit_id,
            location = slot.location,
            variant_id = slot.variant_id,
            quantity = slot.quantity,
            "slot stocked"
        );
        Ok(())
    }

    /// Add `delta` units to the slot's free stock (negative to take units
    /// out). Returns the new free quantity. Reserved units are unaffected.
    pub async fn restock(
        &self,
        unit_id: i64,
        location: i64,
        variant_id: i64,
        delta: i64,
    ) -> Result<i64, KioskError> {
        let quantity = self
            .db
            .with_conn(move |conn| inventory::restock(conn, unit_id, location, variant_id, delta))
            .await?;
        info!(unit_id, location, variant_id, delta, quantity, "slot restocked");
        Ok(quantity)
    }

    pub async fn remove_slot(&self, unit_id: i64, location: i64) -> Result<bool, KioskError> {
        self.db
            .with_conn(move |conn| inventory::delete_slot(conn, unit_id, location))
            .await
    }

    pub async fn get_slot(
        &self,
        unit_id: i64,
        location: i64,
    ) -> Result<Option<InventorySlot>, KioskError> {
        self.db
            .with_conn(move |conn| inventory::get_slot(conn, unit_id, location))
            .await
    }

    /// Slots holding the variant, ordered by unit then location.
    pub async fn slots_for_variant(&self, variant_id: i64) -> Result<Vec<InventorySlot>, KioskError> {
        self.db
            .with_conn(move |conn| inventory::slots_for_variant(conn, variant_id))
            .await
    }

    pub async fn slots_for_unit(&self, unit_id: i64) -> Result<Vec<InventorySlot>, KioskError> {
        self.db
            .with_conn(move |conn| inventory::slots_for_unit(conn, unit_id))
            .await
    }

    pub async fn total_available(&self, variant_id: i64) -> Result<i64, KioskError> {
        self.db
            .with_conn(move |conn| inventory::total_available(conn, variant_id))
            .await
    }
}

/// Capacity checks for stocking data. Reservation paths never call this.
pub fn validate_slot(slot: &InventorySlot) -> Result<(), KioskError> {
    if slot.width <= 0 {
        return Err(KioskError::InvalidSlot(format!(
            "width must be positive, got {}",
            slot.width
        )));
    }
    if slot.depth <= 0 {
        return Err(KioskError::InvalidSlot(format!(
            "depth must be positive, got {}",
            slot.depth
        )));
    }
    if slot.quantity < 0 {
        return Err(KioskError::InvalidSlot(format!(
            "quantity cannot be negative, got {}",
            slot.quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(width: i64, depth: i64, quantity: i64) -> InventorySlot {
        InventorySlot {
            unit_id: 1,
            tray_number: 0,
            location: 3,
            variant_id: 7,
            quantity,
            width,
            depth,
        }
    }

    #[test]
    fn validate_slot_rejects_bad_capacity() {
        assert!(validate_slot(&slot(1, 10, 0)).is_ok());
        assert!(matches!(
            validate_slot(&slot(0, 10, 1)),
            Err(KioskError::InvalidSlot(m)) if m.contains("width")
        ));
        assert!(matches!(
            validate_slot(&slot(1, -1, 1)),
            Err(KioskError::InvalidSlot(m)) if m.contains("depth")
        ));
        assert!(matches!(
            validate_slot(&slot(1, 10, -1)),
            Err(KioskError::InvalidSlot(m)) if m.contains("quantity")
        ));
    }
}
