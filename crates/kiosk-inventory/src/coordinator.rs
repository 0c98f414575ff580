// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reservation coordinator: splits requested quantities across slots.
//!
//! Candidate slots for a variant are consumed greedily in ascending
//! `(unit_id, location)` order; each consumed portion becomes one reservation
//! row. A multi-line request runs inside a savepoint, so a shortfall on any
//! line undoes every slot decrement and row the request made.
//!
//! The `*_in` functions operate on a caller's open transaction so the cart
//! manager can combine them with content and status changes in one unit of
//! work. The async methods on [`ReservationCoordinator`] wrap each in its own
//! transaction.

use std::collections::{BTreeMap, BTreeSet};

use kiosk_core::{KioskError, Reservation};
use kiosk_storage::Database;
use kiosk_storage::queries::{inventory, reservations};
use rusqlite::{Connection, Transaction};
use tracing::{debug, error, info, warn};

/// Reserve every `(variant_id, amount)` line for `cart_id`, or nothing.
pub fn allocate_in(
    tx: &mut Transaction<'_>,
    cart_id: i64,
    lines: &[(i64, i64)],
) -> Result<Vec<Reservation>, KioskError> {
    let sp = tx.savepoint()?;
    let mut created = Vec::new();

    for &(variant_id, amount) in lines {
        if amount <= 0 {
            return Err(KioskError::InvalidAmount(format!(
                "requested amount must be positive, got {amount} for variant {variant_id}"
            )));
        }

        let slots = inventory::slots_for_variant(&sp, variant_id)?;
        let available: i64 = slots.iter().map(|s| s.quantity).sum();
        if available < amount {
            debug!(
                cart_id,
                variant_id, amount, available, "allocation short, rolling back"
            );
            return Err(KioskError::InsufficientStock {
                variant_id,
                requested: amount,
                available,
            });
        }

        let mut remaining = amount;
        for slot in slots {
            if remaining == 0 {
                break;
            }
            let take = slot.quantity.min(remaining);
            if take == 0 {
                continue;
            }
            inventory::allocate(&sp, slot.unit_id, slot.location, variant_id, take)?;
            created.push(reservations::insert_reservation(
                &sp,
                cart_id,
                variant_id,
                slot.unit_id,
                slot.location,
                take,
            )?);
            remaining -= take;
        }
    }

    sp.commit()?;
    Ok(created)
}

/// Release one reservation's quantity back to its slot.
///
/// A slot that no longer holds the variant (removed by a planogram change)
/// has nothing to return the stock to; that is logged and skipped.
fn release_to_slot(conn: &Connection, r: &Reservation, amount: i64) -> Result<(), KioskError> {
    match inventory::release(conn, r.unit_id, r.location, r.variant_id, amount) {
        Ok(()) => Ok(()),
        Err(KioskError::SlotNotFound { .. }) => {
            warn!(
                reservation_id = r.id,
                cart_id = r.cart_id,
                unit_id = r.unit_id,
                location = r.location,
                variant_id = r.variant_id,
                "reserved slot no longer holds the variant, stock not returned"
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Release every reservation of the cart and delete the rows.
///
/// Returns the total quantity released.
pub fn release_cart_in(conn: &Connection, cart_id: i64) -> Result<i64, KioskError> {
    let mut released = 0;
    for r in reservations::for_cart(conn, cart_id)? {
        release_to_slot(conn, &r, r.quantity)?;
        reservations::delete(conn, r.id)?;
        released += r.quantity;
    }
    Ok(released)
}

/// Release exactly `amount` of `variant_id` held by the cart, newest
/// reservation first, shrinking or deleting rows.
pub fn release_variant_in(
    conn: &Connection,
    cart_id: i64,
    variant_id: i64,
    amount: i64,
) -> Result<(), KioskError> {
    if amount <= 0 {
        return Err(KioskError::InvalidAmount(format!(
            "release amount must be positive, got {amount}"
        )));
    }
    let held = reservations::reserved_amount(conn, cart_id, variant_id)?;
    if held < amount {
        return Err(KioskError::InvalidAmount(format!(
            "cart {cart_id} holds {held} of variant {variant_id}, cannot release {amount}"
        )));
    }

    let mut remaining = amount;
    for r in reservations::for_cart_variant_newest_first(conn, cart_id, variant_id)? {
        if remaining == 0 {
            break;
        }
        let take = r.quantity.min(remaining);
        release_to_slot(conn, &r, take)?;
        if take == r.quantity {
            reservations::delete(conn, r.id)?;
        } else {
            reservations::set_quantity(conn, r.id, r.quantity - take)?;
        }
        remaining -= take;
    }
    Ok(())
}

/// Repoint reservations of `variant_id` whose slot no longer holds it.
///
/// Per cart, locations that still hold the variant are kept; each moved
/// reservation takes a location of the same unit not already used by that
/// cart. Reservations with no such location are returned unchanged.
pub fn relocate_in(conn: &Connection, variant_id: i64) -> Result<Vec<Reservation>, KioskError> {
    let mut by_unit: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for slot in inventory::slots_for_variant(conn, variant_id)? {
        by_unit.entry(slot.unit_id).or_default().push(slot.location);
    }

    let mut by_cart: BTreeMap<i64, Vec<Reservation>> = BTreeMap::new();
    for r in reservations::for_variant(conn, variant_id)? {
        by_cart.entry(r.cart_id).or_default().push(r);
    }

    let mut unresolved = Vec::new();
    for (cart_id, held) in by_cart {
        let holds_variant = |r: &Reservation| {
            by_unit
                .get(&r.unit_id)
                .is_some_and(|locations| locations.contains(&r.location))
        };

        let mut used: BTreeSet<(i64, i64)> = held
            .iter()
            .filter(|r| holds_variant(r))
            .map(|r| (r.unit_id, r.location))
            .collect();

        for r in held.iter().filter(|r| !holds_variant(r)) {
            let target = by_unit.get(&r.unit_id).and_then(|locations| {
                locations
                    .iter()
                    .copied()
                    .find(|loc| !used.contains(&(r.unit_id, *loc)))
            });
            match target {
                Some(location) => {
                    reservations::set_location(conn, r.id, location)?;
                    used.insert((r.unit_id, location));
                    info!(
                        cart_id,
                        variant_id,
                        unit_id = r.unit_id,
                        from = r.location,
                        to = location,
                        "reservation relocated"
                    );
                }
                None => {
                    error!(
                        cart_id,
                        variant_id,
                        unit_id = r.unit_id,
                        location = r.location,
                        "failed to relocate reservation"
                    );
                    unresolved.push(*r);
                }
            }
        }
    }
    Ok(unresolved)
}

/// Async entry points, each running in its own transaction.
#[derive(Debug, Clone)]
pub struct ReservationCoordinator {
    db: Database,
}

impl ReservationCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Reserve all lines for the cart or fail with `InsufficientStock`,
    /// leaving no trace.
    pub async fn allocate(
        &self,
        cart_id: i64,
        lines: Vec<(i64, i64)>,
    ) -> Result<Vec<Reservation>, KioskError> {
        let created = self
            .db
            .transact(move |tx| allocate_in(tx, cart_id, &lines))
            .await?;
        debug!(cart_id, rows = created.len(), "reservations created");
        Ok(created)
    }

    pub async fn release_cart(&self, cart_id: i64) -> Result<i64, KioskError> {
        self.db
            .transact(move |tx| release_cart_in(tx, cart_id))
            .await
    }

    pub async fn release_variant(
        &self,
        cart_id: i64,
        variant_id: i64,
        amount: i64,
    ) -> Result<(), KioskError> {
        self.db
            .transact(move |tx| release_variant_in(tx, cart_id, variant_id, amount))
            .await
    }

    pub async fn reservations(&self, cart_id: i64) -> Result<Vec<Reservation>, KioskError> {
        self.db
            .with_conn(move |conn| reservations::for_cart(conn, cart_id))
            .await
    }

    /// Relocate reservations of one variant after a planogram change.
    pub async fn relocate(&self, variant_id: i64) -> Result<Vec<Reservation>, KioskError> {
        self.db
            .transact(move |tx| relocate_in(tx, variant_id))
            .await
    }

    /// Relocate reservations of every reserved variant.
    pub async fn relocate_all(&self) -> Result<Vec<Reservation>, KioskError> {
        self.db
            .transact(|tx| {
                let variants: BTreeSet<i64> = {
                    let mut stmt = tx.prepare("SELECT DISTINCT variant_id FROM reservation")?;
                    let rows = stmt.query_map([], |row| row.get(0))?;
                    rows.collect::<Result<_, _>>()?
                };
                let mut unresolved = Vec::new();
                for variant_id in variants {
                    unresolved.extend(relocate_in(tx, variant_id)?);
                }
                Ok(unresolved)
            })
            .await
    }
}
