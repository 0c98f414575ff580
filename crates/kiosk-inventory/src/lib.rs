// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory ledger and reservation coordinator.
//!
//! The [`InventoryLedger`] owns slot quantities and only changes them through
//! guarded conditional updates. The [`ReservationCoordinator`] turns a cart's
//! requested lines into concrete per-slot reservations, all-or-nothing.

pub mod coordinator;
pub mod ledger;

pub use coordinator::ReservationCoordinator;
pub use ledger::InventoryLedger;
