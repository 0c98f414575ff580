// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cart lifecycle for the kiosk reservation engine.
//!
//! - [`CartManager`] drives the cart state machine and keeps cart contents
//!   and reservations in step.
//! - [`OrderHistoryLedger`] is the append-only record of finished carts.
//! - [`ExpirationSweeper`] enforces the lock, expiration, pre-reservation,
//!   reservation and retention timeouts.

pub mod history;
pub mod manager;
pub mod sweeper;

pub use history::OrderHistoryLedger;
pub use manager::CartManager;
pub use sweeper::{ExpirationSweeper, SweepReport};
