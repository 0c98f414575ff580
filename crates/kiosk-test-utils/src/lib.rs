// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for kiosk integration tests.
//!
//! Provides a throwaway database seeded with a small catalog and stock,
//! a manual clock and a configuration tuned for fast tests.
//!
//! # Components
//!
//! - [`TestHarness`] - temp SQLite database, seeded catalog, manual clock

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
