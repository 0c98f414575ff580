// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator credentials and runtime configuration overrides.
//!
//! - [`UserStore`] keeps Argon2id password hashes and verifies logins.
//! - [`SettingsStore`] persists global-config overrides and builds the
//!   effective configuration from them.

pub mod password;
pub mod settings;
pub mod users;

pub use settings::SettingsStore;
pub use users::UserStore;
