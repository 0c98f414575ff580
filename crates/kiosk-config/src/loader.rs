// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kiosk.toml` > `~/.config/kiosk/kiosk.toml` > `/etc/kiosk/kiosk.toml`
//! with environment variable overrides via `KIOSK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KioskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kiosk/kiosk.toml` (system-wide)
/// 3. `~/.config/kiosk/kiosk.toml` (user XDG config)
/// 4. `./kiosk.toml` (local directory)
/// 5. `KIOSK_*` environment variables
pub fn load_config() -> Result<KioskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<KioskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KioskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KioskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KioskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KioskConfig::default()))
        .merge(Toml::file("/etc/kiosk/kiosk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kiosk/kiosk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kiosk.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `KIOSK_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `KIOSK_CART_EXPIRATION_TIMEOUT` must map to
/// `cart.expiration_timeout`, not `cart.expiration.timeout`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("KIOSK_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["general", "storage", "cart", "sweeper", "auth"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
