// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the kiosk reservation engine.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, layering of
//! persisted global-config overrides, and diagnostic error rendering with typo
//! suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use kiosk_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("expiration after {:?}", config.cart.expiration_timeout());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod overrides;
pub mod validation;

pub use diagnostic::{ConfigError, TomlSource, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{CartConfig, KioskConfig, TimeUnit, Timeout};
pub use overrides::apply_overrides;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `KioskConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<KioskConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from an explicit file (plus env vars) and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<KioskConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources: Vec<TomlSource> = TomlSource::read(path).into_iter().collect();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<KioskConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = [TomlSource::new("<inline>", toml_content)];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect the TOML files of the lookup chain for error labels.
fn collect_toml_sources() -> Vec<TomlSource> {
    let local = std::env::current_dir()
        .map(|d| d.join("kiosk.toml"))
        .unwrap_or_else(|_| "kiosk.toml".into());
    let user = dirs::config_dir().map(|d| d.join("kiosk/kiosk.toml"));

    [Some(local), user, Some("/etc/kiosk/kiosk.toml".into())]
        .into_iter()
        .flatten()
        .filter_map(|path: std::path::PathBuf| TomlSource::read(&path))
        .collect()
}
