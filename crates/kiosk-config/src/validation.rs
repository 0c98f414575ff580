// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-zero timeouts, known log levels, KDF limits.

use crate::diagnostic::ConfigError;
use crate::model::KioskConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &KioskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.general.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "general.log_level `{}` must be one of {}",
                config.general.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    for (key, language) in [
        ("general.language", &config.general.language),
        ("general.fallback_language", &config.general.fallback_language),
    ] {
        if language.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    let cart = &config.cart;
    for (key, timeout) in [
        ("cart.expiration_timeout", cart.expiration_timeout),
        ("cart.prereservation_timeout", cart.prereservation_timeout),
        ("cart.reservation_timeout", cart.reservation_timeout),
        ("cart.order_history_timeout", cart.order_history_timeout),
        ("cart.security_timeout", cart.security_timeout),
    ] {
        if timeout.value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than zero"),
            });
        }
    }

    let currency = cart.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "cart.currency `{}` must be a three-letter ISO 4217 code",
                cart.currency
            ),
        });
    }

    if config.sweeper.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sweeper.interval_secs must be at least 1".to_string(),
        });
    }

    // Argon2 requires at least 8 KiB of memory per lane.
    let auth = &config.auth;
    if auth.kdf_parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "auth.kdf_parallelism must be at least 1, got {}",
                auth.kdf_parallelism
            ),
        });
    } else if auth.kdf_memory_cost < 8 * auth.kdf_parallelism {
        errors.push(ConfigError::Validation {
            message: format!(
                "auth.kdf_memory_cost must be at least {} KiB, got {}",
                8 * auth.kdf_parallelism,
                auth.kdf_memory_cost
            ),
        });
    }

    if auth.kdf_iterations < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "auth.kdf_iterations must be at least 1, got {}",
                auth.kdf_iterations
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
