// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layering of persisted global-config overrides onto a loaded configuration.
//!
//! Overrides are dotted keys (`cart.expiration_timeout`,
//! `cart.reservation_timeout.unit`) with raw string values as stored in the
//! database. Each value is parsed the way Figment parses environment
//! variables, so `"30"` becomes an integer and `"EUR"` stays a string.

#![allow(clippy::result_large_err)]

use figment::{Figment, providers::Serialized, value::Value};

use crate::diagnostic::{ConfigError, figment_to_config_errors};
use crate::model::KioskConfig;
use crate::validation::validate_config;

/// Apply `overrides` on top of `base` and re-validate the result.
///
/// `base` is not modified. Later entries win over earlier ones for the same key.
pub fn apply_overrides<I, K, V>(
    base: &KioskConfig,
    overrides: I,
) -> Result<KioskConfig, Vec<ConfigError>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut figment = Figment::new().merge(Serialized::defaults(base.clone()));
    let mut errors = Vec::new();

    for (key, raw) in overrides {
        let key = key.as_ref();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            errors.push(ConfigError::Override {
                key: key.to_string(),
                detail: "key must be a dotted path such as `cart.currency`".to_string(),
            });
            continue;
        }
        let value = parse_value(raw.as_ref());
        tracing::debug!(key, "applying config override");
        figment = figment.merge(Serialized::default(key, value));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let config: KioskConfig = figment
        .extract()
        .map_err(|e| figment_to_config_errors(e, &[]))?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_value(raw: &str) -> Value {
    match raw.parse::<Value>() {
        Ok(v) => v,
        Err(never) => match never {},
    }
}
