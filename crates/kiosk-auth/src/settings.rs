// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted global-config overrides.
//!
//! Overrides are dotted keys (`cart.expiration_timeout`) with raw string
//! values. They are layered onto the static configuration at explicit reload
//! points; components keep the `Arc<KioskConfig>` they were built with.

use std::sync::Arc;

use kiosk_config::{ConfigError, KioskConfig, apply_overrides};
use kiosk_core::{Clock, KioskError};
use kiosk_storage::Database;
use kiosk_storage::queries::settings;
use tracing::info;

fn to_kiosk_error(errors: Vec<ConfigError>) -> KioskError {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    KioskError::Config(messages.join("; "))
}

#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

impl SettingsStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Persist an override after checking that every stored override plus
    /// this one still yields a valid configuration on top of `base`.
    pub async fn set(&self, base: &KioskConfig, key: &str, value: &str) -> Result<(), KioskError> {
        let mut pending = settings::list_values(&self.db).await?;
        pending.retain(|(k, _)| k != key);
        pending.push((key.to_string(), value.to_string()));
        apply_overrides(base, pending).map_err(to_kiosk_error)?;

        settings::set_value(&self.db, key, value, self.clock.unix_now()).await?;
        info!(key, value, "config override stored");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, KioskError> {
        settings::get_value(&self.db, key).await
    }

    /// Remove an override. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool, KioskError> {
        let removed = settings::remove_value(&self.db, key).await?;
        if removed {
            info!(key, "config override removed");
        }
        Ok(removed)
    }

    /// All overrides ordered by key.
    pub async fn list(&self) -> Result<Vec<(String, String)>, KioskError> {
        settings::list_values(&self.db).await
    }

    /// Layer the stored overrides onto `base` and validate the result.
    pub async fn effective_config(&self, base: &KioskConfig) -> Result<Arc<KioskConfig>, KioskError> {
        let overrides = settings::list_values(&self.db).await?;
        let count = overrides.len();
        let config = apply_overrides(base, overrides).map_err(to_kiosk_error)?;
        if count > 0 {
            info!(count, "config overrides applied");
        }
        Ok(Arc::new(config))
    }
}
