// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiosk config` command implementations.

use std::sync::Arc;

use kiosk_auth::SettingsStore;
use kiosk_config::KioskConfig;
use kiosk_core::{KioskError, SystemClock};
use kiosk_storage::Database;

async fn with_store<T, F, Fut>(config: &KioskConfig, f: F) -> Result<T, KioskError>
where
    F: FnOnce(SettingsStore) -> Fut,
    Fut: std::future::Future<Output = Result<T, KioskError>>,
{
    let db = Database::open_with_config(&config.storage).await?;
    let out = f(SettingsStore::new(db.clone(), Arc::new(SystemClock))).await;
    db.close().await?;
    out
}

/// Persist a validated override.
pub async fn run_set(config: &KioskConfig, key: &str, value: &str) -> Result<(), KioskError> {
    with_store(config, |store| async move { store.set(config, key, value).await }).await?;
    println!("{key} = {value}");
    Ok(())
}

pub async fn run_unset(config: &KioskConfig, key: &str) -> Result<(), KioskError> {
    let removed = with_store(config, |store| async move { store.remove(key).await }).await?;
    if removed {
        println!("{key} removed");
    } else {
        println!("{key} was not set");
    }
    Ok(())
}

pub async fn run_list(config: &KioskConfig) -> Result<(), KioskError> {
    let overrides = with_store(config, |store| async move { store.list().await }).await?;
    if overrides.is_empty() {
        println!("no overrides stored");
    }
    for (key, value) in overrides {
        println!("{key} = {value}");
    }
    Ok(())
}
