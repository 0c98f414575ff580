// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiosk serve` and `kiosk sweep` command implementations.

use std::sync::Arc;

use kiosk_auth::SettingsStore;
use kiosk_cart::{ExpirationSweeper, SweepReport};
use kiosk_config::KioskConfig;
use kiosk_core::{Clock, KioskError, SystemClock};
use kiosk_inventory::ReservationCoordinator;
use kiosk_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::shutdown::install_signal_handler;

/// Open the database and layer persisted overrides onto the static config.
async fn open(config: &KioskConfig) -> Result<(Database, Arc<dyn Clock>, Arc<KioskConfig>), KioskError> {
    let db = Database::open_with_config(&config.storage).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let effective = SettingsStore::new(db.clone(), clock.clone())
        .effective_config(config)
        .await?;
    Ok((db, clock, effective))
}

/// Run the engine until SIGINT or SIGTERM.
pub async fn run_serve(config: KioskConfig) -> Result<(), KioskError> {
    serve_until(config, install_signal_handler()).await
}

pub(crate) async fn serve_until(
    config: KioskConfig,
    cancel: CancellationToken,
) -> Result<(), KioskError> {
    info!(name = %config.general.name, "starting kiosk serve");
    let (db, clock, config) = open(&config).await?;

    // Slots may have been re-planned while the engine was down.
    let unresolved = ReservationCoordinator::new(db.clone()).relocate_all().await?;
    if !unresolved.is_empty() {
        warn!(
            count = unresolved.len(),
            "reservations point at slots that no longer hold their variant"
        );
    }

    let sweeper = ExpirationSweeper::new(db.clone(), clock, config);
    sweeper.run(cancel).await;

    db.close().await?;
    info!("kiosk serve stopped");
    Ok(())
}

/// Run a single sweep pass and return what it changed.
pub async fn run_sweep(config: KioskConfig) -> Result<SweepReport, KioskError> {
    let (db, clock, config) = open(&config).await?;
    let report = ExpirationSweeper::new(db.clone(), clock, config)
        .sweep()
        .await?;
    db.close().await?;
    Ok(report)
}
