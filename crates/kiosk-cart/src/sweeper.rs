// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiration sweeper.
//!
//! Each pass applies, in order:
//!
//! 1. locked carts past the security timeout go back to `open`;
//! 2. local open carts idle past the expiration timeout expire;
//! 3. remote open carts idle past the pre-reservation timeout expire;
//! 4. reserved carts held past the reservation timeout expire;
//! 5. history rows and terminal carts older than the retention are purged.
//!
//! Deadlines are computed from persisted timestamps, so a restarted process
//! picks up every pending timeout on its first pass. Each cart is handled in
//! its own transaction guarded on the status and activity timestamp that were
//! read; a cart that changed in between is skipped.

use std::sync::Arc;
use std::time::Duration;

use kiosk_config::KioskConfig;
use kiosk_core::{Cart, CartStatus, CartType, Clock, CompletionCause, KioskError};
use kiosk_storage::Database;
use kiosk_storage::queries::carts::{self, DeadlineColumn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::history::OrderHistoryLedger;
use crate::manager::finish_in;

/// Counts of what one pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub unlocked: usize,
    pub expired: usize,
    pub prereservations_expired: usize,
    pub reservations_expired: usize,
    pub history_purged: usize,
    pub carts_purged: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// Timestamps strictly before this are older than `timeout` at `now`; a
/// deadline `timestamp + timeout` equal to `now` has not passed yet.
fn cutoff(now: i64, timeout: Duration) -> i64 {
    now.saturating_sub(i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX))
}

#[derive(Clone)]
pub struct ExpirationSweeper {
    db: Database,
    clock: Arc<dyn Clock>,
    config: Arc<KioskConfig>,
    history: OrderHistoryLedger,
}

impl std::fmt::Debug for ExpirationSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationSweeper")
            .field("interval_secs", &self.config.sweeper.interval_secs)
            .finish_non_exhaustive()
    }
}

impl ExpirationSweeper {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: Arc<KioskConfig>) -> Self {
        let history = OrderHistoryLedger::new(db.clone());
        Self {
            db,
            clock,
            config,
            history,
        }
    }

    /// Run one pass over every policy.
    pub async fn sweep(&self) -> Result<SweepReport, KioskError> {
        let now = self.clock.unix_now();
        let cart = &self.config.cart;
        let mut report = SweepReport::default();

        let due = self
            .due(
                CartStatus::Locked,
                None,
                DeadlineColumn::LockedAt,
                cutoff(now, cart.security_timeout()),
            )
            .await?;
        for c in due {
            if self.unlock_one(&c, now).await {
                report.unlocked += 1;
            }
        }

        let due = self
            .due(
                CartStatus::Open,
                Some(CartType::Local),
                DeadlineColumn::UpdatedAt,
                cutoff(now, cart.expiration_timeout()),
            )
            .await?;
        for c in due {
            if self.expire_one(c, CompletionCause::Expired, now).await {
                report.expired += 1;
            }
        }

        let due = self
            .due(
                CartStatus::Open,
                Some(CartType::Remote),
                DeadlineColumn::UpdatedAt,
                cutoff(now, cart.prereservation_timeout()),
            )
            .await?;
        for c in due {
            if self
                .expire_one(c, CompletionCause::PrereservationExpired, now)
                .await
            {
                report.prereservations_expired += 1;
            }
        }

        let due = self
            .due(
                CartStatus::Reserved,
                None,
                DeadlineColumn::LockedAt,
                cutoff(now, cart.reservation_timeout()),
            )
            .await?;
        for c in due {
            if self
                .expire_one(c, CompletionCause::ReservationExpired, now)
                .await
            {
                report.reservations_expired += 1;
            }
        }

        if self.config.sweeper.purge_enabled {
            let retention = cutoff(now, cart.order_history_timeout());
            report.history_purged = self.history.purge_older_than(retention).await?;
            report.carts_purged = self
                .db
                .transact(move |tx| carts::purge_terminal_before(tx, retention))
                .await?;
        }

        Ok(report)
    }

    async fn due(
        &self,
        status: CartStatus,
        cart_type: Option<CartType>,
        column: DeadlineColumn,
        cutoff: i64,
    ) -> Result<Vec<Cart>, KioskError> {
        self.db
            .with_conn(move |conn| carts::find_due(conn, status, cart_type, column, cutoff))
            .await
    }

    async fn unlock_one(&self, cart: &Cart, now: i64) -> bool {
        let cart_id = cart.id;
        let seen = cart.updated_at;
        let result = self
            .db
            .transact(move |tx| {
                carts::transition(
                    tx,
                    cart_id,
                    CartStatus::Locked,
                    CartStatus::Open,
                    now,
                    Some(seen),
                )
            })
            .await;
        match result {
            Ok(true) => {
                info!(cart_id, "lock timed out, cart reopened");
                true
            }
            Ok(false) => {
                debug!(cart_id, "cart changed before unlock, skipped");
                false
            }
            Err(e) => {
                warn!(cart_id, error = %e, "failed to unlock cart (non-fatal)");
                false
            }
        }
    }

    async fn expire_one(&self, cart: Cart, cause: CompletionCause, now: i64) -> bool {
        let cart_id = cart.id;
        let seen = Some(cart.updated_at);
        let result = self
            .db
            .transact(move |tx| finish_in(tx, &cart, cause, now, seen))
            .await;
        match result {
            Ok(true) => {
                info!(cart_id, %cause, "cart expired");
                true
            }
            Ok(false) => {
                debug!(cart_id, %cause, "cart changed before expiry, skipped");
                false
            }
            Err(e) => {
                warn!(cart_id, error = %e, "failed to expire cart (non-fatal)");
                false
            }
        }
    }

    /// Sweep on the configured interval until `cancel` fires.
    ///
    /// The first pass runs immediately, which resumes timeouts that lapsed
    /// while the process was down.
    pub async fn run(self, cancel: CancellationToken) {
        let interval_secs = self.config.sweeper.interval_secs.max(1);
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs, "expiration sweeper started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(report) if !report.is_empty() => {
                            info!(?report, "sweep pass completed");
                        }
                        Ok(_) => {
                            debug!("sweep pass found nothing due");
                        }
                        Err(e) => {
                            warn!(error = %e, "sweep pass failed (non-fatal)");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("expiration sweeper shutting down");
                    break;
                }
            }
        }
    }
}
