// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the expiration policies.

use std::time::Duration;

use kiosk_cart::{CartManager, ExpirationSweeper, OrderHistoryLedger, SweepReport};
use kiosk_core::{CartStatus, CartType, CompletionCause};
use kiosk_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

struct Fixture {
    h: TestHarness,
    carts: CartManager,
    sweeper: ExpirationSweeper,
    history: OrderHistoryLedger,
}

async fn fixture() -> Fixture {
    let h = TestHarness::builder()
        .with_slot(1, 3, 7, 2)
        .with_slot(1, 9, 7, 5)
        .build()
        .await
        .unwrap();
    let carts = CartManager::new(h.db.clone(), h.clock.clone());
    let sweeper = ExpirationSweeper::new(h.db.clone(), h.clock.clone(), h.config.clone());
    let history = OrderHistoryLedger::new(h.db.clone());
    Fixture {
        h,
        carts,
        sweeper,
        history,
    }
}

#[tokio::test]
async fn locked_cart_is_reopened_exactly_once() {
    let f = fixture().await;
    let cart = f.carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    f.carts.add_item(cart.id, 7, 2).await.unwrap();
    f.carts.lock(cart.id).await.unwrap();

    // At exactly the security timeout the lock still holds.
    f.h.clock.advance(Duration::from_secs(120));
    assert!(f.sweeper.sweep().await.unwrap().is_empty());

    f.h.clock.advance(Duration::from_secs(1));
    let report = f.sweeper.sweep().await.unwrap();
    assert_eq!(report.unlocked, 1);

    let second = f.sweeper.sweep().await.unwrap();
    assert_eq!(second, SweepReport::default());

    let reopened = f.carts.get_cart(cart.id).await.unwrap();
    assert_eq!(reopened.status, CartStatus::Open);
    assert_eq!(f.carts.reservations(cart.id).await.unwrap().len(), 1);
    assert_eq!(f.h.total_available(7).await, 5);
}

#[tokio::test]
async fn idle_local_cart_expires_and_releases_stock() {
    let f = fixture().await;
    let cart = f.carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    f.carts.add_item(cart.id, 7, 4).await.unwrap();

    f.h.clock.advance(Duration::from_secs(900));
    assert_eq!(f.sweeper.sweep().await.unwrap().expired, 0);

    f.h.clock.advance(Duration::from_secs(1));
    assert_eq!(f.sweeper.sweep().await.unwrap().expired, 1);

    let expired = f.carts.get_cart(cart.id).await.unwrap();
    assert_eq!(expired.status, CartStatus::Expired);
    assert_eq!(f.h.total_available(7).await, 7);
    assert_eq!(f.h.reservation_count().await, 0);

    let records = f.history.for_transaction("tx-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].completion_cause, CompletionCause::Expired);
}

#[tokio::test]
async fn checked_out_cart_keeps_its_reservations() {
    let f = fixture().await;
    let cart = f.carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    f.carts.add_item(cart.id, 7, 4).await.unwrap();
    f.carts.lock(cart.id).await.unwrap();
    f.carts.check_out(cart.id).await.unwrap();

    f.h.clock.advance(Duration::from_secs(3600));
    let report = f.sweeper.sweep().await.unwrap();
    assert_eq!(report.expired, 0);
    assert_eq!(report.unlocked, 0);

    assert_eq!(f.carts.reservations(cart.id).await.unwrap().len(), 2);
    assert_eq!(f.h.total_available(7).await, 3);
}

#[tokio::test]
async fn remote_carts_follow_prereservation_and_reservation_timeouts() {
    let f = fixture().await;

    let idle = f.carts.update("remote-idle", CartType::Remote, 1, 7, 1).await.unwrap();
    let confirmed = f.carts.update("remote-ok", CartType::Remote, 2, 7, 2).await.unwrap();
    f.carts
        .confirm_reservation("remote-ok", "pickup-1")
        .await
        .unwrap();

    // Past the local expiration timeout, inside the pre-reservation one.
    f.h.clock.advance(Duration::from_secs(1000));
    assert!(f.sweeper.sweep().await.unwrap().is_empty());

    f.h.clock.advance(Duration::from_secs(201));
    let report = f.sweeper.sweep().await.unwrap();
    assert_eq!(report.prereservations_expired, 1);
    assert_eq!(report.reservations_expired, 0);
    assert_eq!(
        f.carts.get_cart(idle.id).await.unwrap().status,
        CartStatus::Expired
    );
    let records = f.history.for_transaction("remote-idle").await.unwrap();
    assert_eq!(records[0].completion_cause, CompletionCause::PrereservationExpired);

    f.h.clock.advance(Duration::from_secs(24 * 3600));
    let report = f.sweeper.sweep().await.unwrap();
    assert_eq!(report.reservations_expired, 1);
    assert_eq!(
        f.carts.get_cart(confirmed.id).await.unwrap().status,
        CartStatus::Expired
    );
    let records = f.history.list(Some("pickup-1")).await.unwrap();
    assert_eq!(records[0].completion_cause, CompletionCause::ReservationExpired);
    assert_eq!(f.h.total_available(7).await, 7);
}

#[tokio::test]
async fn retention_purges_history_and_terminal_carts() {
    let f = fixture().await;
    let cart = f.carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    f.carts.add_item(cart.id, 7, 1).await.unwrap();
    f.carts.cancel(cart.id).await.unwrap();
    let live = f.carts.open_cart("tx-2", CartType::Local, 2).await.unwrap();

    f.h.clock.advance(Duration::from_secs(7 * 24 * 3600 + 1));
    let report = f.sweeper.sweep().await.unwrap();
    assert_eq!(report.history_purged, 1);
    assert_eq!(report.carts_purged, 1);
    // The idle open cart expires in the same pass and is kept for now.
    assert_eq!(report.expired, 1);

    assert!(f.carts.get_cart(cart.id).await.is_err());
    assert_eq!(
        f.carts.get_cart(live.id).await.unwrap().status,
        CartStatus::Expired
    );
}

#[tokio::test]
async fn purge_can_be_disabled() {
    let h = TestHarness::builder()
        .with_config(|c| c.sweeper.purge_enabled = false)
        .build()
        .await
        .unwrap();
    let carts = CartManager::new(h.db.clone(), h.clock.clone());
    let sweeper = ExpirationSweeper::new(h.db.clone(), h.clock.clone(), h.config.clone());

    let cart = carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    carts.cancel(cart.id).await.unwrap();

    h.clock.advance(Duration::from_secs(30 * 24 * 3600));
    let report = sweeper.sweep().await.unwrap();
    assert_eq!(report.carts_purged, 0);
    assert!(carts.get_cart(cart.id).await.is_ok());
}

#[tokio::test]
async fn run_loop_sweeps_until_cancelled() {
    let f = fixture().await;
    let cart = f.carts.open_cart("tx-1", CartType::Local, 1).await.unwrap();
    f.carts.add_item(cart.id, 7, 1).await.unwrap();
    f.carts.lock(cart.id).await.unwrap();
    f.h.clock.advance(Duration::from_secs(600));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(f.sweeper.clone().run(cancel.clone()));

    let mut reopened = false;
    for _ in 0..100 {
        if f.carts.get_cart(cart.id).await.unwrap().status == CartStatus::Open {
            reopened = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();
    task.await.unwrap();
    assert!(reopened, "first tick should run a pass immediately");
}
