// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for operator accounts and config overrides.

use std::time::Duration;

use kiosk_auth::{SettingsStore, UserStore};
use kiosk_config::TimeUnit;
use kiosk_core::{AccessLevel, Clock, KioskError};
use kiosk_test_utils::TestHarness;
use secrecy::SecretString;

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

async fn users() -> (TestHarness, UserStore) {
    let h = TestHarness::builder().build().await.unwrap();
    let store = UserStore::new(h.db.clone(), h.clock.clone(), h.config.auth.clone());
    (h, store)
}

#[tokio::test]
async fn add_and_verify_user() {
    let (h, store) = users().await;

    assert!(store
        .add_user("alice", secret("correct horse"), AccessLevel::Admin)
        .await
        .unwrap());
    assert!(!store
        .add_user("alice", secret("other"), AccessLevel::Operator)
        .await
        .unwrap());

    h.clock.advance(Duration::from_secs(5));
    let level = store.verify("alice", secret("correct horse")).await.unwrap();
    assert_eq!(level, AccessLevel::Admin);

    let listed = store.list_users().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].last_logged_in, h.clock.unix_now());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_fail_alike() {
    let (_h, store) = users().await;
    store
        .add_user("alice", secret("correct horse"), AccessLevel::Operator)
        .await
        .unwrap();

    let wrong = store.verify("alice", secret("battery")).await.unwrap_err();
    let unknown = store.verify("mallory", secret("battery")).await.unwrap_err();
    assert!(matches!(wrong, KioskError::AuthFailure));
    assert!(matches!(unknown, KioskError::AuthFailure));
    assert_eq!(wrong.to_string(), unknown.to_string());

    let listed = store.list_users().await.unwrap();
    assert_eq!(listed[0].last_logged_in, 0);
}

#[tokio::test]
async fn change_password_and_remove_user() {
    let (_h, store) = users().await;
    store
        .add_user("bob", secret("old"), AccessLevel::Operator)
        .await
        .unwrap();

    assert!(store.change_password("bob", secret("new")).await.unwrap());
    assert!(!store.change_password("nobody", secret("new")).await.unwrap());
    assert!(store.verify("bob", secret("old")).await.is_err());
    assert!(store.verify("bob", secret("new")).await.is_ok());

    assert!(store.remove_user("bob").await.unwrap());
    assert!(!store.remove_user("bob").await.unwrap());
    assert!(matches!(
        store.verify("bob", secret("new")).await,
        Err(KioskError::AuthFailure)
    ));
}

#[tokio::test]
async fn overrides_layer_onto_static_config() {
    let h = TestHarness::builder().build().await.unwrap();
    let store = SettingsStore::new(h.db.clone(), h.clock.clone());

    store
        .set(&h.config, "cart.expiration_timeout", "5")
        .await
        .unwrap();
    store
        .set(&h.config, "cart.reservation_timeout.unit", "days")
        .await
        .unwrap();
    store.set(&h.config, "cart.currency", "SEK").await.unwrap();

    let effective = store.effective_config(&h.config).await.unwrap();
    assert_eq!(
        effective.cart.expiration_timeout(),
        Duration::from_secs(5)
    );
    assert_eq!(effective.cart.reservation_timeout.unit, TimeUnit::Days);
    assert_eq!(effective.cart.currency(), "SEK");
    // The static config is untouched.
    assert_eq!(h.config.cart.currency(), "EUR");

    assert_eq!(store.list().await.unwrap().len(), 3);
    assert!(store.remove("cart.currency").await.unwrap());
    assert_eq!(store.get("cart.currency").await.unwrap(), None);
    let effective = store.effective_config(&h.config).await.unwrap();
    assert_eq!(effective.cart.currency(), "EUR");
}

#[tokio::test]
async fn invalid_override_is_not_stored() {
    let h = TestHarness::builder().build().await.unwrap();
    let store = SettingsStore::new(h.db.clone(), h.clock.clone());

    let err = store
        .set(&h.config, "cart.curency", "SEK")
        .await
        .unwrap_err();
    assert!(matches!(err, KioskError::Config(m) if m.contains("curency")));

    let err = store
        .set(&h.config, "cart.currency", "euro")
        .await
        .unwrap_err();
    assert!(matches!(err, KioskError::Config(_)));
    assert!(store.list().await.unwrap().is_empty());
}
