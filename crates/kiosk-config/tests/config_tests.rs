// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the kiosk configuration system.

use std::time::Duration;

use kiosk_config::diagnostic::ConfigError;
use kiosk_config::model::{KioskConfig, TimeUnit, Timeout};
use kiosk_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_kiosk_config() {
    let toml = r#"
[general]
name = "lobby-1"
log_level = "debug"
language = "fi"
fallback_language = "en"

[storage]
database_path = "/tmp/kiosk-test.db"
wal_mode = false

[cart]
expiration_timeout = 600
prereservation_timeout = { value = 30, unit = "minutes" }
reservation_timeout = { value = 2, unit = "D" }
order_history_timeout = { value = 14, unit = "days" }
security_timeout = { value = 3, unit = "M" }
currency = "SEK"

[sweeper]
interval_secs = 2

[auth]
kdf_memory_cost = 4096
kdf_iterations = 1
kdf_parallelism = 1
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.general.name, "lobby-1");
    assert_eq!(config.general.language, "fi");
    assert_eq!(config.storage.database_path, "/tmp/kiosk-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.cart.expiration_timeout(), Duration::from_secs(600));
    assert_eq!(
        config.cart.prereservation_timeout(),
        Duration::from_secs(30 * 60)
    );
    assert_eq!(
        config.cart.reservation_timeout,
        Timeout::new(2, TimeUnit::Days)
    );
    assert_eq!(config.cart.security_timeout(), Duration::from_secs(180));
    assert_eq!(config.cart.currency(), "SEK");
    assert_eq!(config.sweeper.interval_secs, 2);
    assert_eq!(config.auth.kdf_memory_cost, 4096);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.general.name, "kiosk");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.cart.expiration_timeout(), Duration::from_secs(900));
    assert_eq!(config.cart.prereservation_timeout(), Duration::from_secs(1200));
    assert_eq!(config.cart.reservation_timeout(), Duration::from_secs(86_400));
    assert_eq!(
        config.cart.order_history_timeout(),
        Duration::from_secs(7 * 86_400)
    );
    assert_eq!(config.cart.security_timeout(), Duration::from_secs(120));
    assert_eq!(config.cart.currency(), "EUR");
    assert!(config.storage.wal_mode);
}

/// Unknown field in [cart] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_cart_key_suggests_correction() {
    let toml = r#"
[cart]
curency = "EUR"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, span, .. } if {
            key == "cart.curency"
                && suggestion.as_deref() == Some("currency")
                && valid_keys.contains("expiration_timeout")
                && span.is_some_and(|s| &toml[s.offset()..s.offset() + s.len()] == "curency")
        })
    });
    assert!(has_unknown_key, "got: {errors:?}");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Semantic validation runs after deserialization.
#[test]
fn validation_errors_surface_from_load() {
    let toml = r#"
[cart]
expiration_timeout = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero timeout is invalid");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("expiration_timeout"))
    ));
}

/// Dot-notation merges behave like the env provider.
#[test]
fn dotted_merge_overrides_nested_key() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: KioskConfig = Figment::new()
        .merge(Serialized::defaults(KioskConfig::default()))
        .merge(Toml::string("[cart]\ncurrency = \"NOK\"\n"))
        .merge(("cart.currency", "DKK"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.cart.currency(), "DKK");
}

/// A config file is read from an explicit path and env vars still apply.
#[test]
#[serial]
fn explicit_path_with_env_override() {
    let dir = std::env::temp_dir().join(format!("kiosk-config-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("kiosk.toml");
    std::fs::write(&path, "[general]\nname = \"from-file\"\n").unwrap();

    // SAFETY: serialized with other env-touching tests.
    unsafe { std::env::set_var("KIOSK_CART_SECURITY_TIMEOUT", "45") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("KIOSK_CART_SECURITY_TIMEOUT") };
    std::fs::remove_dir_all(&dir).ok();

    let config = result.expect("file config should load");
    assert_eq!(config.general.name, "from-file");
    assert_eq!(config.cart.security_timeout(), Duration::from_secs(45));
}

/// Missing config files are silently skipped.
#[test]
#[serial]
fn missing_config_file_yields_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/kiosk.toml"))
        .expect("missing file should be skipped");
    assert_eq!(config.general.name, "kiosk");
}
