// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the kiosk reservation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level kiosk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides and, at runtime, persisted global-config overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KioskConfig {
    /// Kiosk identity, logging and display language.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cart lifecycle timeouts and display currency.
    #[serde(default)]
    pub cart: CartConfig,

    /// Expiration sweeper scheduling.
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Operator credential hashing parameters.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Kiosk identity and behavior configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Display name of this kiosk.
    #[serde(default = "default_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Preferred language tag for catalog texts.
    #[serde(default = "default_language")]
    pub language: String,

    /// Language used when a text is missing in `language`.
    #[serde(default = "default_language")]
    pub fallback_language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            language: default_language(),
            fallback_language: default_language(),
        }
    }
}

fn default_name() -> String {
    "kiosk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a statement waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kiosk").join("kiosk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kiosk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Unit tag attached to a configured timeout.
///
/// Accepts the long names and the single-letter forms used by the cloud
/// configuration payloads (`S`, `M`, `H`, `D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "S", alias = "s", alias = "second", alias = "secs")]
    Seconds,
    #[serde(alias = "M", alias = "m", alias = "minute", alias = "mins")]
    Minutes,
    #[serde(alias = "H", alias = "h", alias = "hour")]
    Hours,
    #[serde(alias = "D", alias = "d", alias = "day")]
    Days,
}

impl TimeUnit {
    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 60 * 60,
            TimeUnit::Days => 24 * 60 * 60,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        f.write_str(s)
    }
}

/// A duration expressed as `value` in `unit`.
///
/// In TOML either a table (`{ value = 15, unit = "minutes" }`) or a bare
/// integer meaning seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TimeoutRepr")]
pub struct Timeout {
    pub value: u64,
    pub unit: TimeUnit,
}

impl Timeout {
    pub const fn seconds(value: u64) -> Self {
        Self {
            value,
            unit: TimeUnit::Seconds,
        }
    }

    pub const fn new(value: u64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    /// Normalized duration, saturating on overflow.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.value.saturating_mul(self.unit.seconds()))
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeoutRepr {
    Seconds(u64),
    Full {
        value: u64,
        #[serde(default = "default_unit")]
        unit: TimeUnit,
    },
}

fn default_unit() -> TimeUnit {
    TimeUnit::Seconds
}

impl From<TimeoutRepr> for Timeout {
    fn from(repr: TimeoutRepr) -> Self {
        match repr {
            TimeoutRepr::Seconds(value) => Timeout::seconds(value),
            TimeoutRepr::Full { value, unit } => Timeout { value, unit },
        }
    }
}

/// Cart lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CartConfig {
    /// Idle time after which an open local cart expires.
    #[serde(default = "default_expiration_timeout")]
    pub expiration_timeout: Timeout,

    /// Idle time after which an unconfirmed remote pre-order expires.
    #[serde(default = "default_prereservation_timeout")]
    pub prereservation_timeout: Timeout,

    /// How long a confirmed remote reservation holds stock for pickup.
    #[serde(default = "default_reservation_timeout")]
    pub reservation_timeout: Timeout,

    /// Retention of order history rows and terminal carts.
    #[serde(default = "default_order_history_timeout")]
    pub order_history_timeout: Timeout,

    /// How long a cart may stay locked in checkout before it reopens.
    #[serde(default = "default_security_timeout")]
    pub security_timeout: Timeout,

    /// Display currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            expiration_timeout: default_expiration_timeout(),
            prereservation_timeout: default_prereservation_timeout(),
            reservation_timeout: default_reservation_timeout(),
            order_history_timeout: default_order_history_timeout(),
            security_timeout: default_security_timeout(),
            currency: default_currency(),
        }
    }
}

impl CartConfig {
    pub fn expiration_timeout(&self) -> Duration {
        self.expiration_timeout.as_duration()
    }

    pub fn prereservation_timeout(&self) -> Duration {
        self.prereservation_timeout.as_duration()
    }

    pub fn reservation_timeout(&self) -> Duration {
        self.reservation_timeout.as_duration()
    }

    pub fn order_history_timeout(&self) -> Duration {
        self.order_history_timeout.as_duration()
    }

    pub fn security_timeout(&self) -> Duration {
        self.security_timeout.as_duration()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

fn default_expiration_timeout() -> Timeout {
    Timeout::seconds(900)
}

fn default_prereservation_timeout() -> Timeout {
    Timeout::seconds(1200)
}

fn default_reservation_timeout() -> Timeout {
    Timeout::new(24, TimeUnit::Hours)
}

fn default_order_history_timeout() -> Timeout {
    Timeout::new(7, TimeUnit::Days)
}

fn default_security_timeout() -> Timeout {
    Timeout::seconds(120)
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Expiration sweeper configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    /// Seconds between sweep passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run the retention purge on every pass.
    #[serde(default = "default_purge_enabled")]
    pub purge_enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            purge_enabled: default_purge_enabled(),
        }
    }
}

fn default_interval_secs() -> u64 {
    5
}

fn default_purge_enabled() -> bool {
    true
}

/// Operator password hashing configuration (Argon2id).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Argon2id memory cost in KiB (default: 19456, 19 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 2).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 1).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    19456 // OWASP minimum for Argon2id password storage
}

fn default_kdf_iterations() -> u32 {
    2
}

fn default_kdf_parallelism() -> u32 {
    1
}
