// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiosk check` command implementation.
//!
//! Runs diagnostic checks against the database and the persisted overrides.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;

use kiosk_auth::SettingsStore;
use kiosk_config::KioskConfig;
use kiosk_core::{KioskError, SystemClock};
use kiosk_storage::{Database, SCHEMA_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, message: String, start: Instant) -> Self {
        Self {
            name,
            status,
            message,
            duration: start.elapsed(),
        }
    }
}

/// Run every check and print the results. Fails when any check failed.
///
/// Status tags are coloured symbols on a terminal and plain `[OK]`-style
/// tags otherwise.
pub async fn run_check(config: &KioskConfig) -> Result<(), KioskError> {
    let use_color = std::io::stdout().is_terminal();
    let results = collect(config).await;

    println!();
    println!("  kiosk check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", format_result(result, use_color));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    if failed > 0 {
        return Err(KioskError::Internal(format!("{failed} check(s) failed")));
    }
    Ok(())
}

fn format_result(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!(
            "    {tag} {:<14} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }
    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red(), result.message.red()),
    };
    format!("    {symbol} {:<14} {message} ({duration_ms}ms)", result.name)
}

pub(crate) async fn collect(config: &KioskConfig) -> Vec<CheckResult> {
    let mut results = vec![CheckResult::new(
        "config",
        CheckStatus::Pass,
        format!("valid (kiosk.name={})", config.general.name),
        Instant::now(),
    )];

    let start = Instant::now();
    let db = match Database::open_with_config(&config.storage).await {
        Ok(db) => {
            results.push(CheckResult::new(
                "database",
                CheckStatus::Pass,
                format!("schema version {SCHEMA_VERSION}"),
                start,
            ));
            db
        }
        Err(e) => {
            results.push(CheckResult::new("database", CheckStatus::Fail, e.to_string(), start));
            return results;
        }
    };

    results.push(check_overrides(&db, config).await);
    results.push(check_reservations(&db).await);

    if let Err(e) = db.close().await {
        tracing::warn!(error = %e, "failed to close database after check");
    }
    results
}

async fn check_overrides(db: &Database, config: &KioskConfig) -> CheckResult {
    let start = Instant::now();
    let store = SettingsStore::new(db.clone(), Arc::new(SystemClock));
    let count = match store.list().await {
        Ok(overrides) => overrides.len(),
        Err(e) => return CheckResult::new("overrides", CheckStatus::Fail, e.to_string(), start),
    };
    match store.effective_config(config).await {
        Ok(_) => CheckResult::new(
            "overrides",
            CheckStatus::Pass,
            format!("{count} stored, all valid"),
            start,
        ),
        Err(e) => CheckResult::new("overrides", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Reservations whose slot no longer holds the reserved variant.
async fn check_reservations(db: &Database) -> CheckResult {
    let start = Instant::now();
    let result = db
        .with_conn(|conn| {
            let stale: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reservation r
                 WHERE NOT EXISTS (
                     SELECT 1 FROM inventory i
                     WHERE i.unit_id = r.unit_id
                       AND i.location = r.location
                       AND i.variant_id = r.variant_id
                 )",
                [],
                |row| row.get(0),
            )?;
            Ok(stale)
        })
        .await;
    match result {
        Ok(0) => CheckResult::new(
            "reservations",
            CheckStatus::Pass,
            "all point at stocked slots".to_string(),
            start,
        ),
        Ok(stale) => CheckResult::new(
            "reservations",
            CheckStatus::Warn,
            format!("{stale} point at slots that no longer hold the variant"),
            start,
        ),
        Err(e) => CheckResult::new("reservations", CheckStatus::Fail, e.to_string(), start),
    }
}
