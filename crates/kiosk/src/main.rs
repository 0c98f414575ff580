// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kiosk - cart and inventory reservation engine for vending kiosks.
//!
//! This is the binary entry point. `serve` runs the expiration sweeper until
//! a shutdown signal; the other subcommands are one-shot maintenance tasks.

mod check;
mod serve;
mod settings;
mod shutdown;
mod users;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kiosk_config::KioskConfig;
use kiosk_core::{AccessLevel, KioskError};
use tracing::error;

/// Kiosk - cart and inventory reservation engine.
#[derive(Parser, Debug)]
#[command(name = "kiosk", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to the XDG lookup chain).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reservation engine until SIGINT or SIGTERM.
    Serve,
    /// Run a single expiration sweep and exit.
    Sweep,
    /// Create an operator account.
    Adduser {
        /// Login name.
        name: String,
        /// Access level (admin or operator).
        #[arg(long, default_value = "admin")]
        level: AccessLevel,
    },
    /// Check the configuration and the database.
    Check,
    /// Manage persisted configuration overrides.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Store an override, e.g. `cart.expiration_timeout 600`.
    Set { key: String, value: String },
    /// Remove a stored override.
    Unset { key: String },
    /// List stored overrides.
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => kiosk_config::load_and_validate_path(path),
        None => kiosk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            kiosk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    if let Err(e) = run(cli.command, config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: KioskConfig) -> Result<(), KioskError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sweep => {
            let report = serve::run_sweep(config).await?;
            println!(
                "unlocked={} expired={} prereservations_expired={} reservations_expired={} \
                 history_purged={} carts_purged={}",
                report.unlocked,
                report.expired,
                report.prereservations_expired,
                report.reservations_expired,
                report.history_purged,
                report.carts_purged
            );
            Ok(())
        }
        Commands::Adduser { name, level } => {
            let password = users::read_new_password()?;
            if users::run_adduser(&config, &name, level, password).await? {
                println!("user {name} added ({level})");
                Ok(())
            } else {
                Err(KioskError::Internal(format!("user {name} already exists")))
            }
        }
        Commands::Check => check::run_check(&config).await,
        Commands::Config { action } => match action {
            ConfigCommand::Set { key, value } => settings::run_set(&config, &key, &value).await,
            ConfigCommand::Unset { key } => settings::run_unset(&config, &key).await,
            ConfigCommand::List => settings::run_list(&config).await,
        },
    }
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kiosk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        let config = kiosk_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.general.name, "kiosk");
    }

    #[test]
    fn parses_adduser_with_level() {
        let cli = Cli::try_parse_from(["kiosk", "adduser", "maria", "--level", "operator"]).unwrap();
        match cli.command {
            Commands::Adduser { name, level } => {
                assert_eq!(name, "maria");
                assert_eq!(level, AccessLevel::Operator);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn adduser_level_defaults_to_admin() {
        let cli = Cli::try_parse_from(["kiosk", "adduser", "root"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Adduser {
                level: AccessLevel::Admin,
                ..
            }
        ));
    }

    #[test]
    fn parses_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kiosk",
            "config",
            "set",
            "cart.currency",
            "SEK",
            "--config",
            "/etc/kiosk.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/kiosk.toml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommand::Set { .. }
            }
        ));
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(Cli::try_parse_from(["kiosk", "adduser", "x", "--level", "root"]).is_err());
    }
}
