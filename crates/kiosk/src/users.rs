// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiosk adduser` command implementation.

use std::sync::Arc;

use kiosk_auth::UserStore;
use kiosk_config::KioskConfig;
use kiosk_core::{AccessLevel, KioskError, SystemClock};
use kiosk_storage::Database;
use secrecy::SecretString;
use zeroize::Zeroizing;

/// Environment variable for providing the new user's password.
pub const PASSWORD_ENV_VAR: &str = "KIOSK_USER_PASSWORD";

/// Get the password from the environment or an interactive prompt with
/// confirmation.
pub fn read_new_password() -> Result<SecretString, KioskError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR)
        && !password.is_empty()
    {
        return Ok(SecretString::from(password));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Password: ");
        let first = Zeroizing::new(
            rpassword::read_password()
                .map_err(|e| KioskError::Internal(format!("failed to read password: {e}")))?,
        );
        eprint!("Confirm password: ");
        let second = Zeroizing::new(
            rpassword::read_password()
                .map_err(|e| KioskError::Internal(format!("failed to read password: {e}")))?,
        );
        if *first != *second {
            return Err(KioskError::Internal("passwords do not match".to_string()));
        }
        if first.is_empty() {
            return Err(KioskError::Internal("empty password not allowed".to_string()));
        }
        return Ok(SecretString::from(first.to_string()));
    }

    Err(KioskError::Internal(format!(
        "no password provided; set {PASSWORD_ENV_VAR} or run interactively"
    )))
}

/// Create an operator account. Returns `false` when the name is taken.
pub async fn run_adduser(
    config: &KioskConfig,
    name: &str,
    level: AccessLevel,
    password: SecretString,
) -> Result<bool, KioskError> {
    let db = Database::open_with_config(&config.storage).await?;
    let store = UserStore::new(db.clone(), Arc::new(SystemClock), config.auth.clone());
    let added = store.add_user(name, password, level).await?;
    db.close().await?;
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_config::model::StorageConfig;
    use serial_test::serial;

    #[test]
    #[serial]
    fn password_from_env_var() {
        // SAFETY: test-only env mutation, serialized with #[serial].
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "s3cret") };
        let result = read_new_password();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn adduser_rejects_duplicate_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = KioskConfig {
            storage: StorageConfig {
                database_path: dir.path().join("kiosk.db").to_string_lossy().to_string(),
                ..StorageConfig::default()
            },
            ..KioskConfig::default()
        };
        config.auth.kdf_memory_cost = 1024;
        config.auth.kdf_iterations = 1;

        let pw = || SecretString::from("pw".to_string());
        assert!(run_adduser(&config, "admin", AccessLevel::Admin, pw()).await.unwrap());
        assert!(!run_adduser(&config, "admin", AccessLevel::Admin, pw()).await.unwrap());
    }
}
