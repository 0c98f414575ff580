// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator accounts.
//!
//! Login failures always surface as [`KioskError::AuthFailure`], whether the
//! name is unknown or the password is wrong. Unknown names still pay for one
//! Argon2id verification against a dummy hash so both paths cost the same.

use std::sync::Arc;

use kiosk_config::model::AuthConfig;
use kiosk_core::{AccessLevel, Clock, KioskError, User};
use kiosk_storage::Database;
use kiosk_storage::queries::users;
use secrecy::SecretString;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::password::{hash_password, verify_password};

const DUMMY_PASSWORD: &str = "kiosk-dummy-password";

#[derive(Clone)]
pub struct UserStore {
    db: Database,
    clock: Arc<dyn Clock>,
    auth: AuthConfig,
    dummy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// Run a CPU-heavy hashing step off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T, KioskError>
where
    F: FnOnce() -> Result<T, KioskError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KioskError::Internal(format!("password task failed: {e}")))?
}

impl UserStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>, auth: AuthConfig) -> Self {
        Self {
            db,
            clock,
            auth,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create an operator. Returns `false` when the name is already taken.
    pub async fn add_user(
        &self,
        name: &str,
        password: SecretString,
        access_level: AccessLevel,
    ) -> Result<bool, KioskError> {
        let auth = self.auth.clone();
        let hash = blocking(move || hash_password(&password, &auth)).await?;
        let added = users::insert_user(&self.db, name, &hash, access_level).await?;
        if added {
            info!(user = name, %access_level, "user added");
        } else {
            warn!(user = name, "user already exists");
        }
        Ok(added)
    }

    /// Check credentials and stamp the login time.
    pub async fn verify(&self, name: &str, password: SecretString) -> Result<AccessLevel, KioskError> {
        let Some(record) = users::get_user(&self.db, name).await? else {
            let dummy = self.dummy_hash().await?;
            blocking(move || verify_password(&password, &dummy)).await?;
            warn!(user = name, "login failed");
            return Err(KioskError::AuthFailure);
        };

        let phc = record.password_hash;
        if !blocking(move || verify_password(&password, &phc)).await? {
            warn!(user = name, "login failed");
            return Err(KioskError::AuthFailure);
        }

        users::update_last_logged_in(&self.db, name, self.clock.unix_now()).await?;
        info!(user = name, "login succeeded");
        Ok(record.user.access_level)
    }

    /// Replace a user's password. Returns `false` for unknown users.
    pub async fn change_password(
        &self,
        name: &str,
        password: SecretString,
    ) -> Result<bool, KioskError> {
        let auth = self.auth.clone();
        let hash = blocking(move || hash_password(&password, &auth)).await?;
        let changed = users::update_password(&self.db, name, &hash).await?;
        if changed {
            info!(user = name, "password changed");
        }
        Ok(changed)
    }

    pub async fn remove_user(&self, name: &str) -> Result<bool, KioskError> {
        let removed = users::delete_user(&self.db, name).await?;
        if removed {
            info!(user = name, "user removed");
        }
        Ok(removed)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, KioskError> {
        users::list_users(&self.db).await
    }

    async fn dummy_hash(&self) -> Result<String, KioskError> {
        let auth = self.auth.clone();
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async move {
                blocking(move || {
                    hash_password(&SecretString::from(DUMMY_PASSWORD.to_string()), &auth)
                })
                .await
            })
            .await?;
        Ok(hash.clone())
    }
}
