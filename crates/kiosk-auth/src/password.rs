// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string format, which carries the algorithm,
//! version, parameters and salt, so verification never needs the current
//! configuration.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use kiosk_config::model::AuthConfig;
use kiosk_core::KioskError;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

fn hasher(config: &AuthConfig) -> Result<Argon2<'static>, KioskError> {
    let params = Params::new(
        config.kdf_memory_cost,
        config.kdf_iterations,
        config.kdf_parallelism,
        None,
    )
    .map_err(|e| KioskError::Config(format!("invalid Argon2id parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Generate a random 16-byte salt for Argon2id.
pub fn generate_salt() -> Result<SaltString, KioskError> {
    let rng = SystemRandom::new();
    let mut salt = Zeroizing::new([0u8; 16]);
    rng.fill(&mut salt[..])
        .map_err(|_| KioskError::Internal("failed to generate random salt".to_string()))?;
    SaltString::encode_b64(&salt[..])
        .map_err(|e| KioskError::Internal(format!("failed to encode salt: {e}")))
}

/// Hash `password` with a fresh salt. Returns the PHC string.
pub fn hash_password(password: &SecretString, config: &AuthConfig) -> Result<String, KioskError> {
    let salt = generate_salt()?;
    let hash = hasher(config)?
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| KioskError::Internal(format!("Argon2id hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
pub fn verify_password(password: &SecretString, phc: &str) -> Result<bool, KioskError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| KioskError::Internal(format!("stored password hash is malformed: {e}")))?;
    match Argon2::default().verify_password(password.expose_secret().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(KioskError::Internal(format!(
            "Argon2id verification failed: {e}"
        ))),
    }
}
