// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the kiosk reservation engine.

use thiserror::Error;

use crate::types::CartStatus;

/// The primary error type returned by every engine operation.
#[derive(Debug, Error)]
pub enum KioskError {
    /// Requested quantity exceeds the aggregate stock available for a variant.
    #[error("insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: i64,
        requested: i64,
        available: i64,
    },

    /// A cart transition was attempted from an incompatible or terminal state.
    #[error("cart {cart_id} is {status}, cannot {action}")]
    InvalidCartState {
        cart_id: i64,
        status: CartStatus,
        action: &'static str,
    },

    /// No cart exists for the given id or transaction id.
    #[error("cart not found: {0}")]
    CartNotFound(String),

    /// No reservation exists for the given id.
    #[error("reservation not found: {0}")]
    ReservationNotFound(i64),

    /// The inventory slot does not exist or holds another variant.
    #[error("inventory slot not found: unit {unit_id}, location {location}, variant {variant_id}")]
    SlotNotFound {
        unit_id: i64,
        location: i64,
        variant_id: i64,
    },

    /// The variant does not exist in the catalog.
    #[error("variant not found: {0}")]
    VariantNotFound(i64),

    /// A cart with this transaction id already exists.
    #[error("transaction id already in use: {0}")]
    DuplicateTransaction(String),

    /// The cart has no content to check out.
    #[error("cart {0} is empty")]
    EmptyCart(i64),

    /// A quantity argument is zero, negative or larger than what is held.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Slot stocking data violates capacity constraints.
    #[error("invalid inventory slot: {0}")]
    InvalidSlot(String),

    /// Credential mismatch. Deliberately does not say which field was wrong.
    #[error("authentication failed")]
    AuthFailure,

    /// The persisted schema does not match the version this engine expects.
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i64, found: i64 },

    /// Configuration errors (invalid TOML, bad override values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KioskError {
    /// Returns `true` for errors the caller may resolve by retrying against
    /// the cart's current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KioskError::InvalidCartState { .. })
    }

    /// Returns `true` for not-found style errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KioskError::CartNotFound(_)
                | KioskError::ReservationNotFound(_)
                | KioskError::SlotNotFound { .. }
                | KioskError::VariantNotFound(_)
        )
    }
}

impl From<rusqlite::Error> for KioskError {
    fn from(e: rusqlite::Error) -> Self {
        KioskError::Storage {
            source: Box::new(e),
        }
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(e: serde_json::Error) -> Self {
        KioskError::Internal(format!("payload serialization failed: {e}"))
    }
}
