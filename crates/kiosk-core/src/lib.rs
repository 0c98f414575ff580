// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the kiosk reservation engine.
//!
//! This crate provides the error taxonomy, the domain records shared between
//! storage and the engine crates, and the [`Clock`] abstraction used for all
//! persisted timestamps.

pub mod clock;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::KioskError;
pub use types::{
    AccessLevel, Cart, CartItem, CartStatus, CartType, CheckoutMethod, CompletionCause,
    DisplayText, InventorySlot, OrderHistoryRecord, Reservation, User,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn cart_status_codes_round_trip() {
        for status in [
            CartStatus::Open,
            CartStatus::Locked,
            CartStatus::Reserved,
            CartStatus::CheckedOut,
            CartStatus::Expired,
            CartStatus::Cancelled,
        ] {
            assert_eq!(CartStatus::from_code(status.code()), Some(status));
            assert_eq!(CartStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert_eq!(CartStatus::from_code(42), None);
    }

    #[test]
    fn only_completed_states_are_terminal() {
        assert!(!CartStatus::Open.is_terminal());
        assert!(!CartStatus::Locked.is_terminal());
        assert!(!CartStatus::Reserved.is_terminal());
        assert!(CartStatus::CheckedOut.is_terminal());
        assert!(CartStatus::Expired.is_terminal());
        assert!(CartStatus::Cancelled.is_terminal());
    }

    #[test]
    fn completion_causes_map_to_terminal_status() {
        assert_eq!(
            CompletionCause::Fulfilled.terminal_status(),
            CartStatus::CheckedOut
        );
        assert_eq!(
            CompletionCause::PrereservationExpired.terminal_status(),
            CartStatus::Expired
        );
        assert_eq!(
            CompletionCause::ReservationExpired.terminal_status(),
            CartStatus::Expired
        );
        assert_eq!(
            CompletionCause::Cancelled.terminal_status(),
            CartStatus::Cancelled
        );
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(CartStatus::CheckedOut.to_string(), "checked_out");
        assert_eq!(
            CompletionCause::PrereservationExpired.to_string(),
            "prereservation_expired"
        );
    }

    #[test]
    fn invalid_cart_state_message_names_the_action() {
        let err = KioskError::InvalidCartState {
            cart_id: 3,
            status: CartStatus::Expired,
            action: "lock",
        };
        assert_eq!(err.to_string(), "cart 3 is expired, cannot lock");
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_failure_does_not_leak_details() {
        assert_eq!(KioskError::AuthFailure.to_string(), "authentication failed");
    }

    #[test]
    fn localized_lookup_falls_back() {
        let mut texts = types::Localized::new();
        texts.insert(
            "en",
            types::LocalizedText {
                name: "Water".into(),
                description: String::new(),
            },
        );
        texts.insert(
            "fi",
            types::LocalizedText {
                name: "Vesi".into(),
                description: String::new(),
            },
        );

        assert_eq!(texts.get("fi", "en").unwrap().name, "Vesi");
        assert_eq!(texts.get("sv", "en").unwrap().name, "Water");
        assert_eq!(texts.get("sv", "de").unwrap().name, "Water");
        assert_eq!(texts.resolve("sv", "fi").map(|(tag, _)| tag), Some("fi"));

        let empty: types::Localized<types::LocalizedText> = types::Localized::new();
        assert!(empty.get("en", "en").is_none());
    }

    mod props {
        use proptest::prelude::*;

        use crate::types::CompletionCause;

        proptest! {
            #[test]
            fn unknown_codes_never_parse(code in 6i64..1000) {
                prop_assert!(CompletionCause::from_code(code).is_none());
            }
        }
    }
}
