// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, inventory, cart and auth crates.
//!
//! Enumerations are persisted as small integers; the `ToSql`/`FromSql`
//! implementations keep the integer codes in one place.

use std::collections::BTreeMap;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! sql_code_enum {
    ($name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $name {
            /// Integer code persisted in the database.
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Parse a persisted integer code.
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.code()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let code = i64::column_result(value)?;
                $name::from_code(code).ok_or(FromSqlError::OutOfRange(code))
            }
        }
    };
}

/// Which kind of shopping session a cart belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CartType {
    /// Interactive session at the kiosk screen.
    Local,
    /// Pre-ordered online, picked up later at the kiosk.
    Remote,
}

sql_code_enum!(CartType { Local = 1, Remote = 2 });

/// Cart lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Open,
    Locked,
    /// Remote pre-order confirmed for pickup; holds stock for the long
    /// reservation timeout.
    Reserved,
    CheckedOut,
    Expired,
    Cancelled,
}

sql_code_enum!(CartStatus {
    Open = 1,
    Locked = 2,
    Reserved = 3,
    CheckedOut = 4,
    Expired = 5,
    Cancelled = 6,
});

impl CartStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CartStatus::CheckedOut | CartStatus::Expired | CartStatus::Cancelled
        )
    }

    /// States whose reservations still hold stock on behalf of the cart.
    pub fn holds_stock(self) -> bool {
        matches!(
            self,
            CartStatus::Open | CartStatus::Locked | CartStatus::Reserved
        )
    }
}

/// How the shopper intends to complete the cart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMethod {
    Undefined,
    Payment,
    Pickup,
}

sql_code_enum!(CheckoutMethod {
    Undefined = 0,
    Payment = 1,
    Pickup = 2,
});

/// Reason a cart reached its terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionCause {
    Fulfilled,
    Expired,
    Cancelled,
    PrereservationExpired,
    ReservationExpired,
}

sql_code_enum!(CompletionCause {
    Fulfilled = 1,
    Expired = 2,
    Cancelled = 3,
    PrereservationExpired = 4,
    ReservationExpired = 5,
});

impl CompletionCause {
    /// The terminal cart status this cause leads to.
    pub fn terminal_status(self) -> CartStatus {
        match self {
            CompletionCause::Fulfilled => CartStatus::CheckedOut,
            CompletionCause::Cancelled => CartStatus::Cancelled,
            CompletionCause::Expired
            | CompletionCause::PrereservationExpired
            | CompletionCause::ReservationExpired => CartStatus::Expired,
        }
    }
}

/// Operator privilege level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Admin,
    Operator,
}

sql_code_enum!(AccessLevel { Admin = 1, Operator = 2 });

// --- Engine records ---

/// A shopping session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub display_id: i64,
    pub transaction_id: String,
    pub cart_type: CartType,
    /// Serialized order payload (order info or pickup code).
    pub order_info: String,
    pub status: CartStatus,
    pub checkout_method: CheckoutMethod,
    /// Unix seconds when the current hold began; 0 when never locked.
    pub locked_at: i64,
    /// Unix seconds of the last shopper activity.
    pub updated_at: i64,
    pub created_at: i64,
}

/// Quantity of one variant requested within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_id: i64,
    pub variant_id: i64,
    pub amount: i64,
}

/// A concrete hold on stock in one inventory slot for one cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub cart_id: i64,
    pub variant_id: i64,
    pub unit_id: i64,
    pub location: i64,
    pub quantity: i64,
}

/// Physical stock of one variant at one tray location of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub unit_id: i64,
    pub tray_number: i64,
    pub location: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub width: i64,
    pub depth: i64,
}

/// Immutable record of a completed or failed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryRecord {
    pub id: i64,
    pub transaction_id: String,
    pub order_info: String,
    pub completion_cause: CompletionCause,
    pub created_at: i64,
}

/// Operator account. The password hash never leaves the auth crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub access_level: AccessLevel,
    pub last_logged_in: i64,
}

// --- Catalog records ---

/// Name and description in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub name: String,
    pub description: String,
}

/// Catalog text picked for display, with the language it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub language: String,
    pub name: String,
    pub description: String,
}

/// Language-tagged texts with fallback lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized<T>(pub BTreeMap<String, T>);

impl<T> Default for Localized<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> Localized<T> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, language: impl Into<String>, value: T) {
        self.0.insert(language.into(), value);
    }

    /// Look up `language`, then `fallback`, then the first entry in tag order.
    pub fn get(&self, language: &str, fallback: &str) -> Option<&T> {
        self.resolve(language, fallback).map(|(_, value)| value)
    }

    /// Like [`Localized::get`], also returning the tag that matched.
    pub fn resolve(&self, language: &str, fallback: &str) -> Option<(&str, &T)> {
        self.0
            .get_key_value(language)
            .or_else(|| self.0.get_key_value(fallback))
            .or_else(|| self.0.iter().next())
            .map(|(tag, value)| (tag.as_str(), value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed key/value attribute of a product or variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub property_type: String,
    pub name: String,
    pub value: String,
}

/// Option such as size or color selecting a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub option: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub last_update: i64,
    pub product_type: String,
    pub tags: String,
    pub info: Localized<LocalizedText>,
    pub properties: Localized<Vec<ObjectProperty>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub price: i64,
    pub price_compare: i64,
    pub price_formatted: String,
    pub price_compare_formatted: String,
    pub deleted: bool,
    pub media_id: Option<i64>,
    pub info: Localized<LocalizedText>,
    pub properties: Localized<Vec<ObjectProperty>>,
    pub options: Vec<VariantOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub last_update: i64,
    pub media_id: Option<i64>,
    pub info: Localized<LocalizedText>,
    pub product_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub filename: String,
    pub last_update: i64,
}
