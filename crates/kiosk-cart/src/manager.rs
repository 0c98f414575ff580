// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cart state machine.
//!
//! ```text
//!            lock             check_out
//!   open ──────────▶ locked ───────────▶ checked_out
//!    │  ◀──────────    │                     ▲
//!    │     unlock      │                     │ check_out (pickup)
//!    │ confirm_reservation                   │
//!    └──────────────▶ reserved ──────────────┘
//!
//!   open / locked / reserved ──▶ expired | cancelled
//! ```
//!
//! Every transition is a conditional update keyed on the status that was
//! read, inside one `BEGIN IMMEDIATE` transaction together with the content,
//! reservation and history changes it implies. Content changes allocate or
//! release stock in the same transaction, so an open cart's reservations
//! always add up to its contents.

use std::cmp::Ordering;
use std::sync::Arc;

use kiosk_core::{
    Cart, CartItem, CartStatus, CartType, CheckoutMethod, Clock, CompletionCause, KioskError,
    Reservation,
};
use kiosk_inventory::coordinator;
use kiosk_storage::Database;
use kiosk_storage::queries::{carts, catalog, reservations};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use crate::history;

const HOLDS_STOCK: &[CartStatus] = &[CartStatus::Open, CartStatus::Locked, CartStatus::Reserved];

/// Drives carts through their lifecycle.
#[derive(Clone)]
pub struct CartManager {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl CartManager {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Open a new cart. A reused transaction id fails with
    /// `DuplicateTransaction`.
    pub async fn open_cart(
        &self,
        transaction_id: &str,
        cart_type: CartType,
        display_id: i64,
    ) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let tx_id = transaction_id.to_string();
        let cart = self
            .db
            .transact(move |tx| {
                let id = carts::insert_cart(tx, &tx_id, cart_type, display_id, now)?;
                load(tx, id)
            })
            .await?;
        info!(
            cart_id = cart.id,
            transaction_id = %cart.transaction_id,
            %cart_type,
            "cart opened"
        );
        Ok(cart)
    }

    /// `open` to `locked` for checkout. The cart must hold content.
    pub async fn lock(&self, cart_id: i64) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, &[CartStatus::Open], "lock")?;
                if carts::contents(tx, cart_id)?.is_empty() {
                    return Err(KioskError::EmptyCart(cart_id));
                }
                if !carts::transition(tx, cart_id, CartStatus::Open, CartStatus::Locked, now, None)? {
                    return Err(lost_race(tx, cart_id, "lock"));
                }
                load(tx, cart_id)
            })
            .await?;
        info!(cart_id, "cart locked");
        Ok(cart)
    }

    /// `locked` back to `open`. Reservations stay held.
    pub async fn unlock(&self, cart_id: i64) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, &[CartStatus::Locked], "unlock")?;
                if !carts::transition(tx, cart_id, CartStatus::Locked, CartStatus::Open, now, None)? {
                    return Err(lost_race(tx, cart_id, "unlock"));
                }
                load(tx, cart_id)
            })
            .await?;
        info!(cart_id, "cart unlocked");
        Ok(cart)
    }

    /// Complete a `locked` cart (payment) or a `reserved` one (pickup).
    ///
    /// Reservations stay in place as the record of dispensed stock; the
    /// fulfilled history row is written in the same transaction.
    pub async fn check_out(&self, cart_id: i64) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, &[CartStatus::Locked, CartStatus::Reserved], "check out")?;
                if !finish_in(tx, &cart, CompletionCause::Fulfilled, now, None)? {
                    return Err(lost_race(tx, cart_id, "check out"));
                }
                load(tx, cart_id)
            })
            .await?;
        info!(cart_id, transaction_id = %cart.transaction_id, "cart checked out");
        Ok(cart)
    }

    /// Cancel a cart that still holds stock and release it.
    pub async fn cancel(&self, cart_id: i64) -> Result<Cart, KioskError> {
        self.terminate(cart_id, |_| CompletionCause::Cancelled, "cancel")
            .await
    }

    /// Expire a cart now, with the cause its current state implies.
    pub async fn expire(&self, cart_id: i64) -> Result<Cart, KioskError> {
        self.terminate(cart_id, expiry_cause, "expire").await
    }

    async fn terminate(
        &self,
        cart_id: i64,
        cause_of: fn(&Cart) -> CompletionCause,
        action: &'static str,
    ) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, HOLDS_STOCK, action)?;
                if !finish_in(tx, &cart, cause_of(&cart), now, None)? {
                    return Err(lost_race(tx, cart_id, action));
                }
                load(tx, cart_id)
            })
            .await?;
        info!(cart_id, status = %cart.status, "cart closed");
        Ok(cart)
    }

    /// Confirm a remote pre-order for pickup: `open` to `reserved`.
    ///
    /// Stores the order payload, switches the checkout method to pickup and
    /// starts the long reservation timeout.
    pub async fn confirm_reservation(
        &self,
        transaction_id: &str,
        order_info: &str,
    ) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let tx_id = transaction_id.to_string();
        let order_info = order_info.to_string();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load_by_transaction(tx, &tx_id)?;
                require(&cart, &[CartStatus::Open], "confirm reservation")?;
                require_remote(&cart, "confirm reservation")?;
                if carts::contents(tx, cart.id)?.is_empty() {
                    return Err(KioskError::EmptyCart(cart.id));
                }
                if !carts::confirm_reservation(tx, cart.id, &order_info, now)? {
                    return Err(lost_race(tx, cart.id, "confirm reservation"));
                }
                load(tx, cart.id)
            })
            .await?;
        info!(cart_id = cart.id, transaction_id, "reservation confirmed");
        Ok(cart)
    }

    /// Restart the pre-reservation timer of a remote `open` cart.
    pub async fn prolong(&self, transaction_id: &str) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let tx_id = transaction_id.to_string();
        let cart = self
            .db
            .transact(move |tx| {
                let cart = load_by_transaction(tx, &tx_id)?;
                require(&cart, &[CartStatus::Open], "prolong")?;
                require_remote(&cart, "prolong")?;
                if !carts::touch(tx, cart.id, CartStatus::Open, now)? {
                    return Err(lost_race(tx, cart.id, "prolong"));
                }
                load(tx, cart.id)
            })
            .await?;
        debug!(cart_id = cart.id, "pre-reservation prolonged");
        Ok(cart)
    }

    pub async fn set_checkout_method(
        &self,
        cart_id: i64,
        method: CheckoutMethod,
    ) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        self.db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, &[CartStatus::Open, CartStatus::Locked], "set checkout method")?;
                if !carts::set_checkout_method(tx, cart_id, cart.status, method, now)? {
                    return Err(lost_race(tx, cart_id, "set checkout method"));
                }
                load(tx, cart_id)
            })
            .await
    }

    /// Attach an order payload to a cart that is still being filled or paid.
    pub async fn set_order_info(&self, cart_id: i64, order_info: &str) -> Result<Cart, KioskError> {
        let order_info = order_info.to_string();
        self.db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                require(&cart, &[CartStatus::Open, CartStatus::Locked], "set order info")?;
                if !carts::set_order_info(tx, cart_id, cart.status, &order_info)? {
                    return Err(lost_race(tx, cart_id, "set order info"));
                }
                load(tx, cart_id)
            })
            .await
    }

    // --- Content ---

    /// Add `amount` of a variant, reserving the stock in the same step.
    pub async fn add_item(
        &self,
        cart_id: i64,
        variant_id: i64,
        amount: i64,
    ) -> Result<Vec<Reservation>, KioskError> {
        self.add_items(cart_id, vec![(variant_id, amount)]).await
    }

    /// Add several lines, all or nothing.
    pub async fn add_items(
        &self,
        cart_id: i64,
        lines: Vec<(i64, i64)>,
    ) -> Result<Vec<Reservation>, KioskError> {
        let now = self.clock.unix_now();
        let created = self
            .db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                add_lines_in(tx, &cart, &lines, now)
            })
            .await?;
        debug!(cart_id, rows = created.len(), "items added");
        Ok(created)
    }

    /// Remove `amount` of a variant and release the matching stock.
    pub async fn remove_item(
        &self,
        cart_id: i64,
        variant_id: i64,
        amount: i64,
    ) -> Result<(), KioskError> {
        let now = self.clock.unix_now();
        self.db
            .transact(move |tx| {
                let cart = load(tx, cart_id)?;
                remove_in(tx, &cart, variant_id, amount, now)
            })
            .await?;
        debug!(cart_id, variant_id, amount, "items removed");
        Ok(())
    }

    /// Apply a signed content change to the cart of `transaction_id`,
    /// opening the cart first if it does not exist yet.
    pub async fn update(
        &self,
        transaction_id: &str,
        cart_type: CartType,
        display_id: i64,
        variant_id: i64,
        delta: i64,
    ) -> Result<Cart, KioskError> {
        let now = self.clock.unix_now();
        let tx_id = transaction_id.to_string();
        self.db
            .transact(move |tx| {
                let cart = match carts::get_cart_by_transaction(tx, &tx_id)? {
                    Some(cart) => cart,
                    None => {
                        let id = carts::insert_cart(tx, &tx_id, cart_type, display_id, now)?;
                        debug!(cart_id = id, transaction_id = %tx_id, "cart opened by update");
                        load(tx, id)?
                    }
                };
                match delta.cmp(&0) {
                    Ordering::Greater => {
                        add_lines_in(tx, &cart, &[(variant_id, delta)], now)?;
                    }
                    Ordering::Less => {
                        let amount = delta.checked_neg().ok_or_else(|| {
                            KioskError::InvalidAmount(format!("delta out of range: {delta}"))
                        })?;
                        remove_in(tx, &cart, variant_id, amount, now)?;
                    }
                    Ordering::Equal => {
                        return Err(KioskError::InvalidAmount(
                            "update delta cannot be zero".to_string(),
                        ));
                    }
                }
                load(tx, cart.id)
            })
            .await
    }

    // --- Queries ---

    pub async fn get_cart(&self, cart_id: i64) -> Result<Cart, KioskError> {
        self.db.with_conn(move |conn| load(conn, cart_id)).await
    }

    pub async fn get_cart_by_transaction(&self, transaction_id: &str) -> Result<Cart, KioskError> {
        let tx_id = transaction_id.to_string();
        self.db
            .with_conn(move |conn| load_by_transaction(conn, &tx_id))
            .await
    }

    pub async fn contents(&self, cart_id: i64) -> Result<Vec<CartItem>, KioskError> {
        self.db
            .with_conn(move |conn| carts::contents(conn, cart_id))
            .await
    }

    pub async fn reservations(&self, cart_id: i64) -> Result<Vec<Reservation>, KioskError> {
        self.db
            .with_conn(move |conn| reservations::for_cart(conn, cart_id))
            .await
    }

    pub async fn list_carts(&self, status: Option<CartStatus>) -> Result<Vec<Cart>, KioskError> {
        self.db
            .with_conn(move |conn| carts::list_carts(conn, status))
            .await
    }
}

fn load(conn: &Connection, cart_id: i64) -> Result<Cart, KioskError> {
    carts::get_cart(conn, cart_id)?.ok_or_else(|| KioskError::CartNotFound(cart_id.to_string()))
}

fn load_by_transaction(conn: &Connection, transaction_id: &str) -> Result<Cart, KioskError> {
    carts::get_cart_by_transaction(conn, transaction_id)?
        .ok_or_else(|| KioskError::CartNotFound(transaction_id.to_string()))
}

fn require(cart: &Cart, allowed: &[CartStatus], action: &'static str) -> Result<(), KioskError> {
    if allowed.contains(&cart.status) {
        Ok(())
    } else {
        Err(KioskError::InvalidCartState {
            cart_id: cart.id,
            status: cart.status,
            action,
        })
    }
}

fn require_remote(cart: &Cart, action: &'static str) -> Result<(), KioskError> {
    if cart.cart_type == CartType::Remote {
        Ok(())
    } else {
        Err(KioskError::InvalidCartState {
            cart_id: cart.id,
            status: cart.status,
            action,
        })
    }
}

/// Error for a conditional update that matched no row: report the state the
/// other writer left behind.
fn lost_race(conn: &Connection, cart_id: i64, action: &'static str) -> KioskError {
    match carts::get_cart(conn, cart_id) {
        Ok(Some(cart)) => KioskError::InvalidCartState {
            cart_id,
            status: cart.status,
            action,
        },
        Ok(None) => KioskError::CartNotFound(cart_id.to_string()),
        Err(e) => e,
    }
}

/// Cause recorded when a cart in its current state times out.
pub(crate) fn expiry_cause(cart: &Cart) -> CompletionCause {
    match (cart.status, cart.cart_type) {
        (CartStatus::Reserved, _) => CompletionCause::ReservationExpired,
        (_, CartType::Remote) => CompletionCause::PrereservationExpired,
        _ => CompletionCause::Expired,
    }
}

#[derive(Serialize)]
struct PayloadLine {
    variant_id: i64,
    amount: i64,
}

/// History payload: the cart's order info, or its contents as JSON.
pub(crate) fn order_payload(conn: &Connection, cart: &Cart) -> Result<String, KioskError> {
    if !cart.order_info.is_empty() {
        return Ok(cart.order_info.clone());
    }
    let lines: Vec<PayloadLine> = carts::contents(conn, cart.id)?
        .into_iter()
        .map(|item| PayloadLine {
            variant_id: item.variant_id,
            amount: item.amount,
        })
        .collect();
    Ok(serde_json::to_string(&lines)?)
}

/// Move `cart` to the terminal state of `cause` and record the outcome.
///
/// Stock is released unless the cart was fulfilled. Returns `false` with no
/// side effects when the cart is no longer in the status (or, with
/// `seen_updated_at`, at the activity timestamp) that was read.
pub(crate) fn finish_in(
    conn: &Connection,
    cart: &Cart,
    cause: CompletionCause,
    now: i64,
    seen_updated_at: Option<i64>,
) -> Result<bool, KioskError> {
    let to = cause.terminal_status();
    if !carts::transition(conn, cart.id, cart.status, to, now, seen_updated_at)? {
        return Ok(false);
    }
    if cause != CompletionCause::Fulfilled {
        let released = coordinator::release_cart_in(conn, cart.id)?;
        debug!(cart_id = cart.id, released, "reservations released");
    }
    let payload = order_payload(conn, cart)?;
    history::record_in(conn, &cart.transaction_id, &payload, cause, now)?;
    Ok(true)
}

fn add_lines_in(
    tx: &mut Transaction<'_>,
    cart: &Cart,
    lines: &[(i64, i64)],
    now: i64,
) -> Result<Vec<Reservation>, KioskError> {
    require(cart, &[CartStatus::Open], "add items")?;
    for &(variant_id, amount) in lines {
        if amount <= 0 {
            return Err(KioskError::InvalidAmount(format!(
                "amount must be positive, got {amount} for variant {variant_id}"
            )));
        }
        if !catalog::variant_is_sellable(tx, variant_id)? {
            return Err(KioskError::VariantNotFound(variant_id));
        }
    }

    let created = coordinator::allocate_in(tx, cart.id, lines)?;
    for &(variant_id, amount) in lines {
        let current = carts::content_amount(tx, cart.id, variant_id)?;
        carts::set_content_amount(tx, cart.id, variant_id, current + amount)?;
    }
    if !carts::touch(tx, cart.id, CartStatus::Open, now)? {
        return Err(lost_race(tx, cart.id, "add items"));
    }
    Ok(created)
}

fn remove_in(
    conn: &Connection,
    cart: &Cart,
    variant_id: i64,
    amount: i64,
    now: i64,
) -> Result<(), KioskError> {
    require(cart, &[CartStatus::Open], "remove items")?;
    if amount <= 0 {
        return Err(KioskError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let current = carts::content_amount(conn, cart.id, variant_id)?;
    if current < amount {
        return Err(KioskError::InvalidAmount(format!(
            "cart {} holds {current} of variant {variant_id}, cannot remove {amount}",
            cart.id
        )));
    }
    coordinator::release_variant_in(conn, cart.id, variant_id, amount)?;
    carts::set_content_amount(conn, cart.id, variant_id, current - amount)?;
    if !carts::touch(conn, cart.id, CartStatus::Open, now)? {
        return Err(lost_race(conn, cart.id, "remove items"));
    }
    Ok(())
}
