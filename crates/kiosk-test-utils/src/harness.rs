// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration tests.
//!
//! `TestHarness` owns a temp directory holding a migrated SQLite database,
//! a catalog with product 1 and variants 7, 8 and 9, any slots added through
//! the builder, and a [`ManualClock`] shared with the components under test.

use std::collections::BTreeMap;
use std::sync::Arc;

use kiosk_config::KioskConfig;
use kiosk_config::model::{AuthConfig, StorageConfig};
use kiosk_core::types::{Localized, LocalizedText, Product, Variant};
use kiosk_core::{InventorySlot, KioskError, ManualClock};
use kiosk_storage::Database;
use kiosk_storage::queries::{carts, catalog, inventory, reservations};

/// Unix time every harness clock starts at.
pub const START_UNIX: i64 = 1_700_000_000;

const PRODUCT_ID: i64 = 1;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    variants: Vec<i64>,
    slots: Vec<InventorySlot>,
    start: i64,
    tweak: Option<Box<dyn FnOnce(&mut KioskConfig) + Send>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            variants: vec![7, 8, 9],
            slots: Vec::new(),
            start: START_UNIX,
            tweak: None,
        }
    }

    /// Add a catalog variant on top of the default ones.
    pub fn with_variant(mut self, variant_id: i64) -> Self {
        if !self.variants.contains(&variant_id) {
            self.variants.push(variant_id);
        }
        self
    }

    /// Stock `quantity` of `variant_id` at `(unit_id, location)`.
    pub fn with_slot(mut self, unit_id: i64, location: i64, variant_id: i64, quantity: i64) -> Self {
        self.slots.push(InventorySlot {
            unit_id,
            tray_number: location / 10,
            location,
            variant_id,
            quantity,
            width: 1,
            depth: 10,
        });
        self
    }

    /// Start the manual clock at a custom Unix time.
    pub fn starting_at(mut self, unix: i64) -> Self {
        self.start = unix;
        self
    }

    /// Adjust the test configuration before it is frozen.
    pub fn with_config(mut self, f: impl FnOnce(&mut KioskConfig) + Send + 'static) -> Self {
        self.tweak = Some(Box::new(f));
        self
    }

    /// Build the harness: open the database, seed catalog and stock.
    pub async fn build(self) -> Result<TestHarness, KioskError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| KioskError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let mut config = KioskConfig {
            storage: StorageConfig {
                database_path: db_path,
                ..StorageConfig::default()
            },
            // Smallest Argon2 parameters the validator accepts.
            auth: AuthConfig {
                kdf_memory_cost: 1024,
                kdf_iterations: 1,
                kdf_parallelism: 1,
            },
            ..KioskConfig::default()
        };
        if let Some(tweak) = self.tweak {
            tweak(&mut config);
        }

        let db = Database::open_with_config(&config.storage).await?;

        let variants = self.variants;
        let slots = self.slots;
        let start = self.start;
        db.transact(move |tx| {
            catalog::upsert_product(tx, &seed_product(start))?;
            for id in variants {
                catalog::upsert_variant(tx, &seed_variant(id))?;
            }
            for slot in &slots {
                inventory::upsert_slot(tx, slot)?;
            }
            Ok(())
        })
        .await?;

        Ok(TestHarness {
            db,
            clock: Arc::new(ManualClock::at_unix(start)),
            config: Arc::new(config),
            _temp_dir: temp_dir,
        })
    }
}

fn seed_product(now: i64) -> Product {
    let mut info = Localized::new();
    info.insert(
        "en",
        LocalizedText {
            name: "Sparkling water".to_string(),
            description: "Chilled".to_string(),
        },
    );
    Product {
        id: PRODUCT_ID,
        last_update: now,
        product_type: "drink".to_string(),
        tags: String::new(),
        info,
        properties: Localized::new(),
    }
}

fn seed_variant(id: i64) -> Variant {
    Variant {
        id,
        product_id: PRODUCT_ID,
        price: 100 + id * 10,
        price_compare: 0,
        price_formatted: String::new(),
        price_compare_formatted: String::new(),
        deleted: false,
        media_id: None,
        info: Localized::new(),
        properties: Localized::new(),
        options: Vec::new(),
    }
}

/// A seeded database with a manual clock and test configuration.
pub struct TestHarness {
    /// Migrated database (temp file, removed on drop).
    pub db: Database,
    /// Clock shared with the components under test.
    pub clock: Arc<ManualClock>,
    /// Frozen test configuration.
    pub config: Arc<KioskConfig>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current quantity of `variant_id` at the slot.
    pub async fn available(&self, unit_id: i64, location: i64, variant_id: i64) -> i64 {
        self.db
            .with_conn(move |conn| inventory::available(conn, unit_id, location, variant_id))
            .await
            .unwrap_or_else(|e| panic!("reading slot ({unit_id}, {location}) failed: {e}"))
    }

    /// Total stock of `variant_id` across all slots.
    pub async fn total_available(&self, variant_id: i64) -> i64 {
        self.db
            .with_conn(move |conn| inventory::total_available(conn, variant_id))
            .await
            .unwrap_or_else(|e| panic!("reading stock of variant {variant_id} failed: {e}"))
    }

    /// Number of reservation rows across all carts.
    pub async fn reservation_count(&self) -> i64 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM reservation", [], |r| r.get(0))?)
            })
            .await
            .unwrap_or_else(|e| panic!("counting reservations failed: {e}"))
    }

    /// Reserved quantity per variant for a cart.
    pub async fn reserved_by_variant(&self, cart_id: i64) -> BTreeMap<i64, i64> {
        self.db
            .with_conn(move |conn| {
                let mut sums = BTreeMap::new();
                for r in reservations::for_cart(conn, cart_id)? {
                    *sums.entry(r.variant_id).or_insert(0) += r.quantity;
                }
                Ok(sums)
            })
            .await
            .unwrap_or_else(|e| panic!("reading reservations of cart {cart_id} failed: {e}"))
    }

    /// Content amount per variant for a cart.
    pub async fn contents_by_variant(&self, cart_id: i64) -> BTreeMap<i64, i64> {
        self.db
            .with_conn(move |conn| {
                Ok(carts::contents(conn, cart_id)?
                    .into_iter()
                    .map(|item| (item.variant_id, item.amount))
                    .collect())
            })
            .await
            .unwrap_or_else(|e| panic!("reading contents of cart {cart_id} failed: {e}"))
    }

    /// Insert a bare open cart directly, bypassing the cart manager.
    pub async fn insert_cart(&self, transaction_id: &str) -> i64 {
        let tx_id = transaction_id.to_string();
        let now = kiosk_core::Clock::unix_now(self.clock.as_ref());
        self.db
            .with_conn(move |conn| {
                carts::insert_cart(conn, &tx_id, kiosk_core::CartType::Local, 1, now)
            })
            .await
            .unwrap_or_else(|e| panic!("inserting cart {transaction_id} failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_seeds_catalog_and_slots() {
        let harness = TestHarness::builder()
            .with_variant(42)
            .with_slot(1, 3, 7, 2)
            .with_slot(1, 9, 7, 5)
            .build()
            .await
            .unwrap();

        assert_eq!(harness.available(1, 3, 7).await, 2);
        assert_eq!(harness.total_available(7).await, 7);
        assert_eq!(harness.total_available(42).await, 0);

        let sellable = harness
            .db
            .with_conn(|conn| catalog::variant_is_sellable(conn, 42))
            .await
            .unwrap();
        assert!(sellable);
        assert_eq!(harness.config.auth.kdf_iterations, 1);
    }

    #[tokio::test]
    async fn config_tweak_is_applied() {
        let harness = TestHarness::builder()
            .with_config(|c| c.cart.currency = "SEK".to_string())
            .build()
            .await
            .unwrap();
        assert_eq!(harness.config.cart.currency(), "SEK");
    }
}
