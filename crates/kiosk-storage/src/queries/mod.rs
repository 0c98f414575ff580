// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage entities.

pub mod carts;
pub mod catalog;
pub mod inventory;
pub mod order_history;
pub mod reservations;
pub mod settings;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use kiosk_core::InventorySlot;
    use tempfile::{TempDir, tempdir};

    use crate::database::Database;

    /// Open a fresh database holding product 1 with variants 7, 8 and 9.
    pub async fn open_seeded() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO product (id, last_update, type, tags) VALUES (1, 0, 'drink', '');
                 INSERT INTO variant (id, product_id, price) VALUES (7, 1, 250);
                 INSERT INTO variant (id, product_id, price) VALUES (8, 1, 300);
                 INSERT INTO variant (id, product_id, price) VALUES (9, 1, 350);",
            )?;
            Ok(())
        })
        .await
        .unwrap();
        (db, dir)
    }

    pub fn slot(unit_id: i64, location: i64, variant_id: i64, quantity: i64) -> InventorySlot {
        InventorySlot {
            unit_id,
            tray_number: location / 10,
            location,
            variant_id,
            quantity,
            width: 1,
            depth: 10,
        }
    }
}
