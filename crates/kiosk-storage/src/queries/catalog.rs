// SPDX-FileCopyrightText: 2026 Kiosk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog queries: products, variants, collections and media.
//!
//! Upserts replace the language-scoped child rows wholesale. Deletes remove
//! children explicitly before the parent, mirroring the declared cascades so
//! the outcome does not depend on `foreign_keys` being enabled.

use std::collections::BTreeMap;

use kiosk_config::model::GeneralConfig;
use kiosk_core::KioskError;
use kiosk_core::types::{
    Collection, DisplayText, Localized, LocalizedText, Media, ObjectProperty, Product, Variant,
    VariantOption,
};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

/// Outcome of a catalog delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Rows were deleted.
    Deleted,
    /// The variant is still stocked or held by a cart; it was flagged
    /// `deleted` instead so existing holds stay valid.
    SoftDeleted,
    NotFound,
}

// --- Media ---

pub fn upsert_media(conn: &Connection, media: &Media) -> Result<(), KioskError> {
    conn.execute(
        "INSERT INTO media (id, filename, last_update) VALUES (?1, ?2, ?3)
         ON CONFLICT (id) DO UPDATE SET filename = excluded.filename,
                                        last_update = excluded.last_update",
        params![media.id, media.filename, media.last_update],
    )?;
    Ok(())
}

pub fn get_media(conn: &Connection, id: i64) -> Result<Option<Media>, KioskError> {
    Ok(conn
        .query_row(
            "SELECT id, filename, last_update FROM media WHERE id = ?1",
            params![id],
            |row| {
                Ok(Media {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    last_update: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn delete_media(conn: &Connection, id: i64) -> Result<bool, KioskError> {
    conn.execute("UPDATE variant SET media_id = NULL WHERE media_id = ?1", params![id])?;
    conn.execute(
        "UPDATE collection SET media_id = NULL WHERE media_id = ?1",
        params![id],
    )?;
    Ok(conn.execute("DELETE FROM media WHERE id = ?1", params![id])? > 0)
}

// --- Localized child rows ---

fn load_info(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
) -> Result<Localized<LocalizedText>, KioskError> {
    let sql = format!("SELECT language, name, description FROM {table} WHERE {owner_column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            LocalizedText {
                name: row.get(1)?,
                description: row.get(2)?,
            },
        ))
    })?;
    let mut info = Localized::new();
    for row in rows {
        let (language, text) = row?;
        info.insert(language, text);
    }
    Ok(info)
}

fn store_info(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    info: &Localized<LocalizedText>,
) -> Result<(), KioskError> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
        params![owner_id],
    )?;
    let sql = format!(
        "INSERT INTO {table} ({owner_column}, language, name, description) VALUES (?1, ?2, ?3, ?4)"
    );
    let mut stmt = conn.prepare(&sql)?;
    for (language, text) in info.iter() {
        stmt.execute(params![owner_id, language, text.name, text.description])?;
    }
    Ok(())
}

fn load_properties(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
) -> Result<Localized<Vec<ObjectProperty>>, KioskError> {
    let sql = format!(
        "SELECT language, type, name, value FROM {table} WHERE {owner_column} = ?1 ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            ObjectProperty {
                property_type: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
            },
        ))
    })?;
    let mut grouped: BTreeMap<String, Vec<ObjectProperty>> = BTreeMap::new();
    for row in rows {
        let (language, property) = row?;
        grouped.entry(language).or_default().push(property);
    }
    Ok(Localized(grouped))
}

fn store_properties(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    properties: &Localized<Vec<ObjectProperty>>,
) -> Result<(), KioskError> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
        params![owner_id],
    )?;
    let sql = format!(
        "INSERT INTO {table} ({owner_column}, language, type, name, value) VALUES (?1, ?2, ?3, ?4, ?5)"
    );
    let mut stmt = conn.prepare(&sql)?;
    for (language, list) in properties.iter() {
        for p in list {
            stmt.execute(params![owner_id, language, p.property_type, p.name, p.value])?;
        }
    }
    Ok(())
}

// --- Display texts ---

/// Pick the text for the configured display language, falling back to the
/// configured fallback language and then to any language present.
fn display_text(
    info: &Localized<LocalizedText>,
    general: &GeneralConfig,
    kind: &'static str,
    id: i64,
) -> Option<DisplayText> {
    let (language, text) = info.resolve(&general.language, &general.fallback_language)?;
    if language != general.language {
        warn!(
            kind,
            id,
            wanted = %general.language,
            used = language,
            "catalog text missing for display language"
        );
    }
    Some(DisplayText {
        language: language.to_string(),
        name: text.name.clone(),
        description: text.description.clone(),
    })
}

/// Display text of a product; `None` when it does not exist or has no text.
pub fn product_display(
    conn: &Connection,
    id: i64,
    general: &GeneralConfig,
) -> Result<Option<DisplayText>, KioskError> {
    let info = load_info(conn, "product_info", "product_id", id)?;
    Ok(display_text(&info, general, "product", id))
}

/// Display text of a variant. A variant without texts of its own shows its
/// product's text.
pub fn variant_display(
    conn: &Connection,
    id: i64,
    general: &GeneralConfig,
) -> Result<Option<DisplayText>, KioskError> {
    let info = load_info(conn, "variant_info", "variant_id", id)?;
    if !info.is_empty() {
        return Ok(display_text(&info, general, "variant", id));
    }
    let product_id: Option<i64> = conn
        .query_row(
            "SELECT product_id FROM variant WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match product_id {
        Some(product_id) => product_display(conn, product_id, general),
        None => Ok(None),
    }
}

pub fn collection_display(
    conn: &Connection,
    id: i64,
    general: &GeneralConfig,
) -> Result<Option<DisplayText>, KioskError> {
    let info = load_info(conn, "collection_info", "collection_id", id)?;
    Ok(display_text(&info, general, "collection", id))
}

// --- Products ---

pub fn upsert_product(conn: &Connection, product: &Product) -> Result<(), KioskError> {
    conn.execute(
        "INSERT INTO product (id, last_update, type, tags) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (id) DO UPDATE SET last_update = excluded.last_update,
                                        type = excluded.type,
                                        tags = excluded.tags",
        params![
            product.id,
            product.last_update,
            product.product_type,
            product.tags
        ],
    )?;
    store_info(conn, "product_info", "product_id", product.id, &product.info)?;
    store_properties(
        conn,
        "product_property",
        "product_id",
        product.id,
        &product.properties,
    )?;
    Ok(())
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Option<Product>, KioskError> {
    let head = conn
        .query_row(
            "SELECT id, last_update, type, tags FROM product WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    let Some((id, last_update, product_type, tags)) = head else {
        return Ok(None);
    };
    Ok(Some(Product {
        id,
        last_update,
        product_type,
        tags,
        info: load_info(conn, "product_info", "product_id", id)?,
        properties: load_properties(conn, "product_property", "product_id", id)?,
    }))
}

pub fn product_ids(conn: &Connection) -> Result<Vec<i64>, KioskError> {
    let mut stmt = conn.prepare("SELECT id FROM product ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Delete a product with its variants and collection links.
///
/// When any variant is still stocked or reserved, every variant of the
/// product is soft-deleted and the product row stays.
pub fn delete_product(conn: &Connection, id: i64) -> Result<Removal, KioskError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM product WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(Removal::NotFound);
    }

    let variant_ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM variant WHERE product_id = ?1")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        rows.collect::<Result<_, _>>()?
    };

    let mut in_use = false;
    for &variant_id in &variant_ids {
        if variant_in_use(conn, variant_id)? {
            in_use = true;
            break;
        }
    }
    if in_use {
        conn.execute(
            "UPDATE variant SET deleted = 1 WHERE product_id = ?1",
            params![id],
        )?;
        debug!(product_id = id, "product still referenced, variants soft-deleted");
        return Ok(Removal::SoftDeleted);
    }

    for variant_id in variant_ids {
        delete_variant_rows(conn, variant_id)?;
    }
    conn.execute(
        "DELETE FROM product_collection WHERE product_id = ?1",
        params![id],
    )?;
    conn.execute(
        "DELETE FROM product_property WHERE product_id = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM product_info WHERE product_id = ?1", params![id])?;
    conn.execute("DELETE FROM product WHERE id = ?1", params![id])?;
    Ok(Removal::Deleted)
}

// --- Variants ---

pub fn upsert_variant(conn: &Connection, variant: &Variant) -> Result<(), KioskError> {
    conn.execute(
        "INSERT INTO variant (id, product_id, price, price_compare, price_formatted,
                              price_compare_formatted, deleted, media_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (id) DO UPDATE SET product_id = excluded.product_id,
                                        price = excluded.price,
                                        price_compare = excluded.price_compare,
                                        price_formatted = excluded.price_formatted,
                                        price_compare_formatted = excluded.price_compare_formatted,
                                        deleted = excluded.deleted,
                                        media_id = excluded.media_id",
        params![
            variant.id,
            variant.product_id,
            variant.price,
            variant.price_compare,
            variant.price_formatted,
            variant.price_compare_formatted,
            variant.deleted,
            variant.media_id,
        ],
    )?;
    store_info(conn, "variant_info", "variant_id", variant.id, &variant.info)?;
    store_properties(
        conn,
        "variant_property",
        "variant_id",
        variant.id,
        &variant.properties,
    )?;
    conn.execute(
        "DELETE FROM variant_option WHERE variant_id = ?1",
        params![variant.id],
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO variant_option (variant_id, option, value) VALUES (?1, ?2, ?3)")?;
    for option in &variant.options {
        stmt.execute(params![variant.id, option.option, option.value])?;
    }
    Ok(())
}

pub fn get_variant(conn: &Connection, id: i64) -> Result<Option<Variant>, KioskError> {
    let head = conn
        .query_row(
            "SELECT id, product_id, price, price_compare, price_formatted,
                    price_compare_formatted, deleted, media_id
             FROM variant WHERE id = ?1",
            params![id],
            |row| {
                Ok(Variant {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    price: row.get(2)?,
                    price_compare: row.get(3)?,
                    price_formatted: row.get(4)?,
                    price_compare_formatted: row.get(5)?,
                    deleted: row.get(6)?,
                    media_id: row.get(7)?,
                    info: Localized::new(),
                    properties: Localized::new(),
                    options: Vec::new(),
                })
            },
        )
        .optional()?;
    let Some(mut variant) = head else {
        return Ok(None);
    };
    variant.info = load_info(conn, "variant_info", "variant_id", id)?;
    variant.properties = load_properties(conn, "variant_property", "variant_id", id)?;
    let mut stmt =
        conn.prepare("SELECT option, value FROM variant_option WHERE variant_id = ?1 ORDER BY option")?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(VariantOption {
            option: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    variant.options = rows.collect::<Result<_, _>>()?;
    Ok(Some(variant))
}

/// Ids of the live (not soft-deleted) variants of a product.
pub fn variant_ids_for_product(conn: &Connection, product_id: i64) -> Result<Vec<i64>, KioskError> {
    let mut stmt =
        conn.prepare("SELECT id FROM variant WHERE product_id = ?1 AND deleted = 0 ORDER BY id")?;
    let rows = stmt.query_map(params![product_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<_, _>>()?)
}

/// Whether the variant exists and is not soft-deleted.
pub fn variant_is_sellable(conn: &Connection, id: i64) -> Result<bool, KioskError> {
    Ok(conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM variant WHERE id = ?1 AND deleted = 0)",
        params![id],
        |row| row.get(0),
    )?)
}

fn variant_in_use(conn: &Connection, id: i64) -> Result<bool, KioskError> {
    Ok(conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM inventory WHERE variant_id = ?1)
             OR EXISTS (SELECT 1 FROM cart_contents WHERE variant_id = ?1)
             OR EXISTS (SELECT 1 FROM reservation WHERE variant_id = ?1)",
        params![id],
        |row| row.get(0),
    )?)
}

fn delete_variant_rows(conn: &Connection, id: i64) -> Result<bool, KioskError> {
    conn.execute("DELETE FROM variant_option WHERE variant_id = ?1", params![id])?;
    conn.execute(
        "DELETE FROM variant_property WHERE variant_id = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM variant_info WHERE variant_id = ?1", params![id])?;
    Ok(conn.execute("DELETE FROM variant WHERE id = ?1", params![id])? > 0)
}

/// Delete a variant, or soft-delete it while stock or carts reference it.
pub fn delete_variant(conn: &Connection, id: i64) -> Result<Removal, KioskError> {
    if variant_in_use(conn, id)? {
        let changed = conn.execute("UPDATE variant SET deleted = 1 WHERE id = ?1", params![id])?;
        debug!(variant_id = id, "variant still referenced, soft-deleted");
        return Ok(if changed > 0 {
            Removal::SoftDeleted
        } else {
            Removal::NotFound
        });
    }
    Ok(if delete_variant_rows(conn, id)? {
        Removal::Deleted
    } else {
        Removal::NotFound
    })
}

// --- Collections ---

pub fn upsert_collection(conn: &Connection, collection: &Collection) -> Result<(), KioskError> {
    conn.execute(
        "INSERT INTO collection (id, last_update, media_id) VALUES (?1, ?2, ?3)
         ON CONFLICT (id) DO UPDATE SET last_update = excluded.last_update,
                                        media_id = excluded.media_id",
        params![collection.id, collection.last_update, collection.media_id],
    )?;
    store_info(
        conn,
        "collection_info",
        "collection_id",
        collection.id,
        &collection.info,
    )?;
    conn.execute(
        "DELETE FROM product_collection WHERE collection_id = ?1",
        params![collection.id],
    )?;
    let mut stmt = conn
        .prepare("INSERT OR IGNORE INTO product_collection (product_id, collection_id) VALUES (?1, ?2)")?;
    for product_id in &collection.product_ids {
        stmt.execute(params![product_id, collection.id])?;
    }
    Ok(())
}

pub fn get_collection(conn: &Connection, id: i64) -> Result<Option<Collection>, KioskError> {
    let head = conn
        .query_row(
            "SELECT id, last_update, media_id FROM collection WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((id, last_update, media_id)) = head else {
        return Ok(None);
    };
    let mut stmt = conn.prepare(
        "SELECT product_id FROM product_collection WHERE collection_id = ?1 ORDER BY product_id",
    )?;
    let rows = stmt.query_map(params![id], |row| row.get(0))?;
    let product_ids = rows.collect::<Result<_, _>>()?;
    Ok(Some(Collection {
        id,
        last_update,
        media_id,
        info: load_info(conn, "collection_info", "collection_id", id)?,
        product_ids,
    }))
}

pub fn delete_collection(conn: &Connection, id: i64) -> Result<Removal, KioskError> {
    conn.execute(
        "DELETE FROM product_collection WHERE collection_id = ?1",
        params![id],
    )?;
    conn.execute(
        "DELETE FROM collection_info WHERE collection_id = ?1",
        params![id],
    )?;
    let changed = conn.execute("DELETE FROM collection WHERE id = ?1", params![id])?;
    Ok(if changed > 0 {
        Removal::Deleted
    } else {
        Removal::NotFound
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::inventory::upsert_slot;
    use crate::queries::test_support::{open_seeded, slot};

    fn text(name: &str) -> LocalizedText {
        LocalizedText {
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn product(id: i64) -> Product {
        let mut info = Localized::new();
        info.insert("en", text("Sparkling water"));
        info.insert("fi", text("Kivennäisvesi"));
        let mut properties = Localized::new();
        properties.insert(
            "en",
            vec![ObjectProperty {
                property_type: "text".into(),
                name: "volume".into(),
                value: "0.5 l".into(),
            }],
        );
        Product {
            id,
            last_update: 10,
            product_type: "drink".into(),
            tags: "cold".into(),
            info,
            properties,
        }
    }

    fn variant(id: i64, product_id: i64) -> Variant {
        let mut info = Localized::new();
        info.insert("en", text("Lemon"));
        Variant {
            id,
            product_id,
            price: 250,
            price_compare: 300,
            price_formatted: "2.50".into(),
            price_compare_formatted: "3.00".into(),
            deleted: false,
            media_id: None,
            info,
            properties: Localized::new(),
            options: vec![VariantOption {
                option: "flavor".into(),
                value: "lemon".into(),
            }],
        }
    }

    #[tokio::test]
    async fn product_and_variant_upsert_round_trip() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_product(conn, &product(20))?;
            upsert_variant(conn, &variant(21, 20))?;

            let p = get_product(conn, 20)?.unwrap();
            assert_eq!(p, product(20));
            assert_eq!(p.info.get("sv", "fi").unwrap().name, "Kivennäisvesi");

            let v = get_variant(conn, 21)?.unwrap();
            assert_eq!(v, variant(21, 20));
            assert_eq!(variant_ids_for_product(conn, 20)?, vec![21]);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    fn display_in(language: &str) -> GeneralConfig {
        GeneralConfig {
            language: language.to_string(),
            fallback_language: "en".to_string(),
            ..GeneralConfig::default()
        }
    }

    #[tokio::test]
    async fn display_text_follows_configured_language() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_product(conn, &product(20))?;

            let fi = product_display(conn, 20, &display_in("fi"))?.unwrap();
            assert_eq!(fi.language, "fi");
            assert_eq!(fi.name, "Kivennäisvesi");

            // No Swedish text: the configured fallback is used.
            let sv = product_display(conn, 20, &display_in("sv"))?.unwrap();
            assert_eq!(sv.language, "en");
            assert_eq!(sv.name, "Sparkling water");

            // Neither display nor fallback language: any text beats none.
            let mut only_fi = product(22);
            only_fi.info.0.remove("en");
            upsert_product(conn, &only_fi)?;
            let de = product_display(conn, 22, &display_in("de"))?.unwrap();
            assert_eq!(de.language, "fi");

            assert!(product_display(conn, 999, &display_in("fi"))?.is_none());
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn variant_without_text_shows_product_text() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_product(conn, &product(20))?;
            upsert_variant(conn, &variant(21, 20))?;
            let mut bare = variant(23, 20);
            bare.info = Localized::new();
            upsert_variant(conn, &bare)?;

            let own = variant_display(conn, 21, &display_in("fi"))?.unwrap();
            assert_eq!(own.name, "Lemon");
            assert_eq!(own.language, "en");

            let inherited = variant_display(conn, 23, &display_in("fi"))?.unwrap();
            assert_eq!(inherited.name, "Kivennäisvesi");

            assert!(variant_display(conn, 999, &display_in("fi"))?.is_none());
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_product_removes_children_in_order() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_product(conn, &product(20))?;
            upsert_variant(conn, &variant(21, 20))?;
            upsert_collection(
                conn,
                &Collection {
                    id: 5,
                    last_update: 0,
                    media_id: None,
                    info: Localized::new(),
                    product_ids: vec![20, 1],
                },
            )?;

            assert_eq!(delete_product(conn, 20)?, Removal::Deleted);
            assert!(get_product(conn, 20)?.is_none());
            assert!(get_variant(conn, 21)?.is_none());
            assert_eq!(get_collection(conn, 5)?.unwrap().product_ids, vec![1]);
            assert_eq!(delete_product(conn, 20)?, Removal::NotFound);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stocked_variant_is_soft_deleted() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_slot(conn, &slot(1, 3, 7, 2))?;
            assert_eq!(delete_variant(conn, 7)?, Removal::SoftDeleted);
            assert!(!variant_is_sellable(conn, 7)?);
            assert!(get_variant(conn, 7)?.unwrap().deleted);

            assert_eq!(delete_variant(conn, 8)?, Removal::Deleted);
            assert!(get_variant(conn, 8)?.is_none());
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deleting_media_clears_references() {
        let (db, _dir) = open_seeded().await;
        db.with_conn(|conn| {
            upsert_media(
                conn,
                &Media {
                    id: 3,
                    filename: "lemon.png".into(),
                    last_update: 1,
                },
            )?;
            let mut v = variant(21, 1);
            v.media_id = Some(3);
            upsert_variant(conn, &v)?;

            assert!(delete_media(conn, 3)?);
            assert!(get_media(conn, 3)?.is_none());
            assert_eq!(get_variant(conn, 21)?.unwrap().media_id, None);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await.unwrap();
    }
}
