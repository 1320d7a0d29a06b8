//! libSQL implementation of the storage traits.
//!
//! Each area lives in its own file as an `impl XStore for DatabaseStorage`.
//! Helpers here take a plain `&Connection` so they work both on the shared
//! connection and inside a [`Tx`](crate::database::Tx).

mod access;
mod accounts;
mod catalog;
mod media;
mod payroll;
pub(crate) mod rows;
mod reviews;
mod sales;
mod stock;

use crate::common::error::{Result, ShopError};
use crate::database::DatabaseManager;
use crate::domain::{Product, Rating, Translation};
use crate::pricing::{discounted_price, StockLevel};
use chrono::Utc;
use libsql::{Connection, Value};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use rows::*;

/// Database storage backed by libSQL tables.
pub struct DatabaseStorage {
    db: Arc<DatabaseManager>,
}

impl DatabaseStorage {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Open the database at `url`, apply migrations and wrap it.
    pub async fn open(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let db_manager = DatabaseManager::new(url, auth_token).await?;
        db_manager.run_migrations().await?;
        info!("Database storage ready");

        Ok(Self::new(Arc::new(db_manager)))
    }

    pub fn manager(&self) -> &Arc<DatabaseManager> {
        &self.db
    }
}

pub(crate) async fn fetch_all(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
    let mut rows = conn.query(sql, params).await?;
    let columns = rows.column_count();
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(Record::from_row(&row, columns)?);
    }
    Ok(out)
}

pub(crate) async fn fetch_one(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
    let mut rows = conn.query(sql, params).await?;
    let columns = rows.column_count();
    match rows.next().await? {
        Some(row) => Ok(Some(Record::from_row(&row, columns)?)),
        None => Ok(None),
    }
}

pub(crate) async fn fetch_count(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<i64> {
    match fetch_one(conn, sql, params).await? {
        Some(row) => get_i64(&row, 0),
        None => Ok(0),
    }
}

pub(crate) async fn exists(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<bool> {
    Ok(fetch_one(conn, sql, params).await?.is_some())
}

/// Run an `INSERT ... RETURNING id` and return the new id.
pub(crate) async fn insert_returning_id(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<i64> {
    match fetch_one(conn, sql, params).await? {
        Some(row) => get_i64(&row, 0),
        None => Err(ShopError::Internal("insert returned no id".to_string())),
    }
}

/// Map a UNIQUE violation to a Conflict with `message`, anything else to a
/// database error.
pub(crate) fn conflict_on_unique(e: libsql::Error, message: impl Into<String>) -> ShopError {
    if is_unique_violation(&e) {
        ShopError::Conflict(message.into())
    } else {
        e.into()
    }
}

/// Same as [`conflict_on_unique`] for errors already converted to [`ShopError`].
pub(crate) fn unique_as_conflict(e: ShopError, message: impl Into<String>) -> ShopError {
    match e {
        ShopError::Database { message: db } if db.contains("UNIQUE constraint failed") => {
            ShopError::Conflict(message.into())
        }
        other => other,
    }
}

/// Lowercased form of a title for substring search. SQLite's `lower()` only
/// folds ASCII, so the folding happens here for both stored titles and queries.
pub(crate) fn search_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Translation tables share the `(owner, lang, title, description)` shape.
#[derive(Clone, Copy)]
pub(crate) struct TranslationTable {
    pub table: &'static str,
    pub owner: &'static str,
}

pub(crate) const CATEGORY_TRANSLATIONS: TranslationTable = TranslationTable {
    table: "category_translations",
    owner: "category_id",
};
pub(crate) const SUBCATEGORY_TRANSLATIONS: TranslationTable = TranslationTable {
    table: "subcategory_translations",
    owner: "subcategory_id",
};
pub(crate) const PRODUCT_TRANSLATIONS: TranslationTable = TranslationTable {
    table: "product_translations",
    owner: "product_id",
};

impl TranslationTable {
    pub(crate) async fn load(&self, conn: &Connection, owner_id: i64) -> Result<Vec<Translation>> {
        let sql = format!(
            "SELECT lang, title, description FROM {} WHERE {} = ?1 ORDER BY lang",
            self.table, self.owner
        );
        fetch_all(conn, &sql, vec![int(owner_id)])
            .await?
            .iter()
            .map(|row| {
                Ok(Translation {
                    lang: get_string(row, 0)?,
                    title: get_string(row, 1)?,
                    description: get_opt_string(row, 2)?,
                })
            })
            .collect()
    }

    pub(crate) async fn replace(&self, conn: &Connection, owner_id: i64, translations: &[Translation]) -> Result<()> {
        let delete = format!("DELETE FROM {} WHERE {} = ?1", self.table, self.owner);
        conn.execute(&delete, vec![int(owner_id)]).await?;

        let insert = format!(
            "INSERT INTO {} ({}, lang, title, title_search, description) VALUES (?1, ?2, ?3, ?4, ?5)",
            self.table, self.owner
        );
        for t in translations {
            conn.execute(
                &insert,
                vec![
                    int(owner_id),
                    text(t.lang.as_str()),
                    text(t.title.as_str()),
                    text(search_key(&t.title)),
                    opt_text(t.description.clone()),
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, format!("title '{}' already exists for language {}", t.title, t.lang)))?;
        }
        Ok(())
    }

    /// Conflict if another owner already uses one of the titles in the same language.
    pub(crate) async fn ensure_titles_free(
        &self,
        conn: &Connection,
        translations: &[Translation],
        except_owner: Option<i64>,
    ) -> Result<()> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE lang = ?1 AND title = ?2 AND {} != ?3",
            self.table, self.owner
        );
        for t in translations {
            let taken = exists(
                conn,
                &sql,
                vec![text(t.lang.as_str()), text(t.title.as_str()), int(except_owner.unwrap_or(0))],
            )
            .await?;
            if taken {
                return Err(ShopError::Conflict(format!(
                    "title '{}' already exists for language {}",
                    t.title, t.lang
                )));
            }
        }
        Ok(())
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.subcategory_id, p.article, p.barcode, p.price, p.quantity, \
     p.sum, p.sale_quantity, p.is_active, p.created_at, p.updated_at, p.deleted_at";

/// Build a full product from a row selected with [`PRODUCT_COLUMNS`].
pub(crate) async fn product_from_row(conn: &Connection, row: &Record) -> Result<Product> {
    let id = get_i64(row, 0)?;
    let price = get_decimal(row, 4)?;

    let effective_price = match active_discount_percent(conn, id).await? {
        Some(percent) => discounted_price(price, percent),
        None => price,
    };

    let media_ids = fetch_all(
        conn,
        "SELECT media_id FROM product_media WHERE product_id = ?1 ORDER BY position, media_id",
        vec![int(id)],
    )
    .await?
    .iter()
    .map(|r| get_i64(r, 0))
    .collect::<Result<Vec<_>>>()?;

    Ok(Product {
        id,
        subcategory_id: get_opt_i64(row, 1)?,
        article: get_string(row, 2)?,
        barcode: get_opt_string(row, 3)?,
        price,
        effective_price,
        quantity: get_i64(row, 5)?,
        sum: get_decimal(row, 6)?,
        sale_quantity: get_i64(row, 7)?,
        is_active: get_bool(row, 8)?,
        translations: PRODUCT_TRANSLATIONS.load(conn, id).await?,
        media_ids,
        rating: product_rating(conn, id).await?,
        audit: get_audit(row, 9)?,
    })
}

/// Load a live (not soft-deleted) product.
pub(crate) async fn load_product(conn: &Connection, id: i64) -> Result<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1 AND p.deleted_at IS NULL");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => product_from_row(conn, &row).await,
        None => Err(ShopError::not_found("Product", id)),
    }
}

/// Percent of the discount active right now, if any.
pub(crate) async fn active_discount_percent(conn: &Connection, product_id: i64) -> Result<Option<i64>> {
    let row = fetch_one(
        conn,
        "SELECT percent FROM discounts
         WHERE product_id = ?1 AND starts_at <= ?2 AND ends_at > ?2
         ORDER BY starts_at DESC LIMIT 1",
        vec![int(product_id), ts(Utc::now())],
    )
    .await?;
    row.map(|r| get_i64(&r, 0)).transpose()
}

pub(crate) async fn product_rating(conn: &Connection, product_id: i64) -> Result<Rating> {
    let row = fetch_one(
        conn,
        "SELECT COUNT(*), COALESCE(SUM(rating), 0) FROM reviews WHERE product_id = ?1",
        vec![int(product_id)],
    )
    .await?;
    let Some(row) = row else {
        return Ok(Rating::default());
    };
    let count = get_i64(&row, 0)?;
    let total = get_i64(&row, 1)?;
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(total) / Decimal::from(count)).round_dp(2)
    };
    Ok(Rating { average, count })
}

/// Current stock counters of a live product.
pub(crate) async fn load_stock_level(conn: &Connection, product_id: i64) -> Result<StockLevel> {
    let row = fetch_one(
        conn,
        "SELECT quantity, sum, sale_quantity FROM products WHERE id = ?1 AND deleted_at IS NULL",
        vec![int(product_id)],
    )
    .await?
    .ok_or_else(|| ShopError::not_found("Product", product_id))?;

    Ok(StockLevel {
        quantity: get_i64(&row, 0)?,
        sum: get_decimal(&row, 1)?,
        sale_quantity: get_i64(&row, 2)?,
    })
}

pub(crate) async fn store_stock_level(conn: &Connection, product_id: i64, level: StockLevel) -> Result<()> {
    conn.execute(
        "UPDATE products SET quantity = ?2, sum = ?3, sale_quantity = ?4, updated_at = ?5 WHERE id = ?1",
        vec![
            int(product_id),
            int(level.quantity),
            dec(level.sum),
            int(level.sale_quantity),
            now(),
        ],
    )
    .await?;
    Ok(())
}

/// `LIMIT ?n OFFSET ?n+1` values appended after `params`.
pub(crate) fn paged(mut params: Vec<Value>, list: &crate::common::ListParams) -> (Vec<Value>, usize) {
    let next = params.len() + 1;
    params.push(int(list.limit()));
    params.push(int(list.offset()));
    (params, next)
}

/// Incrementally built `WHERE` clause with numbered placeholders.
///
/// Every `?` in a clause becomes the next `?N`, so a clause may reference its
/// single value more than once.
#[derive(Default)]
pub(crate) struct Where {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Where {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn raw(mut self, clause: &str) -> Self {
        self.clauses.push(clause.to_string());
        self
    }

    pub(crate) fn and(&mut self, clause: &str, value: Value) {
        self.params.push(value);
        let placeholder = format!("?{}", self.params.len());
        self.clauses.push(clause.replace('?', &placeholder));
    }

    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> Vec<Value> {
        self.params.clone()
    }
}
