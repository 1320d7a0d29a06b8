use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::storage::traits::CatalogStore;
use async_trait::async_trait;
use tracing::{debug, info};

const CATEGORY_COLUMNS: &str = "id, position, created_at, updated_at, deleted_at";
const SUBCATEGORY_COLUMNS: &str = "id, category_id, position, created_at, updated_at, deleted_at";

async fn category_from_row(conn: &Connection, row: &Record) -> Result<Category> {
    let id = get_i64(row, 0)?;
    Ok(Category {
        id,
        position: get_i64(row, 1)?,
        translations: CATEGORY_TRANSLATIONS.load(conn, id).await?,
        audit: get_audit(row, 2)?,
    })
}

async fn subcategory_from_row(conn: &Connection, row: &Record) -> Result<Subcategory> {
    let id = get_i64(row, 0)?;
    Ok(Subcategory {
        id,
        category_id: get_i64(row, 1)?,
        position: get_i64(row, 2)?,
        translations: SUBCATEGORY_TRANSLATIONS.load(conn, id).await?,
        audit: get_audit(row, 3)?,
    })
}

async fn load_category(conn: &Connection, id: i64) -> Result<Category> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => category_from_row(conn, &row).await,
        None => Err(ShopError::not_found("Category", id)),
    }
}

async fn load_subcategory(conn: &Connection, id: i64) -> Result<Subcategory> {
    let sql = format!("SELECT {SUBCATEGORY_COLUMNS} FROM subcategories WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => subcategory_from_row(conn, &row).await,
        None => Err(ShopError::not_found("Subcategory", id)),
    }
}

async fn ensure_category_exists(conn: &Connection, id: i64) -> Result<()> {
    if exists(conn, "SELECT 1 FROM categories WHERE id = ?1", vec![int(id)]).await? {
        Ok(())
    } else {
        Err(ShopError::not_found("Category", id))
    }
}

async fn ensure_subcategory_exists(conn: &Connection, id: i64) -> Result<()> {
    if exists(conn, "SELECT 1 FROM subcategories WHERE id = ?1", vec![int(id)]).await? {
        Ok(())
    } else {
        Err(ShopError::not_found("Subcategory", id))
    }
}

/// Conflict if a live product other than `except` already uses the article or barcode.
async fn ensure_product_codes_free(
    conn: &Connection,
    article: Option<&str>,
    barcode: Option<&str>,
    except: Option<i64>,
) -> Result<()> {
    let except = int(except.unwrap_or(0));
    if let Some(article) = article {
        let taken = exists(
            conn,
            "SELECT 1 FROM products WHERE article = ?1 AND deleted_at IS NULL AND id != ?2",
            vec![text(article), except.clone()],
        )
        .await?;
        if taken {
            return Err(ShopError::Conflict(format!("product with article '{article}' already exists")));
        }
    }
    if let Some(barcode) = barcode {
        let taken = exists(
            conn,
            "SELECT 1 FROM products WHERE barcode = ?1 AND deleted_at IS NULL AND id != ?2",
            vec![text(barcode), except],
        )
        .await?;
        if taken {
            return Err(ShopError::Conflict(format!("product with barcode '{barcode}' already exists")));
        }
    }
    Ok(())
}

async fn ensure_media_exists(conn: &Connection, id: i64) -> Result<()> {
    if exists(conn, "SELECT 1 FROM media WHERE id = ?1", vec![int(id)]).await? {
        Ok(())
    } else {
        Err(ShopError::not_found("Media", id))
    }
}

#[async_trait]
impl CatalogStore for DatabaseStorage {
    async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let tx = self.db.begin().await?;
        let result = async {
            CATEGORY_TRANSLATIONS.ensure_titles_free(&tx, &input.translations, None).await?;
            let id = insert_returning_id(
                &tx,
                "INSERT INTO categories (position, created_at, updated_at) VALUES (?1, ?2, ?2) RETURNING id",
                vec![int(input.position), now()],
            )
            .await?;
            CATEGORY_TRANSLATIONS.replace(&tx, id, &input.translations).await?;
            load_category(&tx, id).await
        }
        .await;
        let category = tx.finish(result).await?;

        info!("Created category {}", category.id);
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> Result<Category> {
        let conn = self.db.connection().await;
        load_category(&conn, id).await
    }

    async fn list_categories(&self, params: ListParams) -> Result<Page<Category>> {
        let conn = self.db.connection().await;
        let total = fetch_count(&conn, "SELECT COUNT(*) FROM categories", vec![]).await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY position, id LIMIT ?1 OFFSET ?2");
        let rows = fetch_all(&conn, &sql, vec![int(params.limit()), int(params.offset())]).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(category_from_row(&conn, row).await?);
        }
        Ok(Page::new(items, total))
    }

    async fn update_category(&self, id: i64, input: CategoryUpdate) -> Result<Category> {
        let tx = self.db.begin().await?;
        let result = async {
            let current = load_category(&tx, id).await?;
            if let Some(translations) = &input.translations {
                CATEGORY_TRANSLATIONS.ensure_titles_free(&tx, translations, Some(id)).await?;
                CATEGORY_TRANSLATIONS.replace(&tx, id, translations).await?;
            }
            tx.execute(
                "UPDATE categories SET position = ?2, updated_at = ?3 WHERE id = ?1",
                vec![int(id), int(input.position.unwrap_or(current.position)), now()],
            )
            .await?;
            load_category(&tx, id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn delete_category(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        ensure_category_exists(&conn, id).await?;

        let children = fetch_count(
            &conn,
            "SELECT COUNT(*) FROM subcategories WHERE category_id = ?1",
            vec![int(id)],
        )
        .await?;
        if children > 0 {
            return Err(ShopError::Forbidden(format!(
                "category {id} still has {children} subcategories"
            )));
        }

        conn.execute("DELETE FROM categories WHERE id = ?1", vec![int(id)]).await?;
        info!("Deleted category {}", id);
        Ok(())
    }

    async fn create_subcategory(&self, input: NewSubcategory) -> Result<Subcategory> {
        let tx = self.db.begin().await?;
        let result = async {
            ensure_category_exists(&tx, input.category_id).await?;
            SUBCATEGORY_TRANSLATIONS.ensure_titles_free(&tx, &input.translations, None).await?;
            let id = insert_returning_id(
                &tx,
                "INSERT INTO subcategories (category_id, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3) RETURNING id",
                vec![int(input.category_id), int(input.position), now()],
            )
            .await?;
            SUBCATEGORY_TRANSLATIONS.replace(&tx, id, &input.translations).await?;
            load_subcategory(&tx, id).await
        }
        .await;
        let subcategory = tx.finish(result).await?;

        info!("Created subcategory {} in category {}", subcategory.id, subcategory.category_id);
        Ok(subcategory)
    }

    async fn get_subcategory(&self, id: i64) -> Result<Subcategory> {
        let conn = self.db.connection().await;
        load_subcategory(&conn, id).await
    }

    async fn list_subcategories(&self, filter: SubcategoryFilter, params: ListParams) -> Result<Page<Subcategory>> {
        let conn = self.db.connection().await;
        let mut w = Where::new();
        if let Some(category_id) = filter.category_id {
            w.and("category_id = ?", int(category_id));
        }

        let total = fetch_count(&conn, &format!("SELECT COUNT(*) FROM subcategories{}", w.sql()), w.params()).await?;
        let (values, n) = paged(w.params(), &params);
        let sql = format!(
            "SELECT {SUBCATEGORY_COLUMNS} FROM subcategories{} ORDER BY position, id LIMIT ?{n} OFFSET ?{}",
            w.sql(),
            n + 1
        );
        let rows = fetch_all(&conn, &sql, values).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(subcategory_from_row(&conn, row).await?);
        }
        Ok(Page::new(items, total))
    }

    async fn update_subcategory(&self, id: i64, input: SubcategoryUpdate) -> Result<Subcategory> {
        let tx = self.db.begin().await?;
        let result = async {
            let current = load_subcategory(&tx, id).await?;
            if let Some(category_id) = input.category_id {
                ensure_category_exists(&tx, category_id).await?;
            }
            if let Some(translations) = &input.translations {
                SUBCATEGORY_TRANSLATIONS.ensure_titles_free(&tx, translations, Some(id)).await?;
                SUBCATEGORY_TRANSLATIONS.replace(&tx, id, translations).await?;
            }
            tx.execute(
                "UPDATE subcategories SET category_id = ?2, position = ?3, updated_at = ?4 WHERE id = ?1",
                vec![
                    int(id),
                    int(input.category_id.unwrap_or(current.category_id)),
                    int(input.position.unwrap_or(current.position)),
                    now(),
                ],
            )
            .await?;
            load_subcategory(&tx, id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn delete_subcategory(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        ensure_subcategory_exists(&conn, id).await?;
        // products.subcategory_id is ON DELETE SET NULL
        conn.execute("DELETE FROM subcategories WHERE id = ?1", vec![int(id)]).await?;
        info!("Deleted subcategory {}", id);
        Ok(())
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let tx = self.db.begin().await?;
        let result = async {
            if let Some(subcategory_id) = input.subcategory_id {
                ensure_subcategory_exists(&tx, subcategory_id).await?;
            }
            ensure_product_codes_free(&tx, Some(&input.article), input.barcode.as_deref(), None).await?;

            let id = insert_returning_id(
                &tx,
                "INSERT INTO products (subcategory_id, article, barcode, price, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) RETURNING id",
                vec![
                    opt_int(input.subcategory_id),
                    text(input.article.as_str()),
                    opt_text(input.barcode.clone()),
                    dec(input.price),
                    int(input.is_active as i64),
                    now(),
                ],
            )
            .await
            .map_err(|e| unique_as_conflict(e, "product article or barcode already exists"))?;
            PRODUCT_TRANSLATIONS.replace(&tx, id, &input.translations).await?;
            load_product(&tx, id).await
        }
        .await;
        let product = tx.finish(result).await?;

        info!("Created product {} ({})", product.id, product.article);
        Ok(product)
    }

    async fn get_product(&self, id: i64) -> Result<Product> {
        let conn = self.db.connection().await;
        load_product(&conn, id).await
    }

    async fn list_products(&self, filter: ProductFilter, params: ListParams) -> Result<Page<Product>> {
        let conn = self.db.connection().await;
        let mut w = Where::new().raw("p.deleted_at IS NULL");
        if filter.active_only {
            w = w.raw("p.is_active = 1");
        }
        if let Some(subcategory_id) = filter.subcategory_id {
            w.and("p.subcategory_id = ?", int(subcategory_id));
        }
        if let Some(category_id) = filter.category_id {
            w.and(
                "p.subcategory_id IN (SELECT id FROM subcategories WHERE category_id = ?)",
                int(category_id),
            );
        }
        if let Some(lang) = filter.lang.as_deref() {
            w.and("t.lang = ?", text(lang));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = text(search_key(search));
            if filter.lang.is_some() {
                w.and("instr(t.title_search, ?) > 0", needle);
            } else {
                w.and(
                    "p.id IN (SELECT product_id FROM product_translations WHERE instr(title_search, ?) > 0)",
                    needle,
                );
            }
        }

        // The translation join only narrows rows when a language is requested.
        let from = if filter.lang.is_some() {
            "products p JOIN product_translations t ON t.product_id = p.id"
        } else {
            "products p"
        };

        let total = fetch_count(&conn, &format!("SELECT COUNT(*) FROM {from}{}", w.sql()), w.params()).await?;
        let (values, n) = paged(w.params(), &params);
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {from}{} ORDER BY p.id DESC LIMIT ?{n} OFFSET ?{}",
            w.sql(),
            n + 1
        );
        let rows = fetch_all(&conn, &sql, values).await?;
        debug!("Product listing matched {} of {} rows", rows.len(), total);

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(product_from_row(&conn, row).await?);
        }
        Ok(Page::new(items, total))
    }

    async fn update_product(&self, id: i64, input: ProductUpdate) -> Result<Product> {
        let tx = self.db.begin().await?;
        let result = async {
            let current = load_product(&tx, id).await?;

            let subcategory_id = match input.subcategory_id {
                Some(Some(subcategory_id)) => {
                    ensure_subcategory_exists(&tx, subcategory_id).await?;
                    Some(subcategory_id)
                }
                Some(None) => None,
                None => current.subcategory_id,
            };
            let barcode = match input.barcode {
                Some(barcode) => barcode,
                None => current.barcode.clone(),
            };
            let article = input.article.unwrap_or_else(|| current.article.clone());

            ensure_product_codes_free(&tx, Some(&article), barcode.as_deref(), Some(id)).await?;

            tx.execute(
                "UPDATE products SET subcategory_id = ?2, article = ?3, barcode = ?4, price = ?5,
                 is_active = ?6, updated_at = ?7 WHERE id = ?1",
                vec![
                    int(id),
                    opt_int(subcategory_id),
                    text(article),
                    opt_text(barcode),
                    dec(input.price.unwrap_or(current.price)),
                    int(input.is_active.unwrap_or(current.is_active) as i64),
                    now(),
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, "product article or barcode already exists"))?;

            if let Some(translations) = &input.translations {
                PRODUCT_TRANSLATIONS.replace(&tx, id, translations).await?;
            }
            load_product(&tx, id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let tx = self.db.begin().await?;
        let result = async {
            let affected = tx
                .execute(
                    "UPDATE products SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
                    vec![int(id), now()],
                )
                .await?;
            if affected == 0 {
                return Err(ShopError::not_found("Product", id));
            }
            // Soft-deleted products cannot be bought or favored any more.
            tx.execute("DELETE FROM basket_items WHERE product_id = ?1", vec![int(id)]).await?;
            tx.execute("DELETE FROM favorites WHERE product_id = ?1", vec![int(id)]).await?;
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        info!("Soft-deleted product {}", id);
        Ok(())
    }

    async fn attach_product_media(&self, product_id: i64, media_id: i64) -> Result<Product> {
        let tx = self.db.begin().await?;
        let result = async {
            load_product(&tx, product_id).await?;
            ensure_media_exists(&tx, media_id).await?;
            let position = fetch_count(
                &tx,
                "SELECT COUNT(*) FROM product_media WHERE product_id = ?1",
                vec![int(product_id)],
            )
            .await?;
            tx.execute(
                "INSERT INTO product_media (product_id, media_id, position) VALUES (?1, ?2, ?3)",
                vec![int(product_id), int(media_id), int(position)],
            )
            .await
            .map_err(|e| conflict_on_unique(e, format!("media {media_id} is already attached to product {product_id}")))?;
            load_product(&tx, product_id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn detach_product_media(&self, product_id: i64, media_id: i64) -> Result<Product> {
        let tx = self.db.begin().await?;
        let result = async {
            load_product(&tx, product_id).await?;
            let affected = tx
                .execute(
                    "DELETE FROM product_media WHERE product_id = ?1 AND media_id = ?2",
                    vec![int(product_id), int(media_id)],
                )
                .await?;
            if affected == 0 {
                return Err(ShopError::NotFound(format!(
                    "media {media_id} is not attached to product {product_id}"
                )));
            }
            load_product(&tx, product_id).await
        }
        .await;
        tx.finish(result).await
    }
}
