use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::storage::traits::ReviewStore;
use async_trait::async_trait;
use tracing::info;

const REVIEW_COLUMNS: &str = "id, user_id, product_id, rating, text, created_at, updated_at, deleted_at";

fn review_from_row(row: &Record) -> Result<Review> {
    Ok(Review {
        id: get_i64(row, 0)?,
        user_id: get_i64(row, 1)?,
        product_id: get_i64(row, 2)?,
        rating: get_i64(row, 3)?,
        text: get_opt_string(row, 4)?,
        audit: get_audit(row, 5)?,
    })
}

async fn load_review(conn: &Connection, id: i64) -> Result<Review> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => review_from_row(&row),
        None => Err(ShopError::not_found("Review", id)),
    }
}

#[async_trait]
impl ReviewStore for DatabaseStorage {
    async fn create_review(&self, user_id: i64, input: NewReview) -> Result<Review> {
        let conn = self.db.connection().await;
        load_product(&conn, input.product_id).await?;

        let id = insert_returning_id(
            &conn,
            "INSERT INTO reviews (user_id, product_id, rating, text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING id",
            vec![
                int(user_id),
                int(input.product_id),
                int(input.rating),
                opt_text(input.text),
                now(),
            ],
        )
        .await
        .map_err(|e| {
            unique_as_conflict(
                e,
                format!("user {user_id} already reviewed product {}", input.product_id),
            )
        })?;
        let review = load_review(&conn, id).await?;

        info!("User {} reviewed product {} ({}/5)", user_id, review.product_id, review.rating);
        Ok(review)
    }

    async fn get_review(&self, id: i64) -> Result<Review> {
        let conn = self.db.connection().await;
        load_review(&conn, id).await
    }

    async fn list_reviews(&self, filter: ReviewFilter, params: ListParams) -> Result<Page<Review>> {
        let conn = self.db.connection().await;
        let mut w = Where::new();
        if let Some(product_id) = filter.product_id {
            w.and("product_id = ?", int(product_id));
        }
        if let Some(user_id) = filter.user_id {
            w.and("user_id = ?", int(user_id));
        }

        let total = fetch_count(&conn, &format!("SELECT COUNT(*) FROM reviews{}", w.sql()), w.params()).await?;
        let (values, n) = paged(w.params(), &params);
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews{} ORDER BY id DESC LIMIT ?{n} OFFSET ?{}",
            w.sql(),
            n + 1
        );
        let items = fetch_all(&conn, &sql, values)
            .await?
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn update_review(&self, id: i64, input: ReviewUpdate) -> Result<Review> {
        let conn = self.db.connection().await;
        let current = load_review(&conn, id).await?;
        conn.execute(
            "UPDATE reviews SET rating = ?2, text = ?3, updated_at = ?4 WHERE id = ?1",
            vec![
                int(id),
                int(input.rating.unwrap_or(current.rating)),
                opt_text(input.text.or(current.text)),
                now(),
            ],
        )
        .await?;
        load_review(&conn, id).await
    }

    async fn delete_review(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn.execute("DELETE FROM reviews WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Review", id));
        }
        info!("Deleted review {}", id);
        Ok(())
    }
}
