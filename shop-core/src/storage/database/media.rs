use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::storage::traits::MediaStore;
use async_trait::async_trait;
use tracing::info;

const MEDIA_COLUMNS: &str = "id, file_name, original_name, mime_type, size, created_at, updated_at, deleted_at";

fn media_from_row(row: &Record) -> Result<Media> {
    Ok(Media {
        id: get_i64(row, 0)?,
        file_name: get_string(row, 1)?,
        original_name: get_string(row, 2)?,
        mime_type: get_string(row, 3)?,
        size: get_i64(row, 4)?,
        audit: get_audit(row, 5)?,
    })
}

async fn load_media(conn: &Connection, id: i64) -> Result<Media> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => media_from_row(&row),
        None => Err(ShopError::not_found("Media", id)),
    }
}

#[async_trait]
impl MediaStore for DatabaseStorage {
    async fn create_media(&self, input: NewMedia) -> Result<Media> {
        let conn = self.db.connection().await;
        let id = insert_returning_id(
            &conn,
            "INSERT INTO media (file_name, original_name, mime_type, size, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING id",
            vec![
                text(input.file_name),
                text(input.original_name),
                text(input.mime_type),
                int(input.size),
                now(),
            ],
        )
        .await?;
        let media = load_media(&conn, id).await?;

        info!("Stored media {} as {} ({} bytes)", media.id, media.file_name, media.size);
        Ok(media)
    }

    async fn get_media(&self, id: i64) -> Result<Media> {
        let conn = self.db.connection().await;
        load_media(&conn, id).await
    }

    async fn list_media(&self, params: ListParams) -> Result<Page<Media>> {
        let conn = self.db.connection().await;
        let total = fetch_count(&conn, "SELECT COUNT(*) FROM media", vec![]).await?;
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media ORDER BY id DESC LIMIT ?1 OFFSET ?2");
        let items = fetch_all(&conn, &sql, vec![int(params.limit()), int(params.offset())])
            .await?
            .iter()
            .map(media_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn delete_media(&self, id: i64) -> Result<Media> {
        let conn = self.db.connection().await;
        let media = load_media(&conn, id).await?;
        // product_media links cascade
        conn.execute("DELETE FROM media WHERE id = ?1", vec![int(id)]).await?;
        info!("Deleted media {}", id);
        Ok(media)
    }
}
