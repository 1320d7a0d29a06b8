//! Image upload, download and removal.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shop_core::ability::{subjects, Act};
use shop_core::domain::media::{extension_for, ALLOWED_IMAGE_TYPES};
use shop_core::storage::MediaStore;
use shop_core::{ListParams, Media, NewMedia, Page, ShopError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentAdmin;
use crate::error::ApiResult;
use crate::extract::Params;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/media",
            get(list_media)
                .post(upload_media)
                .layer(DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/media/:id", get(download_media).delete(delete_media))
}

struct Upload {
    original_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ShopError> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        ShopError::BadRequest(format!("invalid multipart body: {e}"))
    };
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad)?.to_vec();
        return Ok(Upload {
            original_name,
            mime_type,
            bytes,
        });
    }
    Err(ShopError::BadRequest("multipart field 'file' is required".to_string()))
}

async fn upload_media(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Media>)> {
    admin.require(Act::Create, subjects::MEDIA)?;
    let upload = read_upload(multipart).await?;

    if !ALLOWED_IMAGE_TYPES.contains(&upload.mime_type.as_str()) {
        return Err(ShopError::BadRequest(format!(
            "unsupported media type '{}', expected one of {}",
            upload.mime_type,
            ALLOWED_IMAGE_TYPES.join(", ")
        ))
        .into());
    }
    let max_bytes = state.config.media.max_bytes;
    if upload.bytes.is_empty() || upload.bytes.len() > max_bytes {
        return Err(ShopError::BadRequest(format!("file must be between 1 and {max_bytes} bytes")).into());
    }

    let extension = extension_for(&upload.mime_type).unwrap_or("bin");
    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    state.blobs.put(&file_name, &upload.bytes).await?;

    let created = state
        .storage
        .create_media(NewMedia {
            file_name: file_name.clone(),
            original_name: upload.original_name,
            mime_type: upload.mime_type,
            size: upload.bytes.len() as i64,
        })
        .await;
    let media = match created {
        Ok(media) => media,
        Err(e) => {
            if let Err(cleanup) = state.blobs.delete(&file_name).await {
                warn!("Failed to remove orphaned upload {}: {}", file_name, cleanup);
            }
            return Err(e.into());
        }
    };

    info!(admin_id = admin.admin.id, media_id = media.id, size = media.size, "Media uploaded");
    Ok((StatusCode::CREATED, Json(media)))
}

async fn list_media(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Media>>> {
    admin.require(Act::Read, subjects::MEDIA)?;
    Ok(Json(state.storage.list_media(params).await?))
}

async fn download_media(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Response> {
    let media = state.storage.get_media(id).await?;
    let bytes = state.blobs.get(&media.file_name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, media.mime_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}

async fn delete_media(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::MEDIA)?;
    // Blob first: a missing file is not an error, so a failed row delete can be retried.
    let media = state.storage.get_media(id).await?;
    state.blobs.delete(&media.file_name).await?;
    state.storage.delete_media(id).await?;
    info!(admin_id = admin.admin.id, media_id = id, "Media deleted");
    Ok(StatusCode::NO_CONTENT)
}
