//! Categories, subcategories and products. Reads are public.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use shop_core::ability::{subjects, Act};
use shop_core::storage::CatalogStore;
use shop_core::{
    Category, CategoryUpdate, ListParams, NewCategory, NewProduct, NewSubcategory, Page, Product, ProductFilter,
    ProductUpdate, Subcategory, SubcategoryFilter, SubcategoryUpdate,
};
use tracing::info;
use validator::Validate;

use crate::auth::CurrentAdmin;
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
        .route("/subcategories", get(list_subcategories).post(create_subcategory))
        .route(
            "/subcategories/:id",
            get(get_subcategory).patch(update_subcategory).delete(delete_subcategory),
        )
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/:id/media", post(attach_media))
        .route("/products/:id/media/:media_id", delete(detach_media))
}

async fn list_categories(
    State(state): State<AppState>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Category>>> {
    Ok(Json(state.storage.list_categories(params).await?))
}

async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Category>> {
    Ok(Json(state.storage.get_category(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    admin.require(Act::Create, subjects::CATEGORY)?;
    let category = state.storage.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<CategoryUpdate>,
) -> ApiResult<Json<Category>> {
    admin.require(Act::Update, subjects::CATEGORY)?;
    Ok(Json(state.storage.update_category(id, input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::CATEGORY)?;
    state.storage.delete_category(id).await?;
    info!(admin_id = admin.admin.id, category_id = id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subcategories(
    State(state): State<AppState>,
    Params(filter): Params<SubcategoryFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Subcategory>>> {
    Ok(Json(state.storage.list_subcategories(filter, params).await?))
}

async fn get_subcategory(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Subcategory>> {
    Ok(Json(state.storage.get_subcategory(id).await?))
}

async fn create_subcategory(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewSubcategory>,
) -> ApiResult<(StatusCode, Json<Subcategory>)> {
    admin.require(Act::Create, subjects::SUBCATEGORY)?;
    let subcategory = state.storage.create_subcategory(input).await?;
    Ok((StatusCode::CREATED, Json(subcategory)))
}

async fn update_subcategory(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<SubcategoryUpdate>,
) -> ApiResult<Json<Subcategory>> {
    admin.require(Act::Update, subjects::SUBCATEGORY)?;
    Ok(Json(state.storage.update_subcategory(id, input).await?))
}

async fn delete_subcategory(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::SUBCATEGORY)?;
    state.storage.delete_subcategory(id).await?;
    info!(admin_id = admin.admin.id, subcategory_id = id, "Subcategory deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_products(
    State(state): State<AppState>,
    Params(filter): Params<ProductFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(state.storage.list_products(filter, params).await?))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Product>> {
    Ok(Json(state.storage.get_product(id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    admin.require(Act::Create, subjects::PRODUCT)?;
    let product = state.storage.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    admin.require(Act::Update, subjects::PRODUCT)?;
    Ok(Json(state.storage.update_product(id, input).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::PRODUCT)?;
    state.storage.delete_product(id).await?;
    info!(admin_id = admin.admin.id, product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct MediaLink {
    media_id: i64,
}

async fn attach_media(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(link): Valid<MediaLink>,
) -> ApiResult<Json<Product>> {
    admin.require(Act::Update, subjects::PRODUCT)?;
    Ok(Json(state.storage.attach_product_media(id, link.media_id).await?))
}

async fn detach_media(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path((id, media_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Product>> {
    admin.require(Act::Update, subjects::PRODUCT)?;
    Ok(Json(state.storage.detach_product_media(id, media_id).await?))
}
