//! Customer-facing basket, favorites and orders, plus the admin order desk.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use shop_core::ability::{subjects, Act};
use shop_core::storage::SalesStore;
use shop_core::{
    Basket, BasketItemUpdate, FavoriteList, ListParams, NewBasketItem, NewOrder, Order, OrderFilter, OrderStatus,
    OrderStatusUpdate, Page, ShopError,
};
use tracing::info;
use validator::Validate;

use crate::auth::{CurrentAdmin, CurrentUser};
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::observability::metrics;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/basket", get(get_basket).delete(clear_basket))
        .route("/basket/items", post(add_basket_item))
        .route(
            "/basket/items/:id",
            patch(update_basket_item).delete(remove_basket_item),
        )
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:product_id", delete(remove_favorite))
        .route("/orders", get(list_my_orders).post(create_order))
        .route("/orders/:id", get(get_my_order))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", get(get_order).delete(delete_order))
        .route("/admin/orders/:id/status", patch(update_order_status))
}

async fn get_basket(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Basket>> {
    Ok(Json(state.storage.get_basket(user.id).await?))
}

async fn add_basket_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(input): Valid<NewBasketItem>,
) -> ApiResult<Json<Basket>> {
    Ok(Json(state.storage.add_to_basket(user.id, input).await?))
}

async fn update_basket_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<i64>,
    Valid(input): Valid<BasketItemUpdate>,
) -> ApiResult<Json<Basket>> {
    Ok(Json(state.storage.update_basket_item(user.id, item_id, input).await?))
}

async fn remove_basket_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<i64>,
) -> ApiResult<Json<Basket>> {
    Ok(Json(state.storage.remove_basket_item(user.id, item_id).await?))
}

async fn clear_basket(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<StatusCode> {
    state.storage.clear_basket(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct FavoriteInput {
    product_id: i64,
}

async fn list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<FavoriteList>> {
    Ok(Json(state.storage.list_favorites(user.id).await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(input): Valid<FavoriteInput>,
) -> ApiResult<(StatusCode, Json<FavoriteList>)> {
    let favorites = state.storage.add_favorite(user.id, input.product_id).await?;
    Ok((StatusCode::CREATED, Json(favorites)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<FavoriteList>> {
    Ok(Json(state.storage.remove_favorite(user.id, product_id).await?))
}

async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(input): Valid<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.storage.create_order(user.id, input).await?;
    metrics::record_order_created();
    metrics::record_stock_movement("order");
    info!(
        user_id = user.id,
        order_id = order.id,
        total = %order.total,
        lines = order.products.len(),
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<OrderStatus>,
}

async fn list_my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Params(query): Params<StatusQuery>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Order>>> {
    let filter = OrderFilter {
        user_id: Some(user.id),
        status: query.status,
    };
    Ok(Json(state.storage.list_orders(filter, params).await?))
}

/// Another customer's order reads as missing.
async fn get_my_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Order>> {
    let order = state.storage.get_order(id).await?;
    if order.user_id != Some(user.id) {
        return Err(ShopError::not_found("Order", id).into());
    }
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(filter): Params<OrderFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Order>>> {
    admin.require(Act::Read, subjects::ORDER)?;
    Ok(Json(state.storage.list_orders(filter, params).await?))
}

async fn get_order(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Order>> {
    admin.require(Act::Read, subjects::ORDER)?;
    Ok(Json(state.storage.get_order(id).await?))
}

async fn update_order_status(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<OrderStatusUpdate>,
) -> ApiResult<Json<Order>> {
    admin.require(Act::Update, subjects::ORDER)?;
    let order = state.storage.update_order_status(id, input.status).await?;
    if order.status == OrderStatus::Cancelled {
        metrics::record_stock_movement("restock");
    }
    info!(admin_id = admin.admin.id, order_id = id, status = %order.status, "Order status changed");
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::ORDER)?;
    let order = state.storage.get_order(id).await?;
    state.storage.delete_order(id).await?;
    if order.status != OrderStatus::Cancelled {
        metrics::record_stock_movement("restock");
    }
    info!(admin_id = admin.admin.id, order_id = id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
