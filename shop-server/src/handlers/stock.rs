//! Arrivals, realizations and discounts. Admin only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shop_core::ability::{subjects, Act};
use shop_core::storage::StockStore;
use shop_core::{
    Arrival, ArrivalUpdate, Discount, DiscountUpdate, ListParams, NewArrival, NewDiscount, NewRealization, Page,
    Realization, StockFilter,
};
use tracing::info;

use crate::auth::CurrentAdmin;
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::observability::metrics;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/arrivals", get(list_arrivals).post(create_arrival))
        .route(
            "/arrivals/:id",
            get(get_arrival).patch(update_arrival).delete(delete_arrival),
        )
        .route("/realizations", get(list_realizations).post(create_realization))
        .route("/realizations/:id", get(get_realization).delete(delete_realization))
        .route("/discounts", get(list_discounts).post(create_discount))
        .route(
            "/discounts/:id",
            get(get_discount).patch(update_discount).delete(delete_discount),
        )
}

async fn list_arrivals(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(filter): Params<StockFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Arrival>>> {
    admin.require(Act::Read, subjects::ARRIVAL)?;
    Ok(Json(state.storage.list_arrivals(filter, params).await?))
}

async fn get_arrival(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Arrival>> {
    admin.require(Act::Read, subjects::ARRIVAL)?;
    Ok(Json(state.storage.get_arrival(id).await?))
}

async fn create_arrival(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewArrival>,
) -> ApiResult<(StatusCode, Json<Arrival>)> {
    admin.require(Act::Create, subjects::ARRIVAL)?;
    let arrival = state.storage.create_arrival(input).await?;
    metrics::record_stock_movement("arrival");
    info!(
        admin_id = admin.admin.id,
        arrival_id = arrival.id,
        product_id = arrival.product_id,
        quantity = arrival.quantity,
        "Arrival recorded"
    );
    Ok((StatusCode::CREATED, Json(arrival)))
}

async fn update_arrival(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<ArrivalUpdate>,
) -> ApiResult<Json<Arrival>> {
    admin.require(Act::Update, subjects::ARRIVAL)?;
    Ok(Json(state.storage.update_arrival(id, input).await?))
}

async fn delete_arrival(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::ARRIVAL)?;
    state.storage.delete_arrival(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_realizations(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(filter): Params<StockFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Realization>>> {
    admin.require(Act::Read, subjects::REALIZATION)?;
    Ok(Json(state.storage.list_realizations(filter, params).await?))
}

async fn get_realization(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Realization>> {
    admin.require(Act::Read, subjects::REALIZATION)?;
    Ok(Json(state.storage.get_realization(id).await?))
}

async fn create_realization(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewRealization>,
) -> ApiResult<(StatusCode, Json<Realization>)> {
    admin.require(Act::Create, subjects::REALIZATION)?;
    let realization = state.storage.create_realization(input).await?;
    metrics::record_stock_movement("realization");
    info!(
        admin_id = admin.admin.id,
        realization_id = realization.id,
        product_id = realization.product_id,
        quantity = realization.quantity,
        "Realization recorded"
    );
    Ok((StatusCode::CREATED, Json(realization)))
}

async fn delete_realization(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::REALIZATION)?;
    state.storage.delete_realization(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_discounts(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(filter): Params<StockFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Discount>>> {
    admin.require(Act::Read, subjects::DISCOUNT)?;
    Ok(Json(state.storage.list_discounts(filter, params).await?))
}

async fn get_discount(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Discount>> {
    admin.require(Act::Read, subjects::DISCOUNT)?;
    Ok(Json(state.storage.get_discount(id).await?))
}

async fn create_discount(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewDiscount>,
) -> ApiResult<(StatusCode, Json<Discount>)> {
    admin.require(Act::Create, subjects::DISCOUNT)?;
    let discount = state.storage.create_discount(input).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

async fn update_discount(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<DiscountUpdate>,
) -> ApiResult<Json<Discount>> {
    admin.require(Act::Update, subjects::DISCOUNT)?;
    Ok(Json(state.storage.update_discount(id, input).await?))
}

async fn delete_discount(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::DISCOUNT)?;
    state.storage.delete_discount(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
