//! Product reviews. Customers edit only their own; admins may remove any.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use shop_core::ability::{subjects, Act};
use shop_core::storage::ReviewStore;
use shop_core::{ListParams, NewReview, Page, Review, ReviewFilter, ReviewUpdate, ShopError, User};
use tracing::info;

use crate::auth::{CurrentAdmin, CurrentUser};
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/:id",
            get(get_review).patch(update_review).delete(delete_own_review),
        )
        .route("/admin/reviews/:id", delete(delete_review))
}

async fn owned_review(state: &AppState, user: &User, id: i64) -> ApiResult<Review> {
    let review = state.storage.get_review(id).await?;
    if review.user_id != user.id {
        return Err(ShopError::Forbidden("only the author may change this review".to_string()).into());
    }
    Ok(review)
}

async fn list_reviews(
    State(state): State<AppState>,
    Params(filter): Params<ReviewFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Review>>> {
    Ok(Json(state.storage.list_reviews(filter, params).await?))
}

async fn get_review(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Review>> {
    Ok(Json(state.storage.get_review(id).await?))
}

async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(input): Valid<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = state.storage.create_review(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn update_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Valid(input): Valid<ReviewUpdate>,
) -> ApiResult<Json<Review>> {
    owned_review(&state, &user, id).await?;
    Ok(Json(state.storage.update_review(id, input).await?))
}

async fn delete_own_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    owned_review(&state, &user, id).await?;
    state.storage.delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_review(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::REVIEW)?;
    state.storage.delete_review(id).await?;
    info!(admin_id = admin.admin.id, review_id = id, "Review removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
