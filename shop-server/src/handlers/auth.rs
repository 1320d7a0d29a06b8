//! Login, registration and refresh-token rotation for both account kinds.
//!
//! Customers use `/auth/*`, admins `/admin/auth/*`. Each kind gets its own
//! cookie path so the two sessions never overwrite each other.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use shop_core::security::token_digest;
use shop_core::storage::{AccessStore, AccountStore};
use shop_core::{AccountKind, Credentials, NewUser, ShopError};
use tracing::info;
use uuid::Uuid;

use crate::auth::cookie::{clear_refresh_cookie, read_refresh_token, refresh_cookie};
use crate::auth::{account_gone, CurrentAdmin, CurrentUser};
use crate::error::ApiResult;
use crate::extract::Valid;
use crate::state::AppState;

const USER_COOKIE_PATH: &str = "/auth";
const ADMIN_COOKIE_PATH: &str = "/admin/auth";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/admin/auth/login", post(admin_login))
        .route("/admin/auth/refresh", post(admin_refresh))
        .route("/admin/auth/logout", post(admin_logout))
        .route("/admin/me", get(admin_me))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse<T: Serialize> {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    account: T,
}

fn cookie_path(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::User => USER_COOKIE_PATH,
        AccountKind::Admin => ADMIN_COOKIE_PATH,
    }
}

/// Issue an access token plus a new refresh session, answered with the
/// refresh cookie set.
async fn sign_in<T: Serialize>(
    state: &AppState,
    kind: AccountKind,
    account_id: i64,
    account: T,
    status: StatusCode,
) -> ApiResult<impl IntoResponse> {
    let access_token = state.jwt.issue(kind, account_id)?;
    let refresh_token = Uuid::new_v4().to_string();
    let ttl = state.config.auth.refresh_ttl_secs;
    state
        .storage
        .create_session(kind, account_id, &token_digest(&refresh_token), Utc::now() + Duration::seconds(ttl))
        .await?;

    let cookie = refresh_cookie(&refresh_token, cookie_path(kind), ttl, state.config.auth.cookie_secure);
    let body = TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.expire_secs(),
        account,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)))
}

/// Consume the refresh cookie and return the account it belongs to.
/// The presented token is revoked whatever happens next.
async fn rotate(state: &AppState, headers: &HeaderMap, kind: AccountKind) -> ApiResult<i64> {
    let token = read_refresh_token(headers)
        .ok_or_else(|| ShopError::Unauthorized("missing refresh token".to_string()))?;
    let session = state
        .storage
        .find_session(&token_digest(&token))
        .await?
        .filter(|session| session.kind == kind)
        .ok_or_else(|| ShopError::Unauthorized("unknown refresh token".to_string()))?;

    // The revoke only succeeds for one caller, so a token cannot be spent twice.
    if !session.is_usable_at(Utc::now()) || !state.storage.revoke_session(&session.id).await? {
        return Err(ShopError::Unauthorized("refresh token expired or revoked".to_string()).into());
    }
    Ok(session.owner_id)
}

async fn sign_out(state: &AppState, headers: &HeaderMap, kind: AccountKind) -> ApiResult<impl IntoResponse> {
    if let Some(token) = read_refresh_token(headers) {
        if let Some(session) = state.storage.find_session(&token_digest(&token)).await? {
            state.storage.revoke_session(&session.id).await?;
        }
    }
    let cookie = clear_refresh_cookie(cookie_path(kind), state.config.auth.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

async fn register(State(state): State<AppState>, Valid(input): Valid<NewUser>) -> ApiResult<impl IntoResponse> {
    let user = state.storage.create_user(input).await?;
    let id = user.id;
    sign_in(&state, AccountKind::User, id, user, StatusCode::CREATED).await
}

/// Customers log in with their phone number as `login`.
async fn login(State(state): State<AppState>, Valid(input): Valid<Credentials>) -> ApiResult<impl IntoResponse> {
    let user = state.storage.verify_user_credentials(&input.login, &input.password).await?;
    info!(user_id = user.id, "User logged in");
    let id = user.id;
    sign_in(&state, AccountKind::User, id, user, StatusCode::OK).await
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let user_id = rotate(&state, &headers, AccountKind::User).await?;
    let user = state.storage.get_user(user_id).await.map_err(account_gone)?;
    sign_in(&state, AccountKind::User, user_id, user, StatusCode::OK).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    sign_out(&state, &headers, AccountKind::User).await
}

async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

async fn admin_login(
    State(state): State<AppState>,
    Valid(input): Valid<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let admin = state.storage.verify_admin_credentials(&input.login, &input.password).await?;
    info!(admin_id = admin.id, "Admin logged in");
    let id = admin.id;
    sign_in(&state, AccountKind::Admin, id, admin, StatusCode::OK).await
}

async fn admin_refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let admin_id = rotate(&state, &headers, AccountKind::Admin).await?;
    let admin = state.storage.get_admin(admin_id).await.map_err(account_gone)?;
    sign_in(&state, AccountKind::Admin, admin_id, admin, StatusCode::OK).await
}

async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    sign_out(&state, &headers, AccountKind::Admin).await
}

async fn admin_me(current: CurrentAdmin) -> impl IntoResponse {
    Json(json!({
        "admin": current.admin,
        "ability": current.ability,
    }))
}
