//! Admin accounts, permission subjects/actions and grants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use shop_core::ability::{subjects, Act};
use shop_core::storage::AccessStore;
use shop_core::{
    Action, AdminUser, AdminUserUpdate, ListParams, NamedUpdate, NewAdminUser, NewNamed, Page, Permission,
    PermissionGrant, ShopError, Subject,
};
use tracing::info;

use crate::auth::CurrentAdmin;
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_admins).post(create_admin))
        .route(
            "/admin/users/:id",
            get(get_admin).patch(update_admin).delete(delete_admin),
        )
        .route(
            "/admin/users/:id/permissions",
            get(list_permissions).post(grant_permission),
        )
        .route(
            "/admin/users/:id/permissions/:subject/:action",
            delete(revoke_permission),
        )
        .route("/admin/subjects", get(list_subjects).post(create_subject))
        .route(
            "/admin/subjects/:id",
            get(get_subject).patch(update_subject).delete(delete_subject),
        )
        .route("/admin/actions", get(list_actions).post(create_action))
        .route(
            "/admin/actions/:id",
            get(get_action).patch(update_action).delete(delete_action),
        )
}

/// Super admins can only be changed by another super admin.
async fn guard_target(state: &AppState, admin: &CurrentAdmin, target_id: i64) -> ApiResult<AdminUser> {
    let target = state.storage.get_admin(target_id).await?;
    if target.is_super && !admin.admin.is_super {
        return Err(ShopError::Forbidden("only a super admin may change a super admin".to_string()).into());
    }
    Ok(target)
}

async fn list_admins(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<AdminUser>>> {
    admin.require(Act::Read, subjects::ADMIN_USER)?;
    Ok(Json(state.storage.list_admins(params).await?))
}

async fn get_admin(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminUser>> {
    admin.require(Act::Read, subjects::ADMIN_USER)?;
    Ok(Json(state.storage.get_admin(id).await?))
}

async fn create_admin(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewAdminUser>,
) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    admin.require(Act::Create, subjects::ADMIN_USER)?;
    if input.is_super && !admin.admin.is_super {
        return Err(ShopError::Forbidden("only a super admin may create another".to_string()).into());
    }
    let created = state.storage.create_admin(input).await?;
    info!(admin_id = admin.admin.id, created_id = created.id, "Admin user created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_admin(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<AdminUserUpdate>,
) -> ApiResult<Json<AdminUser>> {
    admin.require(Act::Update, subjects::ADMIN_USER)?;
    if input.is_super.is_some() && !admin.admin.is_super {
        return Err(ShopError::Forbidden("only a super admin may change super status".to_string()).into());
    }
    guard_target(&state, &admin, id).await?;
    Ok(Json(state.storage.update_admin(id, input).await?))
}

async fn delete_admin(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::ADMIN_USER)?;
    if id == admin.admin.id {
        return Err(ShopError::BadRequest("an admin cannot delete themselves".to_string()).into());
    }
    guard_target(&state, &admin, id).await?;
    state.storage.delete_admin(id).await?;
    info!(admin_id = admin.admin.id, deleted_id = id, "Admin user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_permissions(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Permission>>> {
    admin.require(Act::Read, subjects::ADMIN_USER)?;
    state.storage.get_admin(id).await?;
    Ok(Json(state.storage.list_permissions(id).await?))
}

async fn grant_permission(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(grant): Valid<PermissionGrant>,
) -> ApiResult<(StatusCode, Json<Permission>)> {
    admin.require(Act::Update, subjects::ADMIN_USER)?;
    guard_target(&state, &admin, id).await?;
    admin.ability.ensure_grantable(&grant.subject, &grant.action)?;
    let permission = state.storage.grant_permission(id, grant).await?;
    info!(
        admin_id = admin.admin.id,
        target_id = id,
        subject = %permission.subject,
        action = %permission.action,
        "Permission granted"
    );
    Ok((StatusCode::CREATED, Json(permission)))
}

async fn revoke_permission(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path((id, subject, action)): Path<(i64, String, String)>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Update, subjects::ADMIN_USER)?;
    guard_target(&state, &admin, id).await?;
    state.storage.revoke_permission(id, &subject, &action).await?;
    info!(admin_id = admin.admin.id, target_id = id, %subject, %action, "Permission revoked");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subjects(State(state): State<AppState>, admin: CurrentAdmin) -> ApiResult<Json<Vec<Subject>>> {
    admin.require(Act::Read, subjects::SUBJECT)?;
    Ok(Json(state.storage.list_subjects().await?))
}

async fn get_subject(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Subject>> {
    admin.require(Act::Read, subjects::SUBJECT)?;
    Ok(Json(state.storage.get_subject(id).await?))
}

async fn create_subject(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewNamed>,
) -> ApiResult<(StatusCode, Json<Subject>)> {
    admin.require(Act::Create, subjects::SUBJECT)?;
    let subject = state.storage.create_subject(input).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

async fn update_subject(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<NamedUpdate>,
) -> ApiResult<Json<Subject>> {
    admin.require(Act::Update, subjects::SUBJECT)?;
    Ok(Json(state.storage.update_subject(id, input).await?))
}

async fn delete_subject(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::SUBJECT)?;
    state.storage.delete_subject(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_actions(State(state): State<AppState>, admin: CurrentAdmin) -> ApiResult<Json<Vec<Action>>> {
    admin.require(Act::Read, subjects::ACTION)?;
    Ok(Json(state.storage.list_actions().await?))
}

async fn get_action(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Action>> {
    admin.require(Act::Read, subjects::ACTION)?;
    Ok(Json(state.storage.get_action(id).await?))
}

async fn create_action(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewNamed>,
) -> ApiResult<(StatusCode, Json<Action>)> {
    admin.require(Act::Create, subjects::ACTION)?;
    let action = state.storage.create_action(input).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn update_action(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<NamedUpdate>,
) -> ApiResult<Json<Action>> {
    admin.require(Act::Update, subjects::ACTION)?;
    Ok(Json(state.storage.update_action(id, input).await?))
}

async fn delete_action(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::ACTION)?;
    state.storage.delete_action(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
