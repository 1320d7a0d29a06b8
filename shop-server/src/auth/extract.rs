//! Request guards: bearer token to account, plus the admin ability check.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use shop_core::ability::Act;
use shop_core::storage::{AccessStore, AccountStore};
use shop_core::{AccountKind, AdminUser, Ability, ShopError, User};
use tracing::debug;

use super::{account_gone, Claims};
use crate::error::ApiError;
use crate::state::AppState;

fn bearer_claims(parts: &Parts, state: &AppState, kind: AccountKind) -> Result<Claims, ApiError> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ShopError::Unauthorized("missing authorization token".to_string()))?;

    let claims = state.jwt.verify(token)?;
    if claims.kind != kind {
        return Err(ShopError::Unauthorized(format!("{} token required", kind.as_str())).into());
    }
    Ok(claims)
}

/// Authenticated customer.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state, AccountKind::User)?;
        let user = state.storage.get_user(claims.sub).await.map_err(account_gone)?;
        Ok(CurrentUser(user))
    }
}

/// Authenticated admin together with their permissions.
pub struct CurrentAdmin {
    pub admin: AdminUser,
    pub ability: Ability,
}

impl CurrentAdmin {
    /// Forbidden unless the admin may perform `action` on `subject`.
    pub fn require(&self, action: Act, subject: &str) -> Result<(), ApiError> {
        self.ability.ensure(action, subject).map_err(|e| {
            debug!(admin_id = self.admin.id, subject, action = action.as_str(), "Permission denied");
            ApiError(e)
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state, AccountKind::Admin)?;
        let admin = state.storage.get_admin(claims.sub).await.map_err(account_gone)?;
        let ability = state.storage.ability_for(admin.id).await?;
        Ok(CurrentAdmin { admin, ability })
    }
}
