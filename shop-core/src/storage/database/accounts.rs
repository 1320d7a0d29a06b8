use super::rows::*;
use super::*;
use crate::domain::*;
use crate::security::{hash_password, verify_password};
use crate::storage::traits::AccountStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, phone, full_name, password_hash, created_at, updated_at, deleted_at";
const SESSION_COLUMNS: &str = "id, kind, owner_id, token_hash, expires_at, revoked_at";

fn user_from_row(row: &Record) -> Result<User> {
    Ok(User {
        id: get_i64(row, 0)?,
        phone: get_string(row, 1)?,
        full_name: get_string(row, 2)?,
        password_hash: get_string(row, 3)?,
        audit: get_audit(row, 4)?,
    })
}

fn session_from_row(row: &Record) -> Result<RefreshSession> {
    let kind = match get_string(row, 1)?.as_str() {
        "user" => AccountKind::User,
        "admin" => AccountKind::Admin,
        other => {
            return Err(ShopError::Database {
                message: format!("unknown session kind '{other}'"),
            })
        }
    };
    Ok(RefreshSession {
        id: get_string(row, 0)?,
        kind,
        owner_id: get_i64(row, 2)?,
        token_hash: get_string(row, 3)?,
        expires_at: get_ts(row, 4)?,
        revoked_at: get_opt_ts(row, 5)?,
    })
}

pub(crate) async fn load_user(conn: &Connection, id: i64) -> Result<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => user_from_row(&row),
        None => Err(ShopError::not_found("User", id)),
    }
}

#[async_trait]
impl AccountStore for DatabaseStorage {
    async fn create_user(&self, input: NewUser) -> Result<User> {
        let password_hash = hash_password(&input.password)?;
        let conn = self.db.connection().await;

        if exists(&conn, "SELECT 1 FROM users WHERE phone = ?1", vec![text(input.phone.as_str())]).await? {
            return Err(ShopError::Conflict(format!("user with phone {} already exists", input.phone)));
        }

        let id = insert_returning_id(
            &conn,
            "INSERT INTO users (phone, full_name, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING id",
            vec![text(input.phone.as_str()), text(input.full_name), text(password_hash), now()],
        )
        .await
        .map_err(|e| unique_as_conflict(e, format!("user with phone {} already exists", input.phone)))?;
        let user = load_user(&conn, id).await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.db.connection().await;
        load_user(&conn, id).await
    }

    async fn verify_user_credentials(&self, phone: &str, password: &str) -> Result<User> {
        let row = {
            let conn = self.db.connection().await;
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1 AND deleted_at IS NULL");
            fetch_one(&conn, &sql, vec![text(phone)]).await?
        };

        let user = match row {
            Some(row) => user_from_row(&row)?,
            None => {
                warn!("Login attempt for unknown phone");
                return Err(ShopError::Unauthorized("invalid phone or password".to_string()));
            }
        };
        if !verify_password(password, &user.password_hash) {
            warn!("Wrong password for user {}", user.id);
            return Err(ShopError::Unauthorized("invalid phone or password".to_string()));
        }
        Ok(user)
    }

    async fn create_session(
        &self,
        kind: AccountKind,
        owner_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshSession> {
        let conn = self.db.connection().await;
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO refresh_sessions (id, kind, owner_id, token_hash, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            vec![
                text(id.as_str()),
                text(kind.as_str()),
                int(owner_id),
                text(token_hash),
                ts(expires_at),
                now(),
            ],
        )
        .await?;

        Ok(RefreshSession {
            id,
            kind,
            owner_id,
            token_hash: token_hash.to_string(),
            expires_at,
            revoked_at: None,
        })
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<RefreshSession>> {
        let conn = self.db.connection().await;
        let sql = format!("SELECT {SESSION_COLUMNS} FROM refresh_sessions WHERE token_hash = ?1");
        fetch_one(&conn, &sql, vec![text(token_hash)])
            .await?
            .map(|row| session_from_row(&row))
            .transpose()
    }

    async fn revoke_session(&self, id: &str) -> Result<bool> {
        let conn = self.db.connection().await;
        let stamp = now();
        let affected = conn
            .execute(
                "UPDATE refresh_sessions SET revoked_at = ?2
                 WHERE id = ?1 AND revoked_at IS NULL AND expires_at > ?2",
                vec![text(id), stamp],
            )
            .await?;
        Ok(affected == 1)
    }
}
