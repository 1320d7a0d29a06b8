use super::rows::*;
use super::*;
use crate::ability::Ability;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::security::{hash_password, verify_password};
use crate::storage::traits::AccessStore;
use async_trait::async_trait;
use tracing::{info, warn};

const ADMIN_COLUMNS: &str = "id, login, full_name, is_super, password_hash, created_at, updated_at, deleted_at";
const NAMED_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at";

fn admin_from_row(row: &Record) -> Result<AdminUser> {
    Ok(AdminUser {
        id: get_i64(row, 0)?,
        login: get_string(row, 1)?,
        full_name: get_string(row, 2)?,
        is_super: get_bool(row, 3)?,
        password_hash: get_string(row, 4)?,
        audit: get_audit(row, 5)?,
    })
}

fn subject_from_row(row: &Record) -> Result<Subject> {
    Ok(Subject {
        id: get_i64(row, 0)?,
        name: get_string(row, 1)?,
        description: get_opt_string(row, 2)?,
        audit: get_audit(row, 3)?,
    })
}

fn action_from_row(row: &Record) -> Result<Action> {
    Ok(Action {
        id: get_i64(row, 0)?,
        name: get_string(row, 1)?,
        description: get_opt_string(row, 2)?,
        audit: get_audit(row, 3)?,
    })
}

async fn load_admin(conn: &Connection, id: i64) -> Result<AdminUser> {
    let sql = format!("SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => admin_from_row(&row),
        None => Err(ShopError::not_found("Admin user", id)),
    }
}

/// `subjects` and `actions` are both `(id, name, description)` tables.
async fn load_named(conn: &Connection, table: &str, entity: &str, id: i64) -> Result<Record> {
    let sql = format!("SELECT {NAMED_COLUMNS} FROM {table} WHERE id = ?1");
    fetch_one(conn, &sql, vec![int(id)])
        .await?
        .ok_or_else(|| ShopError::not_found(entity, id))
}

async fn create_named(conn: &Connection, table: &str, entity: &str, input: NewNamed) -> Result<Record> {
    let id = insert_returning_id(
        conn,
        &format!("INSERT INTO {table} (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3) RETURNING id"),
        vec![text(input.name.as_str()), opt_text(input.description), now()],
    )
    .await
    .map_err(|e| unique_as_conflict(e, format!("{entity} '{}' already exists", input.name)))?;
    load_named(conn, table, entity, id).await
}

async fn update_named(conn: &Connection, table: &str, entity: &str, id: i64, input: NamedUpdate) -> Result<Record> {
    let current = load_named(conn, table, entity, id).await?;
    let name = input.name.unwrap_or(get_string(&current, 1)?);
    let description = input.description.or(get_opt_string(&current, 2)?);
    conn.execute(
        &format!("UPDATE {table} SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1"),
        vec![int(id), text(name.as_str()), opt_text(description), now()],
    )
    .await
    .map_err(|e| conflict_on_unique(e, format!("{entity} '{name}' already exists")))?;
    load_named(conn, table, entity, id).await
}

async fn delete_named(conn: &Connection, table: &str, entity: &str, id: i64) -> Result<()> {
    // grants referencing the row cascade
    let affected = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), vec![int(id)])
        .await?;
    if affected == 0 {
        return Err(ShopError::not_found(entity, id));
    }
    info!("Deleted {} {}", entity, id);
    Ok(())
}

async fn list_named(conn: &Connection, table: &str) -> Result<Vec<Record>> {
    fetch_all(conn, &format!("SELECT {NAMED_COLUMNS} FROM {table} ORDER BY name"), vec![]).await
}

async fn id_by_name(conn: &Connection, table: &str, entity: &str, name: &str) -> Result<i64> {
    let row = fetch_one(conn, &format!("SELECT id FROM {table} WHERE name = ?1"), vec![text(name)])
        .await?
        .ok_or_else(|| ShopError::NotFound(format!("{entity} '{name}' not found")))?;
    get_i64(&row, 0)
}

async fn permissions_of(conn: &Connection, admin_id: i64) -> Result<Vec<Permission>> {
    fetch_all(
        conn,
        "SELECT s.name, a.name FROM admin_permissions p
         JOIN subjects s ON s.id = p.subject_id
         JOIN actions a ON a.id = p.action_id
         WHERE p.admin_id = ?1
         ORDER BY s.name, a.name",
        vec![int(admin_id)],
    )
    .await?
    .iter()
    .map(|row| Ok(Permission::new(get_string(row, 0)?, get_string(row, 1)?)))
    .collect()
}

#[async_trait]
impl AccessStore for DatabaseStorage {
    async fn create_admin(&self, input: NewAdminUser) -> Result<AdminUser> {
        let password_hash = hash_password(&input.password)?;
        let conn = self.db.connection().await;
        let id = insert_returning_id(
            &conn,
            "INSERT INTO admin_users (login, full_name, password_hash, is_super, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING id",
            vec![
                text(input.login.as_str()),
                text(input.full_name),
                text(password_hash),
                int(input.is_super as i64),
                now(),
            ],
        )
        .await
        .map_err(|e| unique_as_conflict(e, format!("admin with login '{}' already exists", input.login)))?;
        let admin = load_admin(&conn, id).await?;

        info!("Created admin {} ({}), super: {}", admin.id, admin.login, admin.is_super);
        Ok(admin)
    }

    async fn get_admin(&self, id: i64) -> Result<AdminUser> {
        let conn = self.db.connection().await;
        load_admin(&conn, id).await
    }

    async fn list_admins(&self, params: ListParams) -> Result<Page<AdminUser>> {
        let conn = self.db.connection().await;
        let total = fetch_count(&conn, "SELECT COUNT(*) FROM admin_users", vec![]).await?;
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admin_users ORDER BY id LIMIT ?1 OFFSET ?2");
        let rows = fetch_all(&conn, &sql, vec![int(params.limit()), int(params.offset())]).await?;
        let items = rows.iter().map(admin_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn update_admin(&self, id: i64, input: AdminUserUpdate) -> Result<AdminUser> {
        let password_hash = input.password.as_deref().map(hash_password).transpose()?;
        let conn = self.db.connection().await;
        let current = load_admin(&conn, id).await?;

        conn.execute(
            "UPDATE admin_users SET full_name = ?2, password_hash = ?3, is_super = ?4, updated_at = ?5 WHERE id = ?1",
            vec![
                int(id),
                text(input.full_name.unwrap_or(current.full_name)),
                text(password_hash.unwrap_or(current.password_hash)),
                int(input.is_super.unwrap_or(current.is_super) as i64),
                now(),
            ],
        )
        .await?;
        load_admin(&conn, id).await
    }

    async fn delete_admin(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn.execute("DELETE FROM admin_users WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Admin user", id));
        }
        conn.execute(
            "UPDATE refresh_sessions SET revoked_at = ?2 WHERE kind = 'admin' AND owner_id = ?1 AND revoked_at IS NULL",
            vec![int(id), now()],
        )
        .await?;
        info!("Deleted admin {}", id);
        Ok(())
    }

    async fn verify_admin_credentials(&self, login: &str, password: &str) -> Result<AdminUser> {
        let row = {
            let conn = self.db.connection().await;
            let sql = format!("SELECT {ADMIN_COLUMNS} FROM admin_users WHERE login = ?1");
            fetch_one(&conn, &sql, vec![text(login)]).await?
        };

        let admin = match row {
            Some(row) => admin_from_row(&row)?,
            None => {
                warn!("Admin login attempt for unknown login '{}'", login);
                return Err(ShopError::Unauthorized("invalid login or password".to_string()));
            }
        };
        if !verify_password(password, &admin.password_hash) {
            warn!("Wrong password for admin {}", admin.id);
            return Err(ShopError::Unauthorized("invalid login or password".to_string()));
        }
        Ok(admin)
    }

    async fn create_subject(&self, input: NewNamed) -> Result<Subject> {
        let conn = self.db.connection().await;
        subject_from_row(&create_named(&conn, "subjects", "Subject", input).await?)
    }

    async fn get_subject(&self, id: i64) -> Result<Subject> {
        let conn = self.db.connection().await;
        subject_from_row(&load_named(&conn, "subjects", "Subject", id).await?)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let conn = self.db.connection().await;
        list_named(&conn, "subjects").await?.iter().map(subject_from_row).collect()
    }

    async fn update_subject(&self, id: i64, input: NamedUpdate) -> Result<Subject> {
        let conn = self.db.connection().await;
        subject_from_row(&update_named(&conn, "subjects", "Subject", id, input).await?)
    }

    async fn delete_subject(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        delete_named(&conn, "subjects", "Subject", id).await
    }

    async fn create_action(&self, input: NewNamed) -> Result<Action> {
        let conn = self.db.connection().await;
        action_from_row(&create_named(&conn, "actions", "Action", input).await?)
    }

    async fn get_action(&self, id: i64) -> Result<Action> {
        let conn = self.db.connection().await;
        action_from_row(&load_named(&conn, "actions", "Action", id).await?)
    }

    async fn list_actions(&self) -> Result<Vec<Action>> {
        let conn = self.db.connection().await;
        list_named(&conn, "actions").await?.iter().map(action_from_row).collect()
    }

    async fn update_action(&self, id: i64, input: NamedUpdate) -> Result<Action> {
        let conn = self.db.connection().await;
        action_from_row(&update_named(&conn, "actions", "Action", id, input).await?)
    }

    async fn delete_action(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        delete_named(&conn, "actions", "Action", id).await
    }

    async fn grant_permission(&self, admin_id: i64, grant: PermissionGrant) -> Result<Permission> {
        let conn = self.db.connection().await;
        load_admin(&conn, admin_id).await?;
        let subject_id = id_by_name(&conn, "subjects", "Subject", &grant.subject).await?;
        let action_id = id_by_name(&conn, "actions", "Action", &grant.action).await?;

        conn.execute(
            "INSERT INTO admin_permissions (admin_id, subject_id, action_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            vec![int(admin_id), int(subject_id), int(action_id), now()],
        )
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                format!("admin {admin_id} already may {} {}", grant.action, grant.subject),
            )
        })?;

        info!("Granted {} {} to admin {}", grant.action, grant.subject, admin_id);
        Ok(Permission::new(grant.subject, grant.action))
    }

    async fn revoke_permission(&self, admin_id: i64, subject: &str, action: &str) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn
            .execute(
                "DELETE FROM admin_permissions
                 WHERE admin_id = ?1
                   AND subject_id = (SELECT id FROM subjects WHERE name = ?2)
                   AND action_id = (SELECT id FROM actions WHERE name = ?3)",
                vec![int(admin_id), text(subject), text(action)],
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::NotFound(format!(
                "admin {admin_id} has no permission to {action} {subject}"
            )));
        }
        info!("Revoked {} {} from admin {}", action, subject, admin_id);
        Ok(())
    }

    async fn list_permissions(&self, admin_id: i64) -> Result<Vec<Permission>> {
        let conn = self.db.connection().await;
        load_admin(&conn, admin_id).await?;
        permissions_of(&conn, admin_id).await
    }

    async fn ability_for(&self, admin_id: i64) -> Result<Ability> {
        let conn = self.db.connection().await;
        let admin = load_admin(&conn, admin_id).await?;
        let rules = permissions_of(&conn, admin_id).await?;
        Ok(Ability::new(admin.is_super, rules))
    }
}
