use crate::common::error::{Result, ShopError};
use libsql::{Builder, Connection, Database};
use std::ops::Deref;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Ordered schema migrations. Each is applied once and recorded in
/// `schema_migrations`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_create_tables", include_str!("../migrations/001_create_tables.sql")),
    ("002_indexes_and_seeds", include_str!("../migrations/002_indexes_and_seeds.sql")),
];

/// Owns the libSQL database and the connection every query goes through.
///
/// All statements share one connection behind an async mutex, so a
/// transaction holds the whole database until it commits or rolls back.
/// That also keeps `:memory:` databases coherent across callers.
pub struct DatabaseManager {
    _db: Database,
    conn: Mutex<Connection>,
}

impl DatabaseManager {
    /// Open a database by URL: `libsql://` / `https://` for a remote Turso
    /// database, `:memory:` for a throwaway one, anything else is a local path
    /// (an optional `file:` prefix is stripped).
    pub async fn new(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let db = if url.starts_with("libsql://") || url.starts_with("https://") || url.starts_with("http://") {
            let token = auth_token.ok_or_else(|| ShopError::Database {
                message: "auth token is required for a remote database".to_string(),
            })?;
            info!("Connecting to remote libSQL database at {}", url);
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            info!("Opening local libSQL database at {}", path);
            Builder::new_local(path).build().await
        }
        .map_err(|e| ShopError::database("Failed to open database", e))?;

        let conn = db
            .connect()
            .map_err(|e| ShopError::database("Failed to get database connection", e))?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| ShopError::database("Failed to enable foreign keys", e))?;

        Ok(Self {
            _db: db,
            conn: Mutex::new(conn),
        })
    }

    /// Open a fresh in-memory database and run migrations. Used by tests.
    pub async fn in_memory() -> Result<Self> {
        let manager = Self::new(":memory:", None).await?;
        manager.run_migrations().await?;
        Ok(manager)
    }

    /// Exclusive access to the shared connection.
    pub async fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Start an immediate transaction. Finish it with [`Tx::commit`],
    /// [`Tx::rollback`] or [`Tx::finish`].
    pub async fn begin(&self) -> Result<Tx<'_>> {
        let conn = self.conn.lock().await;
        if !conn.is_autocommit() {
            // A previous transaction was abandoned mid-flight (cancelled future).
            warn!("Rolling back an abandoned transaction");
            conn.execute("ROLLBACK", ()).await?;
        }
        conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(Tx { conn, open: true })
    }

    /// Apply pending migrations in order.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.connection().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             )",
            (),
        )
        .await
        .map_err(|e| ShopError::database("Failed to create schema_migrations", e))?;

        for (version, sql) in MIGRATIONS {
            let mut rows = conn
                .query(
                    "SELECT 1 FROM schema_migrations WHERE version = ?1",
                    libsql::params![*version],
                )
                .await?;
            if rows.next().await?.is_some() {
                debug!("Migration {} already applied", version);
                continue;
            }

            conn.execute_batch(sql)
                .await
                .map_err(|e| ShopError::database(&format!("Failed to run migration {version}"), e))?;
            conn.execute(
                "INSERT INTO schema_migrations (version) VALUES (?1)",
                libsql::params![*version],
            )
            .await?;
            info!("Applied migration {}", version);
        }

        info!("Database migrations completed successfully");
        Ok(())
    }
}

/// An open transaction holding the connection lock.
pub struct Tx<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl<'a> Tx<'a> {
    pub async fn commit(mut self) -> Result<()> {
        self.conn.execute("COMMIT", ()).await?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", ()).await?;
        self.open = false;
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`, and pass the result through.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("Rollback failed after error '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }
}

impl Deref for Tx<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if self.open {
            warn!("Transaction dropped while open; it will be rolled back on next begin");
        }
    }
}
