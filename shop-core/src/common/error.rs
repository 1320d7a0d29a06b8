use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ShopError::NotFound(format!("{entity} with id {id} not found"))
    }

    pub fn database(context: &str, e: impl std::fmt::Display) -> Self {
        ShopError::Database {
            message: format!("{context}: {e}"),
        }
    }
}

impl From<libsql::Error> for ShopError {
    fn from(e: libsql::Error) -> Self {
        ShopError::Database {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
