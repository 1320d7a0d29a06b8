//! Domain data shapes shared by the storage layer and the HTTP server.
//!
//! Entities carry their audit columns through [`Audit`], flattened into the
//! serialized form. Input types (`New*`, `*Update`) are validated with
//! `validator` before they reach storage.

pub mod access;
pub mod catalog;
pub mod media;
pub mod payroll;
pub mod review;
pub mod sales;
pub mod stock;

pub use access::*;
pub use catalog::*;
pub use media::*;
pub use payroll::*;
pub use review::*;
pub use sales::*;
pub use stock::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit timestamps carried by every table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Localized title (and optional description) of a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub lang: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
