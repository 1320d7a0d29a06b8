pub mod ability;
pub mod common;
pub mod database;
pub mod domain;
pub mod pricing;
pub mod security;
pub mod storage;

pub use common::{ListParams, Page, Result, ShopError};
pub use domain::*;

pub use ability::Ability;
pub use database::DatabaseManager;
pub use storage::{BlobStore, DatabaseStorage, LocalBlobStore, Storage};
