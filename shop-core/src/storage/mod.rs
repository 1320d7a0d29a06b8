pub mod blob;
pub mod database;
pub mod traits;

pub use blob::{BlobStore, LocalBlobStore};
pub use database::DatabaseStorage;
pub use traits::*;
