pub mod error;
pub mod pagination;
pub mod validation;

pub use error::{Result, ShopError};
pub use pagination::{ListParams, Page};
