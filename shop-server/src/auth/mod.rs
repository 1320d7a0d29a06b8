//! Token handling and the request guards built on it.

pub mod cookie;
pub mod extract;
pub mod jwt;

pub use extract::{CurrentAdmin, CurrentUser};
pub use jwt::{Claims, JwtService};

use shop_core::ShopError;

/// A token for an account that was deleted since is Unauthorized, not NotFound.
pub(crate) fn account_gone(e: ShopError) -> ShopError {
    match e {
        ShopError::NotFound(_) => ShopError::Unauthorized("account no longer exists".to_string()),
        other => other,
    }
}
