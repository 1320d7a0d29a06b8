//! HTTP API for the shop backend: configuration, auth, routing and handlers
//! on top of `shop_core` storage.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod observability;
pub mod reporting;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{create_server, start_server};
pub use state::AppState;
