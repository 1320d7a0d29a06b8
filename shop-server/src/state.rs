use shop_core::{BlobStore, Storage};
use std::sync::Arc;

use crate::auth::JwtService;
use crate::config::Config;
use crate::reporting::ErrorReporter;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub blobs: Arc<dyn BlobStore>,
    pub jwt: JwtService,
    pub config: Arc<Config>,
    pub reporter: ErrorReporter,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, blobs: Arc<dyn BlobStore>, config: Config) -> Self {
        let jwt = JwtService::new(&config.auth.jwt_secret, config.auth.access_ttl_secs);
        let reporter = ErrorReporter::new(config.error_tracking.url.clone());
        Self {
            storage,
            blobs,
            jwt,
            config: Arc::new(config),
            reporter,
        }
    }
}
