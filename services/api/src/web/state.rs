//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use crate::web::middleware::RateLimiter;
use crate::web::token::TokenService;
use storynest_core::ports::{AssetStore, DatabaseService, TextCompletionService};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub assets: Arc<dyn AssetStore>,
    /// `None` when no generation-provider credential is configured; the
    /// generate endpoint then fails with a configuration error.
    pub completions: Option<Arc<dyn TextCompletionService>>,
    pub tokens: TokenService,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}
