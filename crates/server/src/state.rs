use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::rate_limit::{RateLimitConfig, RateLimitState};

/// One limiter per endpoint class.
#[derive(Clone)]
pub struct RateLimits {
    pub search: RateLimitState,
    pub web_search: RateLimitState,
    pub chat: RateLimitState,
    pub health: RateLimitState,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            search: RateLimitState::new("search", RateLimitConfig::SEARCH),
            web_search: RateLimitState::new("web-search", RateLimitConfig::WEB_SEARCH),
            chat: RateLimitState::new("chat", RateLimitConfig::CHAT),
            health: RateLimitState::new("health", RateLimitConfig::HEALTH),
        }
    }
}

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract the pieces they need.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub http: reqwest::Client,
    pub limits: RateLimits,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_limits(config, RateLimits::default())
    }

    pub fn with_limits(config: ServerConfig, limits: RateLimits) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("username-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            config: Arc::new(config),
            http,
            limits,
        }
    }
}
