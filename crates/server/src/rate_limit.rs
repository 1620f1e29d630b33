use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use shared_types::AppError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::client_addr::resolve_client_addr;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Expired records are only swept once the table holds this many keys.
const SWEEP_THRESHOLD: usize = 1024;

/// Budget for one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub interval: Duration,
    pub max_requests: u32,
}

impl RateLimitConfig {
    pub const SEARCH: Self = Self::new(10, Duration::from_secs(10));
    /// Stricter: the web-search quota is small.
    pub const WEB_SEARCH: Self = Self::new(5, Duration::from_secs(10));
    pub const CHAT: Self = Self::new(3, Duration::from_secs(10));
    pub const HEALTH: Self = Self::new(100, Duration::from_secs(60));

    pub const fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            interval,
            max_requests,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    reset: DateTime<Utc>,
}

/// Outcome of one check. Carries the header values for both outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window clears, at least 1.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.reset - now).num_milliseconds();
        ((millis + 999) / 1000).max(1)
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if let Ok(reset) = HeaderValue::from_str(
            &self.reset.to_rfc3339_opts(SecondsFormat::Millis, true),
        ) {
            headers.insert(X_RATELIMIT_RESET, reset);
        }
    }
}

/// Fixed-window counters for one route, keyed by `"<route>:<client>"`.
#[derive(Clone)]
pub struct RateLimitState {
    route: &'static str,
    config: RateLimitConfig,
    records: Arc<Mutex<HashMap<String, RateLimitRecord>>>,
}

impl RateLimitState {
    pub fn new(route: &'static str, config: RateLimitConfig) -> Self {
        Self {
            route,
            config,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn route(&self) -> &'static str {
        self.route
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn key_for(&self, client: &str) -> String {
        format!("{}:{}", self.route, client)
    }

    /// Count one request from `client` now, turning a denial into
    /// [`RateLimitExceeded`].
    pub fn charge(&self, client: &str) -> Result<RateLimitDecision, RateLimitExceeded> {
        let now = Utc::now();
        let decision = self.check_at(client, now);
        if decision.allowed {
            return Ok(decision);
        }
        tracing::debug!(
            route = self.route(),
            client = %client,
            limit = decision.limit,
            "Rate limit exceeded"
        );
        Err(RateLimitExceeded { decision, at: now })
    }

    /// Count one request from `client` at `now`. Denied requests are not
    /// counted.
    pub fn check_at(&self, client: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let limit = self.config.max_requests;
        let interval = chrono::Duration::from_std(self.config.interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let key = self.key_for(client);

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.len() >= SWEEP_THRESHOLD {
            records.retain(|_, r| r.reset > now);
        }

        let record = records.entry(key).or_insert(RateLimitRecord {
            count: 0,
            reset: now + interval,
        });
        if now >= record.reset {
            *record = RateLimitRecord {
                count: 0,
                reset: now + interval,
            };
        }

        let allowed = record.count < limit;
        if allowed {
            record.count += 1;
        }
        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset: record.reset,
        }
    }

    /// Number of tracked keys.
    pub fn tracked(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A request refused because its client is over budget. Renders as the 429
/// envelope with the `X-RateLimit-*` headers and `Retry-After`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitExceeded {
    pub decision: RateLimitDecision,
    pub at: DateTime<Utc>,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let mut response =
            AppError::rate_limited("Too many requests. Please try again later.").into_response();
        self.decision.apply_headers(response.headers_mut());
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(self.decision.retry_after_secs(self.at)),
        );
        response
    }
}

/// Axum middleware that enforces the route's budget per client address and
/// attaches the `X-RateLimit-*` headers to every response.
///
/// For routes with no input to validate. Routes that take input charge the
/// budget from the handler once the input has passed validation.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = resolve_client_addr(request.headers(), peer);
    let decision = match state.charge(&client) {
        Ok(decision) => decision,
        Err(exceeded) => return exceeded.into_response(),
    };

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
