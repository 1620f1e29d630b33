pub mod chat;
pub mod search;
pub mod web_search;

use axum::{
    extract::rejection::JsonRejection,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use shared_types::{AppError, AppErrorKind, FieldError};
use std::future::Future;

use crate::client_addr::ClientAddr;
use crate::error_convert::client_facing;
use crate::health;
use crate::rate_limit::{rate_limit_middleware, RateLimitState};
use crate::state::AppState;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const SSE_CONTENT_TYPE: &str = "text/event-stream";
pub const STREAM_CACHE_CONTROL: &str = "no-cache, no-transform";

/// Build the REST API router.
///
/// The search, web-search and chat handlers validate their input and then
/// charge their own budget through [`limited`]. Health has no input and is
/// limited by middleware.
pub fn api_router(state: &AppState) -> Router<AppState> {
    let health_limit = || {
        middleware::from_fn_with_state(state.limits.health.clone(), rate_limit_middleware)
    };
    Router::new()
        .route("/api/search", get(search::search_get).post(search::search_post))
        .route("/api/web-search", get(web_search::web_search))
        .route("/api/chat", post(chat::chat))
        .route("/api/health", get(health::health_check).route_layer(health_limit()))
        .route("/health", get(health::health_check).route_layer(health_limit()))
}

/// Charge `client` against `limiter` and only then run `handler`, stamping
/// the `X-RateLimit-*` headers on whatever it returns.
///
/// `handler` is not polled when the client is over budget, so no upstream
/// call is made for a refused request.
pub(crate) async fn limited<F>(
    limiter: &RateLimitState,
    client: &ClientAddr,
    handler: F,
) -> Response
where
    F: Future<Output = Result<Response, AppError>>,
{
    let decision = match limiter.charge(&client.0) {
        Ok(decision) => decision,
        Err(exceeded) => return exceeded.into_response(),
    };
    let mut response = handler.await.into_response();
    decision.apply_headers(response.headers_mut());
    response
}

/// Malformed JSON bodies get the validation envelope, not axum's plain text.
pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation(&[FieldError::new("body", rejection.body_text())])
}

/// Log a failed request by subsystem and shape the error for the client.
pub(crate) fn reject(state: &AppState, route: &'static str, err: AppError) -> AppError {
    match err.kind {
        AppErrorKind::ValidationError => {
            tracing::debug!(route, error = %err.message, "Request rejected")
        }
        AppErrorKind::Configuration => {
            tracing::error!(target: "config", route, error = %err.message, "Upstream not configured")
        }
        AppErrorKind::Upstream(_) | AppErrorKind::Timeout => {
            tracing::error!(
                target: "upstream",
                route,
                status = err.status_code_u16(),
                error = %err.message,
                details = err.details.as_deref().unwrap_or(""),
                "Upstream call failed"
            )
        }
        AppErrorKind::RateLimited | AppErrorKind::Unavailable => {
            tracing::debug!(route, error = %err.message, "Request refused")
        }
        AppErrorKind::InternalError => {
            tracing::error!(target: "internal", route, error = %err.message, "Internal error")
        }
    }
    client_facing(err, &state.config)
}
