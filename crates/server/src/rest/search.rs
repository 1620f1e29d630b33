use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    response::{IntoResponse, Response},
    Json,
};
use shared_types::{validate_username, AppError, UsernameQuery};
use std::time::Instant;

use super::{json_rejection, limited, reject, NDJSON_CONTENT_TYPE, STREAM_CACHE_CONTROL};
use crate::client_addr::ClientAddr;
use crate::error_convert::UpstreamErrorExt;
use crate::relay::ndjson_passthrough;
use crate::state::AppState;
use crate::upstream::UpstreamError;
use crate::whatsmyname;

/// GET /api/search
#[utoipa::path(
    get,
    path = "/api/search",
    params(UsernameQuery),
    responses(
        (status = 200, description = "NDJSON stream of SearchResult and SearchMetadata records", content_type = "application/x-ndjson", body = String),
        (status = 400, description = "Invalid username", body = AppError),
        (status = 429, description = "Rate limited", body = AppError),
        (status = 500, description = "Checker not configured", body = AppError),
        (status = 502, description = "Checker failed", body = AppError),
        (status = 504, description = "Checker timed out", body = AppError)
    ),
    tag = "search"
)]
pub async fn search_get(
    State(state): State<AppState>,
    client: ClientAddr,
    Query(query): Query<UsernameQuery>,
) -> Result<Response, AppError> {
    validate_username(&query.username).map_err(|e| reject(&state, "search", e))?;
    let search = stream_search(&state, &client, &query.username);
    Ok(limited(&state.limits.search, &client, search).await)
}

/// POST /api/search
#[utoipa::path(
    post,
    path = "/api/search",
    request_body = UsernameQuery,
    responses(
        (status = 200, description = "NDJSON stream of SearchResult and SearchMetadata records", content_type = "application/x-ndjson", body = String),
        (status = 400, description = "Invalid username or body", body = AppError),
        (status = 429, description = "Rate limited", body = AppError),
        (status = 500, description = "Checker not configured", body = AppError),
        (status = 502, description = "Checker failed", body = AppError),
        (status = 504, description = "Checker timed out", body = AppError)
    ),
    tag = "search"
)]
pub async fn search_post(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Result<Json<UsernameQuery>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(query) = body.map_err(|e| reject(&state, "search", json_rejection(e)))?;
    validate_username(&query.username).map_err(|e| reject(&state, "search", e))?;
    let search = stream_search(&state, &client, &query.username);
    Ok(limited(&state.limits.search, &client, search).await)
}

/// Open the checker stream for an already-validated username.
#[tracing::instrument(skip(state, client), fields(client = %client.0))]
async fn stream_search(
    state: &AppState,
    client: &ClientAddr,
    username: &str,
) -> Result<Response, AppError> {
    let config = state.config.whatsmyname.as_ref().ok_or_else(|| {
        let err = UpstreamError::NotConfigured {
            service: whatsmyname::SERVICE,
        };
        reject(state, "search", err.into_app_error())
    })?;

    let started = Instant::now();
    let upstream =
        whatsmyname::open_search_stream(&state.http, config, username, state.config.search_timeout)
            .await
            .map_err(|e| reject(state, "search", e.into_gateway_error()))?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Relaying search stream"
    );

    let body = ndjson_passthrough(upstream.bytes_stream(), whatsmyname::SERVICE);
    Ok((
        [
            (CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (CACHE_CONTROL, STREAM_CACHE_CONTROL),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response())
}
