use axum::{
    extract::{Query, State},
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Response},
    Json,
};
use shared_types::{
    validate_username, web_search_query, AppError, UsernameQuery, WebSearchResponse,
};

use super::{limited, reject};
use crate::client_addr::ClientAddr;
use crate::error_convert::UpstreamErrorExt;
use crate::google;
use crate::state::AppState;
use crate::upstream::UpstreamError;

/// Search results are stable for minutes and upstream quota is scarce.
pub const WEB_SEARCH_CACHE_CONTROL: &str =
    "public, max-age=300, s-maxage=3600, stale-while-revalidate=86400";

/// GET /api/web-search
#[utoipa::path(
    get,
    path = "/api/web-search",
    params(UsernameQuery),
    responses(
        (status = 200, description = "Pages mentioning the username", body = WebSearchResponse),
        (status = 400, description = "Invalid username", body = AppError),
        (status = 429, description = "Rate limited", body = AppError),
        (status = 500, description = "Search not configured", body = AppError),
        (status = 502, description = "Search failed", body = AppError),
        (status = 504, description = "Search timed out", body = AppError)
    ),
    tag = "search"
)]
#[tracing::instrument(skip(state), fields(client = %client.0))]
pub async fn web_search(
    State(state): State<AppState>,
    client: ClientAddr,
    Query(query): Query<UsernameQuery>,
) -> Result<Response, AppError> {
    validate_username(&query.username).map_err(|e| reject(&state, "web-search", e))?;
    let search = search_web(&state, &query.username);
    Ok(limited(&state.limits.web_search, &client, search).await)
}

async fn search_web(state: &AppState, username: &str) -> Result<Response, AppError> {
    let config = state.config.google.as_ref().ok_or_else(|| {
        let err = UpstreamError::NotConfigured {
            service: google::SERVICE,
        };
        reject(state, "web-search", err.into_app_error())
    })?;

    let q = web_search_query(username);
    let payload = google::search(&state.http, config, &q, state.config.web_search_timeout)
        .await
        .map_err(|e| reject(state, "web-search", e.into_app_error()))?;

    let response = WebSearchResponse::from_upstream(payload, q);
    tracing::info!(items = response.items.len(), "Web search complete");
    Ok(([(CACHE_CONTROL, WEB_SEARCH_CACHE_CONTROL)], Json(response)).into_response())
}
