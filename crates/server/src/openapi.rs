use axum::{routing::get, Json, Router};
use shared_types::{
    AppError, ChatMessage, ChatRequest, ChatRole, CheckResult, CheckType, HealthResponse,
    HealthStatus, SearchInformation, SearchMetadata, SearchResult, ServiceHealth, ServiceStatus,
    Services, UsernameQuery, WebSearchItem, WebSearchResponse,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::health;
use crate::rest;
use crate::state::AppState;

/// OpenAPI documentation for the API.
#[derive(OpenApi)]
#[openapi(
    paths(
        rest::search::search_get,
        rest::search::search_post,
        rest::web_search::web_search,
        rest::chat::chat,
        health::health_check,
    ),
    components(schemas(
        AppError,
        UsernameQuery,
        SearchResult,
        CheckResult,
        CheckType,
        SearchMetadata,
        WebSearchResponse,
        WebSearchItem,
        SearchInformation,
        ChatRequest,
        ChatMessage,
        ChatRole,
        HealthResponse,
        HealthStatus,
        Services,
        ServiceHealth,
        ServiceStatus,
    )),
    tags(
        (name = "search", description = "Username existence and web mention search"),
        (name = "chat", description = "Streaming assistant for search results"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "Username Search API",
        description = "Find where a username is registered, where it is mentioned, and ask about the results",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Build the application router: the REST API, the OpenAPI document at
/// `/api/openapi.json`, and the docs UI at `/docs` when enabled.
pub fn app_router(state: AppState) -> Router {
    let flags = crate::config::feature_flags();

    let router = rest::api_router(&state)
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state);

    if flags.docs {
        router.merge(Scalar::with_url("/docs", ApiDoc::openapi()))
    } else {
        router
    }
}
