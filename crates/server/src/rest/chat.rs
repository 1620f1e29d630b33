use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use shared_types::{AppError, ChatRequest};

use super::{json_rejection, limited, reject, SSE_CONTENT_TYPE, STREAM_CACHE_CONTROL};
use crate::client_addr::ClientAddr;
use crate::error_convert::{UpstreamErrorExt, ValidateRequest};
use crate::openrouter;
use crate::relay::sse_passthrough;
use crate::state::AppState;
use crate::upstream::UpstreamError;

/// POST /api/chat
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of completion deltas, ending with `data: [DONE]`", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid conversation", body = AppError),
        (status = 429, description = "Rate limited", body = AppError),
        (status = 500, description = "Chat not configured", body = AppError),
        (status = 502, description = "Chat upstream failed", body = AppError),
        (status = 504, description = "Chat upstream timed out", body = AppError)
    ),
    tag = "chat"
)]
#[tracing::instrument(skip_all, fields(client = %client.0))]
pub async fn chat(
    State(state): State<AppState>,
    client: ClientAddr,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(|e| reject(&state, "chat", json_rejection(e)))?;
    request
        .validate_request()
        .map_err(|e| reject(&state, "chat", e))?;
    Ok(limited(&state.limits.chat, &client, relay_chat(&state, request)).await)
}

async fn relay_chat(state: &AppState, request: ChatRequest) -> Result<Response, AppError> {
    let config = state.config.openrouter.as_ref().ok_or_else(|| {
        let err = UpstreamError::NotConfigured {
            service: openrouter::SERVICE,
        };
        reject(state, "chat", err.into_app_error())
    })?;

    let upstream =
        openrouter::open_chat_stream(&state.http, config, &request.messages, state.config.chat_timeout)
            .await
            .map_err(|e| reject(state, "chat", e.into_app_error()))?;

    tracing::info!(turns = request.messages.len(), "Relaying chat stream");
    let body = sse_passthrough(upstream.bytes_stream(), openrouter::SERVICE);
    Ok((
        [
            (CONTENT_TYPE, SSE_CONTENT_TYPE),
            (CACHE_CONTROL, STREAM_CACHE_CONTROL),
            (CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}
