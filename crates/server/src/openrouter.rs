use reqwest::header::ACCEPT;
use serde::Serialize;
use shared_types::{ChatMessage, ChatRole};
use std::time::Duration;

use crate::config::OpenRouterConfig;
use crate::upstream::{ensure_success, send_within, UpstreamError};

pub const SERVICE: &str = "OpenRouter";

#[derive(Debug, Serialize, PartialEq)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    stream: bool,
}

fn completion_request<'a>(
    config: &'a OpenRouterConfig,
    messages: &'a [ChatMessage],
) -> CompletionRequest<'a> {
    let system = config.system_prompt.as_deref().map(|prompt| CompletionMessage {
        role: "system",
        content: prompt,
    });
    let turns = messages.iter().map(|m| CompletionMessage {
        role: match m.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        content: &m.content,
    });
    CompletionRequest {
        model: &config.model,
        messages: system.into_iter().chain(turns).collect(),
        stream: true,
    }
}

/// Start a streaming chat completion and return the response once
/// headers arrive. The body is `text/event-stream`; `timeout` only bounds
/// the wait for the headers.
#[tracing::instrument(skip_all, fields(service = SERVICE, model = %config.model, turns = messages.len()))]
pub async fn open_chat_stream(
    http: &reqwest::Client,
    config: &OpenRouterConfig,
    messages: &[ChatMessage],
    timeout: Duration,
) -> Result<reqwest::Response, UpstreamError> {
    let request = http
        .post(&config.api_url)
        .bearer_auth(&config.api_key)
        .header(ACCEPT, "text/event-stream")
        .header("X-Title", "Username Search")
        .json(&completion_request(config, messages));
    let response = send_within(SERVICE, request, timeout).await?;

    ensure_success(SERVICE, response).await
}
