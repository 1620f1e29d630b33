use futures_util::Stream;
use reqwest::{Response, StatusCode};
use shared_types::{
    turn_error, validate_username, AppError, ChatMessage, ChatRequest, HealthResponse,
    StreamRecord, UsernameQuery, WebSearchResponse, MAX_CHAT_MESSAGES,
};

use crate::error::{ClientError, RelayError};
use crate::relay::{search_records, sse_deltas};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const USER_AGENT: &str = concat!("username-search-cli/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the username search API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stream the platform checks for `username`.
    ///
    /// Input is validated locally first, so an invalid name never costs a
    /// request against the rate limit.
    #[tracing::instrument(skip(self))]
    pub async fn search_username(
        &self,
        username: &str,
    ) -> Result<impl Stream<Item = Result<StreamRecord, RelayError>> + Send + 'static, ClientError>
    {
        validate_username(username)?;
        let response = self
            .http
            .get(self.url("/api/search"))
            .query(&UsernameQuery::new(username))
            .send()
            .await?;
        let response = check(response).await?;
        let body = has_body(&response).then(|| response.bytes_stream());
        Ok(search_records(body)?)
    }

    /// Pages on the web mentioning `username`.
    #[tracing::instrument(skip(self))]
    pub async fn web_search(&self, username: &str) -> Result<WebSearchResponse, ClientError> {
        validate_username(username)?;
        let response = self
            .http
            .get(self.url("/api/web-search"))
            .query(&UsernameQuery::new(username))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Stream the assistant's reply to a conversation.
    #[tracing::instrument(skip_all, fields(turns = messages.len()))]
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<impl Stream<Item = Result<String, RelayError>> + Send + 'static, ClientError> {
        if messages.is_empty() || messages.len() > MAX_CHAT_MESSAGES {
            return Err(ClientError::InvalidRequest(format!(
                "Between 1 and {MAX_CHAT_MESSAGES} messages are required"
            )));
        }
        if let Some(problem) = turn_error(&messages) {
            return Err(ClientError::InvalidRequest(problem));
        }

        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(&ChatRequest { messages })
            .send()
            .await?;
        let response = check(response).await?;
        let body = has_body(&response).then(|| response.bytes_stream());
        Ok(sse_deltas(body)?)
    }

    /// Service health. An unhealthy service answers 503 with the same body,
    /// which is returned as a report rather than an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/api/health")).send().await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(response.json().await?);
        }
        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-2xx response into the API's error envelope.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let err = AppError::from_response(status.as_u16(), &body);
    tracing::debug!(status = status.as_u16(), error = %err.message, "API request failed");
    Err(err.into())
}

/// Whether the response can carry a body at all.
fn has_body(response: &Response) -> bool {
    response.status() != StatusCode::NO_CONTENT && response.content_length() != Some(0)
}
