//! Failure taxonomy for calls to third-party APIs, and the retry loop that
//! walks a key rotation.

use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::keys::RotatedKey;

/// `error.errors[].reason` codes that mean "this key is exhausted or
/// rejected", so another key may still succeed.
pub const RETRYABLE_REASONS: &[&str] = &[
    "dailyLimitExceeded",
    "userRateLimitExceeded",
    "rateLimitExceeded",
    "quotaExceeded",
    "keyInvalid",
    "ipRefererBlocked",
];

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    /// The upstream answered with a non-success status.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        reasons: Vec<String>,
    },
    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Classify a `reqwest` send/read failure.
    ///
    /// The URL is stripped first: query strings may carry API keys.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            UpstreamError::Timeout { service }
        } else if err.is_decode() {
            UpstreamError::Decode {
                service,
                message: err.to_string(),
            }
        } else {
            UpstreamError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }

    /// Build the error for a non-2xx response from its status and raw body.
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body).ok();
        let (message, reasons) = match &payload {
            Some(value) => (structured_message(value), extract_reasons(value)),
            None => (None, Vec::new()),
        };
        UpstreamError::Status {
            status,
            message: format_upstream_message(service, status, message.as_deref(), &reasons),
            reasons,
        }
    }

    /// Whether trying the next key could succeed.
    ///
    /// Timeouts and transport failures are attributed to the attempt, not
    /// the request, so they also move on to the next key.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Timeout { .. } | UpstreamError::Transport { .. } => true,
            UpstreamError::Status {
                status, reasons, ..
            } => is_retryable_status(*status, reasons),
            UpstreamError::NotConfigured { .. } | UpstreamError::Decode { .. } => false,
        }
    }
}

/// Send `request` and wait at most `timeout` for the response headers.
///
/// Reading the body afterwards has no deadline, so a long but healthy
/// stream is relayed to the end.
pub async fn send_within(
    service: &'static str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<reqwest::Response, UpstreamError> {
    match tokio::time::timeout(timeout, request.send()).await {
        Ok(sent) => sent.map_err(|e| UpstreamError::from_reqwest(service, e)),
        Err(_) => Err(UpstreamError::Timeout { service }),
    }
}

/// Pass a 2xx response through; turn anything else into
/// [`UpstreamError::Status`] using its body.
pub async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::from_status(service, status.as_u16(), &body))
}

/// 429, 401 and 403 always rotate; 400 only with a quota or key reason.
pub fn is_retryable_status(status: u16, reasons: &[String]) -> bool {
    match status {
        401 | 403 | 429 => true,
        400 => reasons
            .iter()
            .any(|r| RETRYABLE_REASONS.contains(&r.as_str())),
        _ => false,
    }
}

/// `error.message`, when the payload carries one.
fn structured_message(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Object(err) => err
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string),
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        _ => None,
    }
}

/// Every `error.errors[].reason` string, in payload order.
pub fn extract_reasons(payload: &Value) -> Vec<String> {
    payload
        .pointer("/error/errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("reason").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `message [r1, r2]`, or `<service> error (<status>) [r1, r2]` when the
/// upstream sent no message.
pub fn format_upstream_message(
    service: &str,
    status: u16,
    message: Option<&str>,
    reasons: &[String],
) -> String {
    let base = match message {
        Some(m) => m.to_string(),
        None => format!("{service} error ({status})"),
    };
    if reasons.is_empty() {
        base
    } else {
        format!("{base} [{}]", reasons.join(", "))
    }
}

/// Try `attempt` with each key in `rotation` until one succeeds.
///
/// Stops at the first success, at the first non-retryable failure, or
/// after the last key, returning the most recent failure.
pub async fn with_key_rotation<'k, T, F, Fut>(
    service: &'static str,
    rotation: &[RotatedKey<'k>],
    mut attempt: F,
) -> Result<T, UpstreamError>
where
    F: FnMut(RotatedKey<'k>) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let last = rotation.len().saturating_sub(1);
    for (position, key) in rotation.iter().copied().enumerate() {
        match attempt(key).await {
            Ok(value) => {
                if position > 0 {
                    tracing::info!(
                        target: "upstream",
                        service,
                        key_index = key.index,
                        attempts = position + 1,
                        "Upstream request succeeded after rotating keys"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                let retryable = err.is_retryable();
                tracing::warn!(
                    target: "upstream",
                    service,
                    key_index = key.index,
                    attempt = position + 1,
                    of = rotation.len(),
                    retryable,
                    error = %err,
                    "Upstream attempt failed"
                );
                if !retryable || position == last {
                    return Err(err);
                }
            }
        }
    }
    Err(UpstreamError::NotConfigured { service })
}
