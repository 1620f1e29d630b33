use reqwest::header::ACCEPT;
use std::time::Duration;

use crate::config::WhatsMyNameConfig;
use crate::upstream::{ensure_success, send_within, UpstreamError};

pub const SERVICE: &str = "WhatsMyName";

/// Start a username check and return the response once headers arrive.
///
/// The body is an NDJSON stream of results and progress records. `timeout`
/// bounds the wait for the response headers only.
#[tracing::instrument(skip(http, config, timeout), fields(service = SERVICE))]
pub async fn open_search_stream(
    http: &reqwest::Client,
    config: &WhatsMyNameConfig,
    username: &str,
    timeout: Duration,
) -> Result<reqwest::Response, UpstreamError> {
    let request = http
        .get(&config.api_url)
        .query(&[("username", username)])
        .bearer_auth(&config.api_key)
        .header(ACCEPT, "application/x-ndjson");
    let response = send_within(SERVICE, request, timeout).await?;

    let response = ensure_success(SERVICE, response).await?;
    tracing::debug!(status = response.status().as_u16(), "Search stream opened");
    Ok(response)
}
