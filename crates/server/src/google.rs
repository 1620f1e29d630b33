use shared_types::UpstreamSearchPayload;
use std::time::Duration;

use crate::config::GoogleConfig;
use crate::upstream::{ensure_success, with_key_rotation, UpstreamError};

pub const SERVICE: &str = "Google Search";

/// Results requested per call; the API maximum.
const PAGE_SIZE: &str = "10";

/// Run `query` against the custom search engine, rotating through the
/// configured keys. Each attempt gets its own `attempt_timeout`.
#[tracing::instrument(skip(http, config, attempt_timeout), fields(service = SERVICE, keys = config.keys.len()))]
pub async fn search(
    http: &reqwest::Client,
    config: &GoogleConfig,
    query: &str,
    attempt_timeout: Duration,
) -> Result<UpstreamSearchPayload, UpstreamError> {
    let rotation = config.keys.rotation(query);
    with_key_rotation(SERVICE, &rotation, |key| {
        fetch(http, config, query, key.key, attempt_timeout)
    })
    .await
}

async fn fetch(
    http: &reqwest::Client,
    config: &GoogleConfig,
    query: &str,
    key: &str,
    timeout: Duration,
) -> Result<UpstreamSearchPayload, UpstreamError> {
    let response = http
        .get(&config.api_url)
        .query(&[
            ("key", key),
            ("cx", config.cse_id.as_str()),
            ("q", query),
            ("num", PAGE_SIZE),
        ])
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

    ensure_success(SERVICE, response)
        .await?
        .json::<UpstreamSearchPayload>()
        .await
        .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))
}
