use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use server::rate_limit::{RateLimitConfig, RateLimitState};
use server::state::RateLimits;
use std::time::Duration;

use crate::common;

/// Allow `max` username searches per minute; other routes keep defaults.
fn search_limited(max: u32) -> axum::Router {
    let limits = RateLimits {
        search: RateLimitState::new(
            "search",
            RateLimitConfig::new(max, Duration::from_secs(60)),
        ),
        ..RateLimits::default()
    };
    common::test_app_with_limits(common::config_from(&[]), limits)
}

#[tokio::test]
async fn rate_limit_returns_429_when_exceeded() {
    let app = search_limited(2);
    let uri = "/api/search?username=octocat";

    // Valid requests that fail later still count against the budget.
    let (s1, h1, _) = common::get_as(&app, uri, "10.0.0.1").await;
    assert_eq!(s1, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::header(&h1, "x-ratelimit-remaining"), Some("1"));

    let (s2, h2, _) = common::get_as(&app, uri, "10.0.0.1").await;
    assert_eq!(s2, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::header(&h2, "x-ratelimit-remaining"), Some("0"));

    let (s3, h3, body) = common::get_as(&app, uri, "10.0.0.1").await;
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");
    assert_eq!(common::header(&h3, "x-ratelimit-limit"), Some("2"));
    assert_eq!(common::header(&h3, "x-ratelimit-remaining"), Some("0"));

    let retry_after: i64 = common::header(&h3, "retry-after").unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after), "retry-after {retry_after}");

    let reset = common::header(&h3, "x-ratelimit-reset").unwrap();
    let reset = chrono::DateTime::parse_from_rfc3339(reset).unwrap();
    assert!(reset > chrono::Utc::now());
}

#[tokio::test]
async fn rate_limit_separate_clients() {
    let app = search_limited(1);
    let uri = "/api/search?username=octocat";

    let (s1, _, _) = common::get_as(&app, uri, "10.0.0.1").await;
    assert_ne!(s1, StatusCode::TOO_MANY_REQUESTS);

    // Only the first X-Forwarded-For entry identifies the client.
    let (s2, _, _) = common::get_as(&app, uri, "10.0.0.2, 10.0.0.1").await;
    assert_ne!(s2, StatusCode::TOO_MANY_REQUESTS);

    let (s3, _, _) = common::get_as(&app, uri, "10.0.0.1").await;
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn rate_limit_separate_routes() {
    let app = search_limited(1);

    let (s1, _, _) = common::get_as(&app, "/api/search?username=octocat", "10.0.0.1").await;
    assert_ne!(s1, StatusCode::TOO_MANY_REQUESTS);
    let (s2, _, _) = common::get_as(&app, "/api/search?username=octocat", "10.0.0.1").await;
    assert_eq!(s2, StatusCode::TOO_MANY_REQUESTS);

    let (s3, _, _) = common::get_as(&app, "/api/health", "10.0.0.1").await;
    assert_eq!(s3, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn invalid_requests_do_not_spend_budget() {
    let app = search_limited(1);

    for _ in 0..3 {
        let (status, headers, _) =
            common::get_as(&app, "/api/search?username=a..b", "10.0.0.9").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(common::header(&headers, "x-ratelimit-remaining"), None);
    }

    let (status, headers, _) = common::get_as(&app, "/api/search?username=octocat", "10.0.0.9").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::header(&headers, "x-ratelimit-remaining"), Some("0"));
}

#[tokio::test]
async fn over_budget_client_still_sees_validation_errors() {
    let app = search_limited(1);

    let (s1, _, _) = common::post_json(&app, "/api/search", r#"{"username":"octocat"}"#).await;
    assert_eq!(s1, StatusCode::INTERNAL_SERVER_ERROR);
    let (s2, _, _) = common::post_json(&app, "/api/search", r#"{"username":"octocat"}"#).await;
    assert_eq!(s2, StatusCode::TOO_MANY_REQUESTS);

    let (s3, _, body) = common::post_json(&app, "/api/search", r#"{"username":""}"#).await;
    assert_eq!(s3, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed: username: Username is required");

    let (s4, _, _) = common::post_json(&app, "/api/search", "{").await;
    assert_eq!(s4, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_chat_budget_is_three_per_window() {
    let app = common::test_app(common::config_from(&[]));
    let valid = r#"{"messages":[{"role":"user","content":"hi"}]}"#;

    for _ in 0..3 {
        let (status, _, _) = common::post_json(&app, "/api/chat", valid).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    let (status, headers, _) = common::post_json(&app, "/api/chat", valid).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(common::header(&headers, "x-ratelimit-limit"), Some("3"));

    let (status, _, _) = common::post_json(&app, "/api/chat", r#"{"messages":[]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
