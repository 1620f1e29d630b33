use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::common;

/// Keys the fake engine has seen, in attempt order.
type Attempts = Arc<Mutex<Vec<String>>>;

/// Fake search engine. Behaviour depends on the key:
/// `quota-*` → 403 dailyLimitExceeded, `bad-request` → 400 without
/// reasons, `invalid-reason` → 400 keyInvalid, anything else → results.
fn engine(attempts: Attempts) -> Router {
    Router::new()
        .route("/customsearch/v1", get(search))
        .with_state(attempts)
}

async fn search(
    State(attempts): State<Attempts>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let key = params.get("key").cloned().unwrap_or_default();
    attempts.lock().unwrap().push(key.clone());

    if params.get("cx").map(String::as_str) != Some("cse-123") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if key.starts_with("quota-") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": {
                    "code": 403,
                    "message": "Daily Limit Exceeded",
                    "errors": [{ "reason": "dailyLimitExceeded" }]
                }
            })),
        )
            .into_response();
    }
    if key == "bad-request" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "Invalid Value" } })),
        )
            .into_response();
    }
    if key == "invalid-reason" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": { "code": 400, "errors": [{ "reason": "keyInvalid" }] }
            })),
        )
            .into_response();
    }

    Json(json!({
        "kind": "customsearch#search",
        "searchInformation": {
            "searchTime": 0.21,
            "formattedSearchTime": "0.21",
            "totalResults": "2",
            "formattedTotalResults": "2"
        },
        "items": [
            {
                "title": "octocat (The Octocat) - GitHub",
                "link": "https://github.com/octocat",
                "displayLink": "github.com",
                "snippet": "GitHub's mascot.",
                "formattedUrl": "https://github.com/octocat",
                "pagemap": { "ignored": true }
            },
            {
                "title": "@octocat",
                "link": "https://social.example/@octocat",
                "displayLink": "social.example",
                "snippet": "Posts by @octocat"
            }
        ],
        "q": params.get("q")
    }))
    .into_response()
}

async fn app_with_keys(keys: &str) -> (Router, Attempts) {
    let attempts: Attempts = Arc::default();
    let base = common::spawn_upstream(engine(attempts.clone())).await;
    let url = format!("{base}/customsearch/v1");
    let config = common::config_from(&[
        ("GOOGLE_API_URL", url.as_str()),
        ("GOOGLE_API_KEYS", keys),
        ("GOOGLE_CSE_ID", "cse-123"),
    ]);
    (common::test_app(config), attempts)
}

fn attempted(attempts: &Attempts) -> Vec<String> {
    attempts.lock().unwrap().clone()
}

#[tokio::test]
async fn web_search_reshapes_results() {
    let (app, attempts) = app_with_keys("good-key").await;

    let (status, headers, body) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "\"octocat\" OR \"@octocat\"");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["displayLink"], "github.com");
    assert_eq!(body["items"][0]["formattedUrl"], "https://github.com/octocat");
    assert!(body["items"][0].get("pagemap").is_none());
    assert!(body["items"][1].get("formattedUrl").is_none());
    assert_eq!(body["searchInformation"]["formattedTotalResults"], "2");
    assert!(body.get("kind").is_none());
    assert_eq!(
        common::header(&headers, "cache-control"),
        Some("public, max-age=300, s-maxage=3600, stale-while-revalidate=86400")
    );
    assert_eq!(common::header(&headers, "x-ratelimit-limit"), Some("5"));
    assert_eq!(attempted(&attempts), vec!["good-key".to_string()]);
}

#[tokio::test]
async fn quota_exhausted_key_rotates_to_next() {
    let (app, attempts) = app_with_keys("quota-a, good-key").await;

    let (status, _, body) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    // Rotation may start on either key; it always ends on the good one.
    let seen = attempted(&attempts);
    assert_eq!(seen.last().map(String::as_str), Some("good-key"));
    assert!(seen.len() <= 2);
}

#[tokio::test]
async fn bad_request_with_key_reason_rotates() {
    let (app, attempts) = app_with_keys("invalid-reason good-key").await;

    let (status, _, _) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        attempted(&attempts).last().map(String::as_str),
        Some("good-key")
    );
}

#[tokio::test]
async fn every_key_exhausted_relays_last_failure() {
    let (app, attempts) = app_with_keys("quota-a,quota-b\nquota-c").await;

    let (status, _, body) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Daily Limit Exceeded [dailyLimitExceeded]");

    let mut seen = attempted(&attempts);
    seen.sort();
    assert_eq!(seen, vec!["quota-a", "quota-b", "quota-c"]);
}

#[tokio::test]
async fn non_retryable_failure_stops_rotation() {
    let (app, attempts) = app_with_keys("bad-request").await;

    let (status, _, body) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Value");
    assert_eq!(attempted(&attempts).len(), 1);
}

#[tokio::test]
async fn duplicate_keys_are_tried_once() {
    let (app, attempts) = app_with_keys("quota-a quota-a,quota-a").await;

    let (status, _, _) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(attempted(&attempts), vec!["quota-a".to_string()]);
}

#[tokio::test]
async fn unconfigured_search_is_a_server_error() {
    let app = common::test_app(common::config_from(&[("GOOGLE_API_KEYS", "k1")]));

    let (status, _, body) = common::get(&app, "/api/web-search?username=octocat").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Google Search is not configured");
}

#[tokio::test]
async fn invalid_username_is_rejected() {
    let (app, attempts) = app_with_keys("good-key").await;

    let (status, _, _) = common::get(&app, "/api/web-search?username=-octocat").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(attempted(&attempts).is_empty());
}
