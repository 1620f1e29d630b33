use axum::{
    body::Body,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use client::session::run_search;
use client::{ApiClient, ClientError};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use shared_types::{
    apply_view, result_stats, FilterOptions, HealthStatus, SearchPhase, SortOptions, StatusFilter,
};

use crate::common;

/// Fake checker streaming a fixed set of results, one line per frame.
fn checker() -> Router {
    Router::new().route(
        "/search",
        get(|| async {
            let frames: Vec<Result<String, std::convert::Infallible>> = vec![
                Ok("{\"total\":4}\n".to_string()),
                Ok(common::result_line("Twitter", true, 300, "social")),
                Ok(common::result_line("Reddit", true, 200, "social")),
                Ok(common::result_line("Gitlab", false, 50, "coding")),
                Ok(common::result_line("GitHub", true, 100, "coding")),
                Ok("{\"completed\":true}\n".to_string()),
            ];
            (
                [("content-type", "application/x-ndjson")],
                Body::from_stream(futures_util::stream::iter(frames)),
            )
                .into_response()
        }),
    )
}

fn assistant() -> Router {
    Router::new().route(
        "/completions",
        post(|| async {
            (
                [("content-type", "text/event-stream")],
                "data: {\"choices\":[{\"delta\":{\"content\":\"Three \"}}]}\n\n\
                 data: {\"choices\":[{\"delta\":{\"content\":\"accounts.\"}}]}\n\n",
            )
        }),
    )
}

async fn running_app() -> ApiClient {
    let checker = common::spawn_upstream(checker()).await;
    let assistant = common::spawn_upstream(assistant()).await;
    let checker_url = format!("{checker}/search");
    let assistant_url = format!("{assistant}/completions");
    let config = common::config_from(&[
        ("WHATSMYNAME_API_URL", checker_url.as_str()),
        ("WHATSMYNAME_API_KEY", "wmn"),
        ("OPENROUTER_API_URL", assistant_url.as_str()),
        ("OPENROUTER_API_KEY", "or"),
    ]);
    let base = common::spawn_app(common::test_app(config)).await;
    ApiClient::new(&base).unwrap()
}

#[tokio::test]
async fn search_session_collects_results_and_progress() {
    let client = running_app().await;

    let mut progress = Vec::new();
    let state = run_search(&client, "octocat", |s| progress.push(s.progress_percent()))
        .await
        .unwrap();

    assert_eq!(state.phase, SearchPhase::Completed);
    assert_eq!(state.username, "octocat");
    assert_eq!(state.checked(), 4);
    assert_eq!(progress.first(), Some(&Some(0)));
    assert_eq!(progress.last(), Some(&Some(100)));

    let stats = result_stats(&state.results);
    assert_eq!((stats.total, stats.found, stats.not_found), (4, 3, 1));
    assert_eq!(stats.avg_response_time, 162.5);

    let found_fastest_first = apply_view(
        &state.results,
        &FilterOptions {
            status: StatusFilter::Found,
            ..FilterOptions::default()
        },
        &SortOptions::default(),
    );
    let sources: Vec<&str> = found_fastest_first.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["GitHub", "Reddit", "Twitter"]);
}

#[tokio::test]
async fn chat_streams_deltas() {
    let client = running_app().await;

    let deltas = client
        .chat(vec![shared_types::ChatMessage::user("How many?")])
        .await
        .unwrap();
    let text: Vec<String> = deltas.map(Result::unwrap).collect().await;

    assert_eq!(text.concat(), "Three accounts.");
}

#[tokio::test]
async fn api_errors_surface_as_envelopes() {
    let client = running_app().await;

    let err = client.web_search("octocat").await.unwrap_err();
    match err {
        ClientError::Api(e) => {
            assert_eq!(e.status_code_u16(), 500);
            assert_eq!(e.message, "Google Search is not configured");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn health_report_is_returned() {
    let client = running_app().await;

    let report = client.health().await.unwrap();

    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(report.services.whatsmyname.is_available());
    assert!(!report.services.google.is_available());
}
