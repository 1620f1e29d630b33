use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use server::config::ServerConfig;
use server::state::{AppState, RateLimits};
use std::collections::HashMap;
use std::net::SocketAddr;
use tower::ServiceExt;

/// Build a config from literal variables. Anything not listed is unset.
pub fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ServerConfig::from_lookup(|name| vars.get(name).cloned())
}

/// Full application router with the default rate limits.
pub fn test_app(config: ServerConfig) -> Router {
    server::openapi::app_router(AppState::new(config))
}

/// Full application router with custom rate limits.
pub fn test_app_with_limits(config: ServerConfig, limits: RateLimits) -> Router {
    server::openapi::app_router(AppState::with_limits(config, limits))
}

/// Serve a fake upstream on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind upstream listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Fake upstream failed");
    });
    format!("http://{addr}")
}

/// Serve the application itself, with peer addresses available to the
/// rate limiter, and return its base URL.
pub async fn spawn_app(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind app listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("App server failed");
    });
    format!("http://{addr}")
}

/// GET a route and parse the JSON body.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

/// GET a route as a specific client address.
pub async fn get_as(app: &Router, uri: &str, client: &str) -> (StatusCode, HeaderMap, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

/// POST JSON to a route and parse the JSON body.
pub async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, HeaderMap, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

/// Send a request through the router and parse the response.
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let (status, headers, text) = send_raw(app, req).await;
    let body: Value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, headers, body)
}

/// Send a request and return the body as text (for NDJSON and SSE streams).
pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    (
        status,
        headers,
        String::from_utf8_lossy(&body_bytes).to_string(),
    )
}

/// GET a streaming route and return the body as text.
pub async fn get_raw(app: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send_raw(app, req).await
}

/// POST JSON to a streaming route and return the body as text.
pub async fn post_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, HeaderMap, String) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send_raw(app, req).await
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// One NDJSON line describing a platform check, as the checker emits it.
pub fn result_line(source: &str, found: bool, response_time: u64, category: &str) -> String {
    let line = serde_json::json!({
        "source": source,
        "username": "octocat",
        "url": format!("https://{}.example/octocat", source.to_lowercase()),
        "isNSFW": false,
        "category": category,
        "tags": [],
        "checkResult": {
            "status": if found { 200 } else { 404 },
            "checkType": "status_code",
            "isExist": found,
            "responseTime": response_time
        }
    });
    format!("{line}\n")
}
