use axum::http::StatusCode;

use crate::common;

#[tokio::test]
async fn openapi_document_is_served() {
    let app = common::test_app(common::config_from(&[]));

    let (status, _, body) = common::get(&app, "/api/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Username Search API");
    for path in ["/api/search", "/api/web-search", "/api/chat", "/api/health"] {
        assert!(body["paths"].get(path).is_some(), "missing {path}");
    }
    assert!(body["components"]["schemas"].get("SearchResult").is_some());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = common::test_app(common::config_from(&[]));

    let (status, _, _) = common::get(&app, "/api/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
