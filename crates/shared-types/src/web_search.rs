use serde::{Deserialize, Serialize};

/// One web page mentioning the username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WebSearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub display_link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_url: Option<String>,
}

/// Totals reported by the search engine. Values are passed through as sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SearchInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_total_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_search_time: Option<String>,
}

/// Raw upstream payload. Only the fields we reshape are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamSearchPayload {
    #[serde(default)]
    pub items: Vec<WebSearchItem>,
    #[serde(default)]
    pub search_information: Option<SearchInformation>,
}

/// Response body of `GET /api/web-search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WebSearchResponse {
    pub items: Vec<WebSearchItem>,
    pub search_information: SearchInformation,
    /// The query string actually sent upstream.
    pub query: String,
}

impl WebSearchResponse {
    pub fn from_upstream(payload: UpstreamSearchPayload, query: String) -> Self {
        Self {
            items: payload.items,
            search_information: payload.search_information.unwrap_or_default(),
            query,
        }
    }
}

/// Query matching both the bare username and its `@handle` form.
pub fn web_search_query(username: &str) -> String {
    format!("\"{username}\" OR \"@{username}\"")
}
