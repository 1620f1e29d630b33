use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How the existence checker decided whether an account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    StatusCode,
    Message,
    ResponseUrl,
    #[serde(other)]
    Unknown,
}

/// Outcome of a single platform check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// HTTP-like status reported by the checker. Informational only.
    pub status: u16,
    pub check_type: CheckType,
    /// The canonical found flag.
    pub is_exist: bool,
    /// Milliseconds spent on the check.
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One platform-existence check streamed back from a username search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub source: String,
    pub username: String,
    pub url: String,
    #[serde(rename = "isNSFW", default, deserialize_with = "null_as_default")]
    pub is_nsfw: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub check_result: CheckResult,
}

/// Missing and `null` both decode to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SearchResult {
    pub fn is_found(&self) -> bool {
        self.check_result.is_exist
    }

    pub fn response_time(&self) -> u64 {
        self.check_result.response_time
    }
}

/// Progress record interleaved with results in the NDJSON stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Terminal error record written in-band once streaming has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamErrorRecord {
    pub error: String,
}

/// A decoded NDJSON line from the search stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    Result(Box<SearchResult>),
    Metadata(SearchMetadata),
    Error(StreamErrorRecord),
    /// Valid JSON that matches none of the known shapes.
    Unknown(Value),
}

impl StreamRecord {
    /// Classify a parsed JSON line.
    ///
    /// Results are recognized by `source` + `checkResult`, metadata by
    /// `total`/`completed` without those keys.
    pub fn from_value(value: Value) -> Self {
        let Some(obj) = value.as_object() else {
            return StreamRecord::Unknown(value);
        };

        if obj.contains_key("source") && obj.contains_key("checkResult") {
            return match serde_json::from_value::<SearchResult>(value.clone()) {
                Ok(result) => StreamRecord::Result(Box::new(result)),
                Err(_) => StreamRecord::Unknown(value),
            };
        }

        if obj.contains_key("total") || obj.contains_key("completed") {
            return match serde_json::from_value::<SearchMetadata>(value.clone()) {
                Ok(meta) => StreamRecord::Metadata(meta),
                Err(_) => StreamRecord::Unknown(value),
            };
        }

        if let Some(Value::String(error)) = obj.get("error") {
            return StreamRecord::Error(StreamErrorRecord {
                error: error.clone(),
            });
        }

        StreamRecord::Unknown(value)
    }
}
