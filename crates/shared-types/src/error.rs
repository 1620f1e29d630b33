use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorization of application errors.
///
/// The kind decides the HTTP status; it is not part of the wire envelope,
/// which only carries `error` and `details`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppErrorKind {
    ValidationError,
    Configuration,
    /// The dependent API answered with a non-success status.
    Upstream(u16),
    Timeout,
    RateLimited,
    /// Every configured dependency is down (health check only).
    Unavailable,
    #[default]
    InternalError,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppErrorKind::ValidationError => write!(f, "ValidationError"),
            AppErrorKind::Configuration => write!(f, "Configuration"),
            AppErrorKind::Upstream(status) => write!(f, "Upstream({status})"),
            AppErrorKind::Timeout => write!(f, "Timeout"),
            AppErrorKind::RateLimited => write!(f, "RateLimited"),
            AppErrorKind::Unavailable => write!(f, "Unavailable"),
            AppErrorKind::InternalError => write!(f, "InternalError"),
        }
    }
}

/// A single field-qualified validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Structured application error used across server and client.
///
/// Serializes as the uniform envelope `{ "error": string, "details"?: string }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppError {
    #[serde(skip)]
    pub kind: AppErrorKind,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Build a validation error from field-level failures.
    ///
    /// The message reads `Validation failed: field: message, field: message`.
    pub fn validation(errors: &[FieldError]) -> Self {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            AppErrorKind::ValidationError,
            format!("Validation failed: {joined}"),
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Configuration, message)
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Upstream(status), message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::RateLimited, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InternalError, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Replace internal messages with a generic phrase for production-like
    /// environments. Every other kind is already client-safe.
    pub fn sanitized(self, expose_internals: bool) -> Self {
        if expose_internals || self.kind != AppErrorKind::InternalError {
            return self;
        }
        Self {
            kind: self.kind,
            message: "Internal server error".to_string(),
            details: None,
        }
    }

    /// Parse an envelope received from the API, attaching the kind implied
    /// by the response status.
    pub fn from_response(status: u16, body: &str) -> Self {
        let kind = Self::kind_for_status(status);
        match serde_json::from_str::<AppError>(body) {
            Ok(mut err) => {
                err.kind = kind;
                err
            }
            Err(_) if body.trim().is_empty() => Self::new(kind, format!("HTTP {status}")),
            Err(_) => Self::new(kind, body.trim().to_string()),
        }
    }

    fn kind_for_status(status: u16) -> AppErrorKind {
        match status {
            400 => AppErrorKind::ValidationError,
            429 => AppErrorKind::RateLimited,
            503 => AppErrorKind::Unavailable,
            504 => AppErrorKind::Timeout,
            500 => AppErrorKind::InternalError,
            other => AppErrorKind::Upstream(other),
        }
    }

    pub fn status_code_u16(&self) -> u16 {
        match self.kind {
            AppErrorKind::ValidationError => 400,
            AppErrorKind::Configuration => 500,
            AppErrorKind::Upstream(status) if (400..600).contains(&status) => status,
            AppErrorKind::Upstream(_) => 502,
            AppErrorKind::Timeout => 504,
            AppErrorKind::RateLimited => 429,
            AppErrorKind::Unavailable => 503,
            AppErrorKind::InternalError => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "validation")]
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = Vec::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let msg = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                fields.push(FieldError::new(field.to_string(), msg));
            }
        }
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::validation(&fields)
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}
