use shared_types::AppError;

use crate::config::ServerConfig;
use crate::upstream::UpstreamError;

/// Convert an UpstreamError into an AppError, relaying the upstream status.
pub fn upstream_to_app_error(err: UpstreamError) -> AppError {
    match err {
        UpstreamError::NotConfigured { service } => {
            AppError::configuration(format!("{service} is not configured"))
        }
        UpstreamError::Timeout { service } => {
            AppError::timeout(format!("{service} request timed out"))
        }
        UpstreamError::Transport { service, message } => {
            AppError::upstream(502, format!("{service} is unreachable")).with_details(message)
        }
        UpstreamError::Status {
            status, message, ..
        } => AppError::upstream(status, message),
        UpstreamError::Decode { service, message } => {
            AppError::upstream(502, format!("{service} returned an invalid response"))
                .with_details(message)
        }
    }
}

/// Like [`upstream_to_app_error`], but every upstream status becomes a 502
/// with the original status kept in `details`.
pub fn upstream_to_gateway_error(err: UpstreamError) -> AppError {
    match err {
        UpstreamError::Status {
            status, message, ..
        } => AppError::upstream(502, message).with_details(format!("Upstream status: {status}")),
        other => upstream_to_app_error(other),
    }
}

/// Extension trait providing `.into_app_error()` on UpstreamError.
pub trait UpstreamErrorExt {
    fn into_app_error(self) -> AppError;
    fn into_gateway_error(self) -> AppError;
}

impl UpstreamErrorExt for UpstreamError {
    fn into_app_error(self) -> AppError {
        upstream_to_app_error(self)
    }

    fn into_gateway_error(self) -> AppError {
        upstream_to_gateway_error(self)
    }
}

/// Final shaping before an error leaves the process.
pub fn client_facing(err: AppError, config: &ServerConfig) -> AppError {
    err.sanitized(!config.is_production_like())
}

/// Trait for validating request DTOs before processing.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), AppError>;
}

impl<T: validator::Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}
