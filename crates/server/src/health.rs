use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use shared_types::{HealthResponse, HealthStatus, ServiceHealth, Services};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::config::ServerConfig;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the application start time. Call once during startup.
pub fn record_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Seconds since [`record_start_time`], or 0 if it was never called.
pub fn uptime_seconds() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Dependency status judged from configuration. Nothing is probed, so a
/// health check never spends upstream quota.
pub fn service_health(config: &ServerConfig) -> Services {
    Services {
        whatsmyname: ServiceHealth::from_configured(config.whatsmyname.is_some()),
        google: ServiceHealth::from_configured(config.google.is_some()),
        openrouter: ServiceHealth::from_configured(config.openrouter.is_some()),
    }
}

pub fn health_report(config: &ServerConfig) -> HealthResponse {
    let services = service_health(config);
    HealthResponse {
        status: services.overall(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.environment.clone(),
        services,
    }
}

/// Health check handler.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "All or some services are available", body = HealthResponse),
        (status = 503, description = "No service is available", body = HealthResponse),
        (status = 429, description = "Rate limited", body = shared_types::AppError)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(config): State<Arc<ServerConfig>>,
) -> (StatusCode, Json<HealthResponse>) {
    let report = health_report(&config);
    let status = if report.status == HealthStatus::Unhealthy {
        tracing::warn!(uptime_seconds = uptime_seconds(), "Health check: no upstream configured");
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}
