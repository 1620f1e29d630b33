use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub configured: bool,
}

impl ServiceHealth {
    /// Health of a dependency judged by configuration alone.
    pub fn from_configured(configured: bool) -> Self {
        Self {
            status: if configured {
                ServiceStatus::Available
            } else {
                ServiceStatus::Unavailable
            },
            configured,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == ServiceStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Services {
    pub whatsmyname: ServiceHealth,
    pub google: ServiceHealth,
    pub openrouter: ServiceHealth,
}

impl Services {
    /// Unhealthy when nothing is available, degraded when something is not.
    pub fn overall(&self) -> HealthStatus {
        let all = [self.whatsmyname, self.google, self.openrouter];
        let available = all.iter().filter(|s| s.is_available()).count();
        if available == 0 {
            HealthStatus::Unhealthy
        } else if available < all.len() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Response body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    pub services: Services,
}
