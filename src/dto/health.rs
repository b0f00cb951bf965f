//! Health endpoint payloads.

use serde::Serialize;
use utoipa::ToSchema;

/// Health status of a single dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentHealth {
    /// The dependency answered its probe.
    Up,
    /// The dependency is unreachable; the service runs degraded.
    Down,
}

/// Aggregate health report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: ComponentHealth,
    /// Storage backend status.
    pub storage: ComponentHealth,
}

impl HealthResponse {
    /// Everything is reachable.
    pub fn ok() -> Self {
        Self {
            status: ComponentHealth::Up,
            storage: ComponentHealth::Up,
        }
    }

    /// Storage is down; the service keeps serving what it can.
    pub fn degraded() -> Self {
        Self {
            status: ComponentHealth::Down,
            storage: ComponentHealth::Down,
        }
    }
}
