//! Service health checks

use crate::database;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthState,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub timestamp: String,
    pub components: Vec<ComponentHealth>,
}

/// Checks the dependencies the service cannot serve traffic without.
/// The pool is optional so the server can come up in degraded local
/// setups without a database.
#[derive(Clone)]
pub struct HealthChecker {
    db_pool: Option<PgPool>,
}

impl HealthChecker {
    pub fn new(db_pool: Option<PgPool>) -> Self {
        Self { db_pool }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut components = Vec::new();

        if let Some(pool) = &self.db_pool {
            let start = Instant::now();
            let result = database::health_check(pool).await;
            components.push(ComponentHealth {
                name: "database".to_string(),
                status: if result.is_ok() {
                    HealthState::Healthy
                } else {
                    HealthState::Unhealthy
                },
                response_time_ms: start.elapsed().as_millis(),
                error: result.err().map(|e| e.to_string()),
            });
        }

        let status = if components
            .iter()
            .any(|c| c.status == HealthState::Unhealthy)
        {
            HealthState::Unhealthy
        } else {
            HealthState::Healthy
        };

        HealthStatus {
            status,
            timestamp: Utc::now().to_rfc3339(),
            components,
        }
    }
}
