//! Liveness and readiness probes
//!
//! `GET /health` answers as long as the process runs. `GET /ready` also
//! round-trips to the listing store and answers 503 until it can.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::listing::ListingStore;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub service: String,
    pub database: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub healthy: bool,
    /// Failure category when unhealthy; never the raw driver message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health<S: ListingStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config().service.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn readiness<S: ListingStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match state.planner().store().ping().await {
        Ok(()) => DependencyStatus {
            healthy: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!(kind = %e.kind, error = %e, "Readiness probe failed");
            DependencyStatus {
                healthy: false,
                error: Some(e.kind.to_string()),
            }
        }
    };

    let status = if database.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        ready: database.healthy,
        service: state.config().service.name.clone(),
        database,
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::DatabaseError;
    use crate::listing::{InMemoryListingStore, QueryPage, QueryPlan, Rental, RentalId, StoreResult};

    struct UnreachableStore;

    impl ListingStore for UnreachableStore {
        async fn get_by_id(&self, _id: RentalId) -> StoreResult<Option<Rental>> {
            Err(DatabaseError::connection_failed("connection refused"))
        }

        async fn query(&self, _plan: &QueryPlan) -> StoreResult<QueryPage> {
            Err(DatabaseError::connection_failed("connection refused"))
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(DatabaseError::connection_failed("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_health_reports_version() {
        let state = AppState::new(Config::default(), InMemoryListingStore::default());
        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "rental-service");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_readiness_fails_without_database() {
        let state = AppState::new(Config::default(), UnreachableStore);
        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.ready);
        assert!(!body.database.healthy);
        assert_eq!(body.database.error.as_deref(), Some("connection_failed"));
    }
}
