//! `GET /api/v1/status` readiness payload.
//!
//! Test orchestration polls this endpoint through the readiness prober
//! before touching anything that depends on the service being up.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub updated_at: DateTime<Utc>,
    pub dependencies: Dependencies,
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub database: DatabaseStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub version: String,
    pub max_connections: u32,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let store = &state.shared.store;

    if store.ping().await.is_err() {
        return Err(ApiError::ServiceUnavailable {
            message: "O banco de dados não está disponível no momento.".to_string(),
        });
    }

    let version = store
        .database_version()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(StatusResponse {
        updated_at: Utc::now(),
        dependencies: Dependencies {
            database: DatabaseStatus {
                version,
                max_connections: state.shared.config.general.max_db_connections,
            },
        },
    }))
}
