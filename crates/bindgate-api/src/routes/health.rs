//! Health check and staff endpoints

use axum::Json;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
}

/// GET /health - process liveness, never touches the directory
pub async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        version: bindgate_core::VERSION.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct StaffResponse {
    pub result: String,
}

/// POST /is_staff - every caller is staff
pub async fn is_staff() -> Json<StaffResponse> {
    Json(StaffResponse {
        result: "True".to_string(),
    })
}
