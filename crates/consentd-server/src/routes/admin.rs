//! Admin routes — retention cleanup and compliance validation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::error;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consent/admin/cleanup", post(perform_cleanup))
        .route("/consent/admin/compliance", get(validate_compliance))
}

async fn perform_cleanup(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.validator.perform_cleanup(Utc::now()) {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Data retention cleanup completed",
                "deleted": report.deleted,
                "anonymized": report.anonymized,
            })),
        ),
        Err(e) => {
            error!("Error performing cleanup: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to perform cleanup",
                })),
            )
        }
    }
}

async fn validate_compliance(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let report = state.validator.validate_integrity();
    let config = state.service.compliance_config();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "compliance": {
                "valid": report.valid,
                "issues": report.issues,
                "config": config,
            },
        })),
    )
}
