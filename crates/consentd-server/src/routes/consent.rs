//! Consent record routes — create, list, read, status update, audit trail.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::error;

use crate::state::AppState;
use crate::validate::{self, LogsQuery};
use consentd_core::Error;
use consentd_engine::ConsentRequest;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consent/record", post(record_consent))
        .route("/consent/logs", get(get_consent_logs))
        .route("/consent/{id}", get(get_consent_record))
        .route("/consent/{id}/status", put(update_consent_status))
        .route("/consent/{id}/audit", get(get_audit_logs))
}

// ---------------------------------------------------------------
// Request types
// ---------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdateBody {
    status: String,
    user_id: Option<String>,
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

async fn record_consent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConsentRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let errors = validate::validate_consent_request(&request);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": "Validation error",
                "errors": errors,
            })),
        );
    }

    match state.service.record_consent(&request) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "success": true,
                "message": "Consent recorded successfully",
                "consentId": record.id,
                "data": record,
            })),
        ),
        Err(e) => {
            error!("Error recording consent: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to record consent",
                })),
            )
        }
    }
}

async fn get_consent_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let filter = match validate::validate_logs_query(&query) {
        Ok(filter) => filter,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Query validation error",
                    "errors": errors,
                })),
            );
        }
    };

    let limit = filter.limit.unwrap_or(50);
    let offset = filter.offset.unwrap_or(0);

    match state.service.list_consents(&filter) {
        Ok((records, total)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": records,
                "total": total,
                "page": offset / limit + 1,
                "limit": limit,
            })),
        ),
        Err(e) => {
            error!("Error retrieving consent logs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to retrieve consent logs",
                })),
            )
        }
    }
}

async fn get_consent_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.service.get_by_id(&id) {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": record,
            })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "Consent record not found",
            })),
        ),
        Err(e) => {
            error!("Error retrieving consent record: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to retrieve consent record",
                })),
            )
        }
    }
}

async fn update_consent_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<StatusUpdateBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let actor = body.user_id.as_deref().unwrap_or("system");
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    match state
        .service
        .update_status(&id, &body.status, actor, "unknown", user_agent)
    {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Consent status updated successfully",
                "data": record,
            })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "Consent record not found",
            })),
        ),
        Err(Error::Validation(_)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": "Invalid consent status",
            })),
        ),
        Err(e) => {
            error!("Error updating consent status: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to update consent status",
                })),
            )
        }
    }
}

async fn get_audit_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.service.get_audit_trail(&id) {
        Ok(logs) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": logs,
            })),
        ),
        Err(e) => {
            error!("Error retrieving audit logs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Failed to retrieve audit logs",
                })),
            )
        }
    }
}
