use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::services::ReadingsService;

pub async fn health_check(State(service): State<ReadingsService>) -> (StatusCode, Json<Value>) {
    match service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": { "connected": true } })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "store": { "connected": false, "error": e.to_string() }
                })),
            )
        }
    }
}
