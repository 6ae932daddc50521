use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};

use crate::error::{AppError, Result};
use crate::models::{
    DeviceSnapshot, EnergyConsumptionResponse, EnergyQueryParams, NewSnapshot, SaveResponse,
};
use crate::services::ReadingsService;

/// POST /api/readings
/// Devices report one snapshot per call
pub async fn create_reading(
    State(service): State<ReadingsService>,
    payload: std::result::Result<Json<NewSnapshot>, JsonRejection>,
) -> Result<Json<SaveResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let data = service.ingest(payload).await?;

    Ok(Json(SaveResponse {
        message: "Saved".to_string(),
        data,
    }))
}

/// GET /api/readings
/// Latest snapshot of every known device
pub async fn list_latest(
    State(service): State<ReadingsService>,
) -> Result<Json<Vec<DeviceSnapshot>>> {
    let devices = service.latest().await?;
    Ok(Json(devices))
}

/// GET /api/readings/{device_id}
pub async fn device_history(
    State(service): State<ReadingsService>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<DeviceSnapshot>>> {
    let readings = service.device_history(&device_id).await?;
    Ok(Json(readings))
}

/// GET /api/energy-consumption
/// Every load of every snapshot, optionally limited to `from`/`to`
pub async fn energy_consumption(
    State(service): State<ReadingsService>,
    params: std::result::Result<Query<EnergyQueryParams>, QueryRejection>,
) -> Result<Json<EnergyConsumptionResponse>> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;

    let response = service.energy_consumption(params).await?;
    Ok(Json(response))
}
