use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::error;

use crate::{
    api::error::ApiError,
    model::{device::DeviceInfoResponse, route::DriveStopResponse},
    state::AppState,
    upstream::{DriveStopQuery, DEFAULT_STOP_DURATION},
};

#[derive(Debug, Default, Deserialize)]
pub struct DriveStopParams {
    pub device_id: Option<String>,
    pub dt_tracker_from: Option<String>,
    pub dt_tracker_to: Option<String>,
    pub stop_duration: Option<String>,
}

impl DriveStopParams {
    /// Checks the window before anything goes upstream.
    fn into_query(self) -> Result<DriveStopQuery, ApiError> {
        let device_id = self
            .device_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::bad_request("device_id is required"))?;

        let from = parse_timestamp(self.dt_tracker_from.as_deref())
            .ok_or_else(|| ApiError::bad_request("invalid from date format"))?;
        let to = parse_timestamp(self.dt_tracker_to.as_deref())
            .ok_or_else(|| ApiError::bad_request("invalid to date format"))?;

        let stop_duration = self
            .stop_duration
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_STOP_DURATION.to_string());

        Ok(DriveStopQuery {
            device_id,
            from,
            to,
            stop_duration,
        })
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw?).ok()
}

/// Inbound query parameters are ignored; the upstream only ever sees the
/// fixed `lat_lng=1` lookup.
pub async fn get_device_info(
    State(state): State<AppState>,
) -> Result<Json<DeviceInfoResponse>, ApiError> {
    let info = state.upstream.fetch_device_info(None).await.map_err(|e| {
        error!("device info failed: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(info))
}

pub async fn get_drive_stop_route(
    State(state): State<AppState>,
    params: Result<Query<DriveStopParams>, QueryRejection>,
) -> Result<Json<DriveStopResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = params.into_query()?;

    let route = state
        .upstream
        .fetch_drive_stop_route(&query)
        .await
        .map_err(|e| {
            error!(device_id = %query.device_id, "drive-stop route failed: {e}");
            ApiError::from(e)
        })?;

    Ok(Json(route))
}
