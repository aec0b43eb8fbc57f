use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::{error, warn};

use crate::{
    api::{error::ApiError, types::DevicesResponse},
    model::preferences::{PreferencesUpdate, UserPreferences},
    state::AppState,
};

/// Ids are opaque: a blank one is rejected, anything else is used verbatim.
fn parse_user_id(raw: &str) -> Result<&str, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::bad_request("Invalid user ID"));
    }
    Ok(raw)
}

pub async fn get_user_preferences(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let prefs = state.db.get_preferences(user_id).await.map_err(|e| {
        error!(user_id, "failed to load preferences: {e:#}");
        ApiError::Internal("Failed to fetch preferences".into())
    })?;

    Ok(Json(prefs))
}

/// Full replace: the body must carry every toggle.
pub async fn update_user_preferences(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let Json(update) = payload.map_err(|rejection| {
        warn!(user_id, "rejected preferences body: {rejection}");
        ApiError::bad_request(format!("Invalid request data: {}", rejection.body_text()))
    })?;

    let saved = state
        .db
        .upsert_preferences(user_id, &update)
        .await
        .map_err(|e| {
            error!(user_id, "failed to save preferences: {e:#}");
            ApiError::Internal("Failed to update preferences".into())
        })?;

    Ok(Json(saved))
}

pub async fn get_devices(State(state): State<AppState>) -> Result<Json<DevicesResponse>, ApiError> {
    let devices = state.upstream.fetch_devices().await.map_err(|e| {
        error!("device list failed: {e}");
        ApiError::from(e)
    })?;

    Ok(Json(DevicesResponse { devices }))
}
