use axum::{routing::get, Router};

use crate::state::AppState;

pub mod error;
pub mod handlers;
pub mod types;

use handlers::{get_devices, get_user_preferences, update_user_preferences};

/// `/api/v1` routes: stored preferences and the device list.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/preferences/{user_id}",
            get(get_user_preferences).put(update_user_preferences),
        )
        .route("/api/v1/devices", get(get_devices))
}
