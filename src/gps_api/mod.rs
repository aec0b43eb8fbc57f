use axum::{routing::get, Router};

use crate::state::AppState;

pub mod handlers;

use handlers::{get_device_info, get_drive_stop_route};

/// `/v3/api` routes proxied to the GPS provider.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v3/api/device-info", get(get_device_info))
        .route("/v3/api/route/drive-stop", get(get_drive_stop_route))
}
