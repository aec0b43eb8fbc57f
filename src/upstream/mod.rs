use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{
    device::{Device, DeviceInfoResponse, DeviceListResponse},
    route::DriveStopResponse,
};

pub const DEFAULT_BASE_URL: &str = "https://track.onestepgps.com/v3/api/public";
pub const DEFAULT_STOP_DURATION: &str = "5m0s";
const MAX_RETURN_POINTS: &str = "999";
const API_KEY_PARAM: &str = "api-key";
const LAT_LNG_PARAM: &str = "lat_lng";
const UNREADABLE_BODY: &str = "<unreadable body>";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to fetch {resource}: {source}")]
    Transport {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {resource}: upstream returned {status}: {body}")]
    Status {
        resource: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode {resource} response: {source}")]
    Decode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Time-windowed drive/stop lookup for one device.
#[derive(Debug, Clone)]
pub struct DriveStopQuery {
    pub device_id: String,
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    pub stop_duration: String,
}

/// Read-only client for the OneStepGPS public API. The API key is appended
/// to every request; nothing is cached or retried.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn fetch_devices(&self) -> Result<Vec<Device>, UpstreamError> {
        let response: DeviceListResponse = self
            .get_json("devices", "/device", &[("latest_point", "true")])
            .await?;
        Ok(response.result_list)
    }

    /// Extra `params` are appended after the fixed ones and can never
    /// replace `lat_lng` or `api-key`.
    pub async fn fetch_device_info(
        &self,
        params: Option<&HashMap<String, String>>,
    ) -> Result<DeviceInfoResponse, UpstreamError> {
        let mut query = vec![(LAT_LNG_PARAM, "1")];
        if let Some(params) = params {
            let mut extra: Vec<_> = params
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), API_KEY_PARAM | LAT_LNG_PARAM))
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            extra.sort();
            query.extend(extra);
        }

        self.get_json("device info", "/device-info", &query).await
    }

    pub async fn fetch_drive_stop_route(
        &self,
        req: &DriveStopQuery,
    ) -> Result<DriveStopResponse, UpstreamError> {
        let from = req.from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let to = req.to.to_rfc3339_opts(SecondsFormat::Secs, true);

        self.get_json(
            "drive-stop route",
            "/route/drive-stop",
            &[
                ("device_id", req.device_id.as_str()),
                ("dt_tracker_from", from.as_str()),
                ("dt_tracker_to", to.as_str()),
                ("stop_duration", req.stop_duration.as_str()),
                ("return_points", "true"),
                ("max_return_points", MAX_RETURN_POINTS),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, resource, "calling upstream");

        // reqwest errors embed the full URL, which carries the API key.
        let transport = |source: reqwest::Error| UpstreamError::Transport {
            resource,
            source: source.without_url(),
        };

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[(API_KEY_PARAM, self.api_key.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(resource, "failed to read upstream error body: {}", e.without_url());
                    UNREADABLE_BODY.to_string()
                }
            };
            warn!(%status, resource, "upstream rejected request");
            return Err(UpstreamError::Status {
                resource,
                status,
                body,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode { resource, source })
    }
}
