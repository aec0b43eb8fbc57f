use serde::{Deserialize, Serialize};

use super::{de::null_as_default, device::LatLng};

/// A reading the upstream reports as value, unit and a display string
/// (durations, distances, speeds, odometer readings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurement {
    #[serde(deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display: String,
}

/// One drive or stop segment inside a drive/stop route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveStopPoint {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration: Measurement,
    #[serde(rename = "first_valid_lat_lng", deserialize_with = "null_as_default")]
    pub first_lat_lng: LatLng,
    #[serde(rename = "last_valid_lat_lng", deserialize_with = "null_as_default")]
    pub last_lat_lng: LatLng,
    #[serde(deserialize_with = "null_as_default")]
    pub time_from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time_to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub odometer_from: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub odometer_to: Measurement,
}

/// Body of `GET /route/drive-stop`, handed to the frontend as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveStopResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub time_from: String,
    #[serde(deserialize_with = "null_as_default")]
    pub time_to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub distance: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub average_speed: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub idle_duration: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub stop_duration: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub top_speed: Measurement,
    #[serde(deserialize_with = "null_as_default")]
    pub drive_stop_list: Vec<DriveStopPoint>,
}
