//! Shapes returned by the OneStepGPS device endpoints.
//!
//! These mirror the upstream JSON and are only decoded to be re-encoded for
//! the frontend. Fields the upstream leaves untyped stay as raw JSON values.
//! Missing fields and `null` decode to zero values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de::null_as_default;

/// Envelope of `GET /device?latest_point=true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceListResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub result_list: Vec<Device>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    #[serde(deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub activated_at: String,
    pub delivered_at: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub factory_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub active_state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bcc_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub make: String,
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub conn_type: String,
    pub conn_data: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub data_node: String,
    pub settings: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub secondary_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id_list: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub online: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub latest_device_point: DevicePoint,
    #[serde(deserialize_with = "null_as_default")]
    pub latest_accurate_device_point: DevicePoint,
    pub device_groups_id_list: Value,
    pub device_field_list: Value,
    pub device_ui_settings: Value,
}

/// One GPS fix plus everything the tracker reported with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePoint {
    #[serde(deserialize_with = "null_as_default")]
    pub device_point_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dt_server: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dt_tracker: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub lng: f64,
    pub altitude: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub angle: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub speed: f64,
    pub params: Value,
    pub device_point_external: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub device_point_detail: DevicePointDetail,
    #[serde(deserialize_with = "null_as_default")]
    pub device_state: DeviceState,
    #[serde(deserialize_with = "null_as_default")]
    pub device_state_stale: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub sequence: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatLng {
    #[serde(deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePointDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub factory_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transmit_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub gps_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub acc: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub lat_lng: LatLng,
    pub altitude: Value,
    pub speed: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub heading: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub hdop: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub num_satellites: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub remote_addr: String,
    pub hevent_list: Value,
    pub dtc_list: Value,
    pub motion_log: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub packet_sequence_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rssi: f64,
    pub trip_distance: Value,
    pub travel_distance: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub external_volt: f64,
    pub backup_battery_volt: Value,
    pub video_original_event: Value,
    pub remaining_battery_percent: Value,
    pub historic: Value,
    pub session_connected: Value,
    pub diff_corrected: Value,
    pub predicted: Value,
    pub input_1_high: Value,
    pub input_2_high: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub vin: String,
}

/// Drive status and odometer bookkeeping the upstream derives per point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    #[serde(deserialize_with = "null_as_default")]
    pub drive_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub drive_status_id: String,
    pub drive_status_duration: Value,
    pub drive_status_distance: Value,
    pub drive_status_lat_lng_distance: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub drive_status_begin_time: String,
    pub best_distance_delta: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub is_new_drive_status: bool,
    pub adjusted_lat_lng: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub beyond_max_drift_distance: bool,
    pub prev_drive_status_duration: Value,
    pub prev_drive_status_distance: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub software_odometer: OdometerReading,
    #[serde(deserialize_with = "null_as_default")]
    pub hardware_odometer: OdometerReading,
    #[serde(deserialize_with = "null_as_default")]
    pub odometer: OdometerReading,
    #[serde(deserialize_with = "null_as_default")]
    pub vin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometerReading {
    #[serde(deserialize_with = "null_as_default")]
    pub value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display: String,
}

/// Envelope of `GET /device-info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfoResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub result_list: Vec<DeviceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_sparse_device_with_nulls() {
        let raw = json!({
            "result_list": [{
                "device_id": "dev-1",
                "display_name": "Truck 12",
                "online": true,
                "delivered_at": null,
                "user_id_list": null,
                "latest_device_point": {
                    "lat": 36.1,
                    "lng": -115.2,
                    "angle": 90,
                    "device_state": {
                        "drive_status": "driving",
                        "odometer": {"value": 1024.5, "unit": "mi", "display": "1,024.5 mi"}
                    },
                    "device_point_detail": null
                },
                "latest_accurate_device_point": null
            }]
        });

        let decoded: DeviceListResponse = serde_json::from_value(raw).unwrap();
        let device = &decoded.result_list[0];
        assert_eq!(device.device_id, "dev-1");
        assert!(device.online);
        assert!(device.user_id_list.is_empty());
        assert_eq!(device.latest_device_point.angle, 90);
        assert_eq!(
            device.latest_device_point.device_state.odometer.display,
            "1,024.5 mi"
        );
        assert_eq!(device.latest_accurate_device_point, DevicePoint::default());
    }

    #[test]
    fn untyped_blobs_pass_through_untouched() {
        let raw = json!({
            "device_id": "dev-2",
            "settings": {"icon": "van", "color": [1, 2, 3]}
        });

        let device: Device = serde_json::from_value(raw).unwrap();
        let encoded = serde_json::to_value(&device).unwrap();
        assert_eq!(encoded["settings"], json!({"icon": "van", "color": [1, 2, 3]}));
        assert_eq!(encoded["delivered_at"], Value::Null);
    }
}
