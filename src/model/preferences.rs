use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::de::null_as_default;

/// Toggle value used for every display flag when a user has no stored row.
pub const DEFAULT_TOGGLE: bool = true;

/// A row of the `user_preferences` table.
///
/// The bookkeeping columns keep the wire names the frontend already reads
/// (`ID`, `CreatedAt`, `UpdatedAt`, `DeletedAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserPreferences {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "CreatedAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub sort_order: String,
    #[sqlx(json)]
    pub hidden_devices: Vec<String>,
    pub default_filters: String,
    pub map_settings: String,
    pub show_address: bool,
    pub show_engine_hours: bool,
    pub show_odometer: bool,
    pub show_vin: bool,
    pub show_speed: bool,
    pub show_heading: bool,
    pub show_battery: bool,
    pub show_satellites: bool,
    pub show_last_update: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserPreferences {
    /// Transient record returned for users that have never saved anything.
    /// Nothing is written to storage.
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            id: 0,
            created_at: None,
            updated_at: None,
            deleted_at: None,
            user_id: user_id.to_string(),
            sort_order: String::new(),
            hidden_devices: Vec::new(),
            default_filters: String::new(),
            map_settings: String::new(),
            show_address: DEFAULT_TOGGLE,
            show_engine_hours: DEFAULT_TOGGLE,
            show_odometer: DEFAULT_TOGGLE,
            show_vin: DEFAULT_TOGGLE,
            show_speed: DEFAULT_TOGGLE,
            show_heading: DEFAULT_TOGGLE,
            show_battery: DEFAULT_TOGGLE,
            show_satellites: DEFAULT_TOGGLE,
            show_last_update: DEFAULT_TOGGLE,
            last_updated: None,
        }
    }

    /// Overwrites every user-controlled column with `update`.
    /// Bookkeeping columns are left alone.
    pub fn replace_with(&mut self, update: &PreferencesUpdate) {
        self.sort_order = update.sort_order.clone();
        self.hidden_devices = update.hidden_devices.clone();
        self.default_filters = update.default_filters.clone();
        self.map_settings = update.map_settings.clone();
        self.show_address = update.show_address;
        self.show_engine_hours = update.show_engine_hours;
        self.show_odometer = update.show_odometer;
        self.show_vin = update.show_vin;
        self.show_speed = update.show_speed;
        self.show_heading = update.show_heading;
        self.show_battery = update.show_battery;
        self.show_satellites = update.show_satellites;
        self.show_last_update = update.show_last_update;
        self.last_updated = update.last_updated;
    }
}

/// Body of `PUT /api/v1/preferences/{userId}`.
///
/// Writes are a full replace, so every toggle is required: a body that omits
/// one is rejected instead of silently storing `false`. Extra fields such as
/// `ID` or `user_id` echoed back from a GET are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sort_order: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hidden_devices: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub default_filters: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub map_settings: String,
    pub show_address: bool,
    pub show_engine_hours: bool,
    pub show_odometer: bool,
    pub show_vin: bool,
    pub show_speed: bool,
    pub show_heading: bool,
    pub show_battery: bool,
    pub show_satellites: bool,
    pub show_last_update: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}
