use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::upstream::DEFAULT_BASE_URL;

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:8080",
    "http://localhost:8081",
    "http://192.168.68.66:8081",
    "http://192.168.1.82:8081",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub onestepgps_api_key: String,
    /// Loaded for the frontend's map integration; no route reads it yet.
    pub google_maps_api_key: Option<String>,
    pub dsn: String,
    pub bind_addr: String,
    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Reads the process environment, after folding in a `.env` file if one
    /// exists. Only the GPS API key is mandatory.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => info!("No .env file found, using process environment"),
            Err(e) => return Err(e).context("Failed to read .env file"),
        }

        let onestepgps_api_key = dotenvy::var("ONESTEPGPS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("ONESTEPGPS_API_KEY must be set"))?;

        let google_maps_api_key = dotenvy::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if google_maps_api_key.is_none() {
            warn!("GOOGLE_MAPS_API_KEY not set");
        }

        let allowed_origins = dotenvy::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            onestepgps_api_key,
            google_maps_api_key,
            dsn: try_load("DSN", "sqlite://preferences.db")?,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080")?,
            upstream_base_url: try_load("ONESTEPGPS_BASE_URL", DEFAULT_BASE_URL)?,
            upstream_timeout: load_timeout("UPSTREAM_TIMEOUT_SECS", "10")?,
            allowed_origins,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = dotenvy::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

/// Whole seconds, never zero.
fn load_timeout(key: &str, default: &str) -> Result<Duration> {
    match try_load::<u64>(key, default)? {
        0 => bail!("{key} must be greater than 0"),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
