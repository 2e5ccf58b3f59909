//! Runtime configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults, an optional TOML
//! file, `FLAGMAP_*` environment variables, then command-line flags (applied by
//! the binary). Invalid values fail at start-up instead of falling back.
//!
//! ```toml
//! [backend]
//! base_url = "http://127.0.0.1:8000"
//!
//! [map]
//! initial_longitude_delta = 0.0421
//! basemap_dir = "data"
//!
//! [location]
//! provider = "fixed"
//! latitude = 12.9716
//! longitude = 77.5946
//!
//! [logging]
//! level = "debug"
//! file = "flagmap.log"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;
use crate::location::WatchOptions;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub base_url: String,
    /// Sent as `Authorization: Token <token>` when set
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Longitude span of the first viewport, centred on the first location fix
    pub initial_longitude_delta: f64,
    /// Directory of GeoJSON outlines drawn under the markers
    pub basemap_dir: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_longitude_delta: 0.0421,
            basemap_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProviderKind {
    /// No device location; permission is reported as denied
    #[default]
    None,
    Fixed,
    Replay,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    pub provider: LocationProviderKind,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub replay_file: Option<PathBuf>,
    pub min_interval_secs: u64,
    pub min_distance_m: f64,
    pub poll_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProviderKind::None,
            latitude: None,
            longitude: None,
            replay_file: None,
            min_interval_secs: 5,
            min_distance_m: 10.0,
            poll_ms: 1000,
        }
    }
}

impl LocationConfig {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            min_interval: Duration::from_secs(self.min_interval_secs),
            min_distance_m: self.min_distance_m,
            poll: Duration::from_millis(self.poll_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Base level when no filter is given
    pub level: String,
    /// `EnvFilter` directives, e.g. `flagmap=debug,reqwest=warn`
    pub filter: Option<String>,
    /// Log destination. The terminal belongs to the UI, so logs go to a file.
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            file: PathBuf::from("flagmap.log"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub map: MapConfig,
    pub location: LocationConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from a TOML file. Missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `FLAGMAP_BASE_URL`, `FLAGMAP_TOKEN` and `FLAGMAP_LOG`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FLAGMAP_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(token) = lookup("FLAGMAP_TOKEN") {
            self.backend.token = Some(token);
        }
        if let Some(filter) = lookup("FLAGMAP_LOG") {
            self.logging.filter = Some(filter);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend.base_url must be an http(s) URL, got `{url}`"
            )));
        }

        let delta = self.map.initial_longitude_delta;
        if !(delta > 0.0 && delta <= 360.0) {
            return Err(ConfigError::Invalid(format!(
                "map.initial_longitude_delta must be in (0, 360], got {delta}"
            )));
        }

        let loc = &self.location;
        match loc.provider {
            LocationProviderKind::Fixed => match (loc.latitude, loc.longitude) {
                (Some(lat), Some(lon)) => {
                    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                        return Err(ConfigError::Invalid(format!(
                            "location {lat},{lon} is out of range"
                        )));
                    }
                }
                _ => {
                    return Err(ConfigError::Invalid(
                        "location.provider = \"fixed\" needs latitude and longitude".to_string(),
                    ))
                }
            },
            LocationProviderKind::Replay if loc.replay_file.is_none() => {
                return Err(ConfigError::Invalid(
                    "location.provider = \"replay\" needs replay_file".to_string(),
                ));
            }
            _ => {}
        }
        if loc.poll_ms == 0 {
            return Err(ConfigError::Invalid("location.poll_ms must be > 0".to_string()));
        }
        if !(loc.min_distance_m >= 0.0) {
            return Err(ConfigError::Invalid(
                "location.min_distance_m must be >= 0".to_string(),
            ));
        }

        let log = &self.logging;
        EnvFilter::try_new(&log.level).map_err(|e| {
            ConfigError::Invalid(format!("logging.level `{}`: {e}", log.level))
        })?;
        if let Some(ref filter) = log.filter {
            EnvFilter::try_new(filter)
                .map_err(|e| ConfigError::Invalid(format!("logging.filter `{filter}`: {e}")))?;
        }
        Ok(())
    }
}
