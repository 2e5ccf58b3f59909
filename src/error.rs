//! Error types for the backend, configuration, and location layers

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the backend HTTP collaborator
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend responded with {status}: {message}")]
    Status { status: u16, message: String },

    /// Body was not the JSON shape we expect
    #[error("failed to decode response: {0}")]
    Decode(#[from] simd_json::Error),

    /// The request thread could not be started
    #[error("failed to start request: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from the device location layer
#[derive(Error, Debug)]
pub enum LocationError {
    /// Foreground location access was not granted
    #[error("location permission denied")]
    PermissionDenied,

    #[error("failed to read replay track {path}: {source}")]
    ReplayRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad replay line {line}: {reason}")]
    ReplayParse { line: usize, reason: String },

    #[error("failed to start location watch: {0}")]
    Spawn(#[source] std::io::Error),
}
