//! Error types for sf-core

use thiserror::Error;

/// Main error type for sf-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] crate::discovery::DiscoveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sf-core
pub type Result<T> = std::result::Result<T, Error>;
