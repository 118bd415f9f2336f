//! Error types for sf-browser

use sf_core::SourceError;
use thiserror::Error;

/// sf-browser error type
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser initialization failed: {0}")]
    Initialization(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Tab error: {0}")]
    TabError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<BrowserError> for SourceError {
    fn from(e: BrowserError) -> Self {
        SourceError::new(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BrowserError>;
