//! Profile target parsing

use url::Url;

use crate::error::{BrowserError, Result};

/// Host used when only a username is given
pub const DEFAULT_PROFILE_BASE: &str = "https://www.instagram.com";

/// A profile to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTarget {
    pub username: String,
    /// Canonical profile URL with a trailing slash
    pub url: String,
}

impl ProfileTarget {
    /// Accept either a profile URL or a bare username (optionally `@`-prefixed)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.starts_with("http://") || input.starts_with("https://") {
            return Self::from_url(input);
        }

        Self::from_username(input)
    }

    pub fn from_username(username: &str) -> Result<Self> {
        let username = username.trim().trim_start_matches('@');

        if username.is_empty() {
            return Err(BrowserError::InvalidInput("Username is empty".to_string()));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            return Err(BrowserError::InvalidInput(format!(
                "Invalid username: {}",
                username
            )));
        }

        Ok(Self {
            username: username.to_string(),
            url: format!("{}/{}/", DEFAULT_PROFILE_BASE, username),
        })
    }

    pub fn from_url(input: &str) -> Result<Self> {
        let url = Url::parse(input)
            .map_err(|e| BrowserError::InvalidUrl(format!("{}: {}", input, e)))?;

        let host = url
            .host_str()
            .ok_or_else(|| BrowserError::InvalidUrl(format!("{}: missing host", input)))?;

        let username = url
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .ok_or_else(|| {
                BrowserError::InvalidUrl(format!("{}: no username in path", input))
            })?;

        let mut target = Self::from_username(username)?;
        target.url = format!("{}://{}/{}/", url.scheme(), host, target.username);
        Ok(target)
    }
}
