//! Session cookie persistence
//!
//! Cookies are stored as a JSON document with the time they were saved and
//! an expiry stamp. An expired file is removed on load so the next run goes
//! through the login flow again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CookieSettings;
use crate::{Error, Result};

/// Browser cookie as persisted on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Unix timestamp in seconds, `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct CookieFile {
    cookies: Vec<StoredCookie>,
    saved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Cookies loaded from a still-valid jar file
#[derive(Debug, Clone)]
pub struct LoadedCookies {
    pub cookies: Vec<StoredCookie>,
    pub saved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// JSON cookie file with an expiry timestamp
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
    ttl: Duration,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn from_settings(settings: &CookieSettings) -> Self {
        Self::new(&settings.path, Duration::days(settings.ttl_days))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write cookies, stamping them to expire `ttl` from now
    pub fn save(&self, cookies: &[StoredCookie]) -> Result<()> {
        self.save_at(cookies, Utc::now())
    }

    fn save_at(&self, cookies: &[StoredCookie], now: DateTime<Utc>) -> Result<()> {
        let file = CookieFile {
            cookies: cookies.to_vec(),
            saved_at: now,
            expires_at: now + self.ttl,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)?;

        info!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }

    /// Read cookies if the jar exists and has not expired.
    ///
    /// An expired jar is deleted and reported as `None`.
    pub fn load(&self) -> Result<Option<LoadedCookies>> {
        self.load_at(Utc::now())
    }

    fn load_at(&self, now: DateTime<Utc>) -> Result<Option<LoadedCookies>> {
        if !self.path.exists() {
            debug!("No cookie file at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let file: CookieFile = serde_json::from_str(&content).map_err(|e| {
            Error::Cookie(format!("Invalid cookie file {}: {}", self.path.display(), e))
        })?;

        if now > file.expires_at {
            warn!("Cookies in {} expired, removing", self.path.display());
            self.clear()?;
            return Ok(None);
        }

        info!(
            "Loaded {} cookies saved at {}",
            file.cookies.len(),
            file.saved_at.format("%Y-%m-%d %H:%M")
        );

        Ok(Some(LoadedCookies {
            cookies: file.cookies,
            saved_at: file.saved_at,
            expires_at: file.expires_at,
        }))
    }

    /// Delete the jar file if present
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}
