//! Browser session management
//!
//! Provides a managed browser instance with automatic lifecycle handling.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use sf_core::{BrowserSettings, StoredCookie};
use tracing::{debug, info};

use crate::cookies;
use crate::error::{BrowserError, Result};

/// Marker text shown for missing or private profiles
const UNAVAILABLE_MARKER: &str = "Sorry, this page isn't available";

/// Browser session configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Whether to run in headless mode
    pub headless: bool,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout: u64,
    /// Custom user agent
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1366,
            height: 768,
            navigation_timeout: 60,
            user_agent: None,
        }
    }
}

impl From<&BrowserSettings> for BrowserConfig {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            width: settings.width,
            height: settings.height,
            navigation_timeout: settings.navigation_timeout_secs,
            user_agent: settings.user_agent.clone(),
        }
    }
}

impl BrowserConfig {
    /// Create a new configuration builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Launch flags passed to Chrome
    fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--window-size={},{}", self.width, self.height),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-gpu".to_string(),
        ];

        if let Some(ref ua) = self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }

        args
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn navigation_timeout(mut self, seconds: u64) -> Self {
        self.config.navigation_timeout = seconds;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Managed browser session
pub struct BrowserSession {
    browser: Browser,
    config: BrowserConfig,
}

impl BrowserSession {
    /// Create a new browser session with custom configuration
    pub fn with_config(config: BrowserConfig) -> Result<Self> {
        use std::ffi::OsStr;

        info!("Creating browser session (headless: {})", config.headless);

        let args = config.launch_args();
        let os_args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();

        let launch_options = LaunchOptionsBuilder::default()
            .headless(config.headless)
            .window_size(Some((config.width, config.height)))
            .idle_browser_timeout(Duration::from_secs(config.navigation_timeout * 5))
            .args(os_args)
            .build()
            .map_err(|e| {
                BrowserError::Initialization(format!("Failed to build launch options: {}", e))
            })?;

        let browser = Browser::new(launch_options).map_err(|e| {
            BrowserError::Initialization(format!("Failed to launch browser: {}", e))
        })?;

        info!("Browser session created successfully");

        Ok(Self { browser, config })
    }

    /// Get the active tab
    pub fn active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.browser.get_tabs();
        let tabs_guard = tabs
            .lock()
            .map_err(|e| BrowserError::TabError(format!("Failed to lock tabs: {}", e)))?;

        let tab = tabs_guard
            .first()
            .cloned()
            .ok_or_else(|| BrowserError::TabError("No active tab available".to_string()))?;

        tab.set_default_timeout(Duration::from_secs(self.config.navigation_timeout));
        Ok(tab)
    }

    /// Navigate to a URL, returning the page title
    pub fn navigate(&self, url: &str) -> Result<String> {
        let tab = self.active_tab()?;

        info!("Navigating to: {}", url);

        tab.navigate_to(url).map_err(|e| {
            BrowserError::Navigation(format!("Failed to navigate to {}: {}", url, e))
        })?;

        tab.wait_until_navigated()
            .map_err(|e| BrowserError::Navigation(format!("Navigation timeout: {}", e)))?;

        let title = tab.get_title().unwrap_or_else(|_| "Unknown".to_string());

        info!("Navigated to: {} (title: {})", url, title);

        Ok(title)
    }

    /// Navigate to a profile and fail if the site reports it as unavailable
    pub fn open_profile(&self, url: &str) -> Result<()> {
        self.navigate(url)?;

        if self.page_source()?.contains(UNAVAILABLE_MARKER) {
            return Err(BrowserError::ProfileUnavailable(url.to_string()));
        }

        Ok(())
    }

    /// Current URL of the active tab
    pub fn current_url(&self) -> Result<String> {
        Ok(self.active_tab()?.get_url())
    }

    /// Open another tab in the same browser, sharing its cookies
    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::TabError(format!("Failed to open tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_secs(self.config.navigation_timeout));
        Ok(tab)
    }

    /// Whether an element matching `selector` is currently on the page
    pub fn has_element(&self, selector: &str) -> Result<bool> {
        let tab = self.active_tab()?;
        Ok(tab.find_element(selector).is_ok())
    }

    /// Get page HTML source
    pub fn page_source(&self) -> Result<String> {
        let tab = self.active_tab()?;

        tab.get_content()
            .map_err(|e| BrowserError::Extraction(format!("Failed to get page source: {}", e)))
    }

    /// Read cookies of the active tab
    pub fn cookies(&self) -> Result<Vec<StoredCookie>> {
        let tab = self.active_tab()?;

        let cdp_cookies = tab
            .get_cookies()
            .map_err(|e| BrowserError::Cookie(format!("Failed to read cookies: {}", e)))?;

        cookies::from_cdp(&cdp_cookies)
    }

    /// Install previously saved cookies into the active tab
    pub fn set_cookies(&self, stored: &[StoredCookie]) -> Result<()> {
        let tab = self.active_tab()?;
        let params = cookies::to_cdp_params(stored)?;

        tab.set_cookies(params)
            .map_err(|e| BrowserError::Cookie(format!("Failed to set cookies: {}", e)))?;

        debug!("Installed {} cookies", stored.len());
        Ok(())
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!("Closing browser session");
    }
}

/// Evaluate a script on `tab`, returning its JSON value (or `Null`)
pub(crate) fn evaluate(tab: &Tab, script: &str) -> Result<serde_json::Value> {
    debug!(
        "Executing JavaScript: {}...",
        script.chars().take(50).collect::<String>()
    );

    let result = tab
        .evaluate(script, false)
        .map_err(|e| BrowserError::Evaluation(format!("JavaScript execution failed: {}", e)))?;

    Ok(result.value.unwrap_or(serde_json::Value::Null))
}
