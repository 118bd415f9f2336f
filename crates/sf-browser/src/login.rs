//! Interactive login
//!
//! The user completes the login (including any 2FA) in a visible browser
//! window; we only wait for the logged-in marker and then persist cookies.

use std::time::{Duration, Instant};

use sf_core::{BrowserSettings, CookieJar};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{BrowserError, Result};
use crate::session::BrowserSession;

/// Pause after the login marker appears so redirects settle
const POST_LOGIN_SETTLE: Duration = Duration::from_secs(2);

/// How often the page is checked for the logged-in marker
const LOGIN_POLL: Duration = Duration::from_secs(1);

/// Open the login page and block until the user has logged in.
///
/// Gives up when `login_timeout_secs` passes or `cancel` fires. On success
/// the session's cookies are written to `jar` when given.
pub fn interactive_login(
    session: &BrowserSession,
    settings: &BrowserSettings,
    jar: Option<&CookieJar>,
    cancel: &CancellationToken,
) -> Result<()> {
    if session.config().headless {
        warn!("Interactive login in headless mode: nobody can type into this browser");
    }

    session.navigate(&settings.login_url)?;

    info!("Log in to your account in the browser window");
    info!(
        "Waiting up to {}s for login to complete...",
        settings.login_timeout_secs
    );

    let timeout = Duration::from_secs(settings.login_timeout_secs);
    poll_until(timeout, LOGIN_POLL, cancel, || {
        session.has_element(&settings.logged_in_selector)
    })
    .map_err(|e| match e {
        BrowserError::Timeout(_) => BrowserError::Login(format!(
            "Timed out after {}s waiting for login",
            settings.login_timeout_secs
        )),
        other => other,
    })?;

    let url = session.current_url()?;
    if is_login_page(&url) {
        return Err(BrowserError::Login(format!("Still on login page: {}", url)));
    }

    std::thread::sleep(POST_LOGIN_SETTLE);
    info!("Login detected");

    if let Some(jar) = jar {
        let cookies = session.cookies()?;
        jar.save(&cookies)
            .map_err(|e| BrowserError::Cookie(format!("Failed to save cookies: {}", e)))?;
    }

    Ok(())
}

/// Whether `url` still points at a login form
pub fn is_login_page(url: &str) -> bool {
    url.to_lowercase().contains("login")
}

/// Call `check` every `interval` until it returns `true`, `timeout` passes
/// or `cancel` fires.
fn poll_until<F>(
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }
        if check()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "Condition not met within {:?}",
                timeout
            )));
        }
        std::thread::sleep(interval);
    }
}
