//! Conversion between persisted cookies and CDP cookies
//!
//! Both directions go through JSON so the mapping only depends on the
//! DevTools protocol field names, not on the generated Rust structs.

use headless_chrome::protocol::cdp::Network::{Cookie, CookieParam};
use serde_json::{Value, json};
use sf_core::StoredCookie;

use crate::error::{BrowserError, Result};

/// Build `Network.setCookies` parameters
pub fn to_cdp_params(cookies: &[StoredCookie]) -> Result<Vec<CookieParam>> {
    cookies
        .iter()
        .map(|c| {
            serde_json::from_value(param_json(c)).map_err(|e| {
                BrowserError::Cookie(format!("Invalid cookie '{}': {}", c.name, e))
            })
        })
        .collect()
}

/// Convert cookies read from the browser
pub fn from_cdp(cookies: &[Cookie]) -> Result<Vec<StoredCookie>> {
    cookies
        .iter()
        .map(|c| {
            let value = serde_json::to_value(c)
                .map_err(|e| BrowserError::Cookie(format!("Unreadable cookie: {}", e)))?;
            stored_from_json(&value)
                .ok_or_else(|| BrowserError::Cookie("Cookie without name or domain".to_string()))
        })
        .collect()
}

fn param_json(cookie: &StoredCookie) -> Value {
    let mut value = json!({
        "name": cookie.name,
        "value": cookie.value,
        "domain": cookie.domain,
        "path": cookie.path,
        "secure": cookie.secure,
        "httpOnly": cookie.http_only,
    });

    if let Some(expires) = cookie.expires {
        value["expires"] = json!(expires);
    }

    value
}

/// Session cookies carry `expires: -1` (and `session: true`) in CDP
fn stored_from_json(value: &Value) -> Option<StoredCookie> {
    let name = value.get("name")?.as_str()?.to_string();
    let domain = value.get("domain")?.as_str()?.to_string();

    let session = value.get("session").and_then(Value::as_bool).unwrap_or(false);
    let expires = value
        .get("expires")
        .and_then(Value::as_f64)
        .filter(|e| !session && *e > 0.0);

    Some(StoredCookie {
        name,
        value: value
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        domain,
        path: value
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or("/")
            .to_string(),
        expires,
        http_only: value.get("httpOnly").and_then(Value::as_bool).unwrap_or(false),
        secure: value.get("secure").and_then(Value::as_bool).unwrap_or(false),
    })
}
