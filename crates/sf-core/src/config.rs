//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. コマンドライン引数 (sf-cli 側で上書き)
//! 2. 環境変数 (`SCROLLFEED_*`)
//! 3. scrollfeed.toml 設定ファイル
//! 4. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::discovery::{DiscoveryConfig, ItemFilter, ItemTag};
use crate::{Error, Result};

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "scrollfeed.toml";

/// Discovery loop tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoverySettings {
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_stagnation_limit")]
    pub stagnation_limit: u32,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Wait between scroll and harvest (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Per-call timeout (seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_attempts: default_max_attempts(),
            stagnation_limit: default_stagnation_limit(),
            max_consecutive_failures: default_max_consecutive_failures(),
            settle_ms: default_settle_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl DiscoverySettings {
    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::builder()
            .target_count(self.target_count)
            .max_attempts(self.max_attempts)
            .stagnation_limit(self.stagnation_limit)
            .max_consecutive_failures(self.max_consecutive_failures)
            .settle_delay(Duration::from_millis(self.settle_ms))
            .call_timeout(Duration::from_secs(self.call_timeout_secs))
            .build()
    }
}

/// Item filter patterns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterConfig {
    /// A key must contain one of these (empty = no requirement)
    #[serde(default = "default_require_any")]
    pub require_any: Vec<String>,
    /// Keys containing any of these are skipped
    #[serde(default = "default_exclude_any")]
    pub exclude_any: Vec<String>,
    /// Skip items tagged as thumbnails or profile pictures
    #[serde(default = "default_true")]
    pub exclude_thumbnails: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            require_any: default_require_any(),
            exclude_any: default_exclude_any(),
            exclude_thumbnails: true,
        }
    }
}

impl FilterConfig {
    pub fn to_item_filter(&self) -> ItemFilter {
        let tags = if self.exclude_thumbnails {
            vec![ItemTag::Thumbnail, ItemTag::ProfilePicture]
        } else {
            Vec::new()
        };

        ItemFilter::default()
            .require_any(self.require_any.iter().cloned())
            .exclude_any(self.exclude_any.iter().cloned())
            .exclude_tags(tags)
    }
}

/// Browser launch and page settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// CSS selectors whose `img` elements are harvested
    #[serde(default = "default_image_selectors")]
    pub image_selectors: Vec<String>,
    /// Images narrower than this (natural width, px) are tagged as thumbnails
    #[serde(default = "default_min_full_width")]
    pub min_full_width: u32,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Selector that appears once the user is logged in
    #[serde(default = "default_logged_in_selector")]
    pub logged_in_selector: String,
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            width: default_width(),
            height: default_height(),
            user_agent: default_user_agent(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            image_selectors: default_image_selectors(),
            min_full_width: default_min_full_width(),
            login_url: default_login_url(),
            logged_in_selector: default_logged_in_selector(),
            login_timeout_secs: default_login_timeout_secs(),
        }
    }
}

/// Image download settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Pause between consecutive downloads (milliseconds)
    #[serde(default = "default_download_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            delay_ms: default_download_delay_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Cookie persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default = "default_cookie_ttl_days")]
    pub ttl_days: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cookie_path(),
            ttl_days: default_cookie_ttl_days(),
        }
    }
}

/// Carousel mode: open each post and step through its slides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarouselSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Links to individual posts on the profile grid
    #[serde(default = "default_post_link_selector")]
    pub post_link_selector: String,
    #[serde(default = "default_next_button_selector")]
    pub next_button_selector: String,
    /// Selectors for images inside an opened post
    #[serde(default = "default_post_image_selectors")]
    pub image_selectors: Vec<String>,
    /// Upper bound on "next" clicks per post
    #[serde(default = "default_max_slides")]
    pub max_slides: u32,
    /// Posts opened per harvest
    #[serde(default = "default_posts_per_harvest")]
    pub posts_per_harvest: usize,
    /// Wait after opening a post (milliseconds)
    #[serde(default = "default_post_load_ms")]
    pub post_load_ms: u64,
    /// Wait after each "next" click (milliseconds)
    #[serde(default = "default_slide_delay_ms")]
    pub slide_delay_ms: u64,
}

impl Default for CarouselSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            post_link_selector: default_post_link_selector(),
            next_button_selector: default_next_button_selector(),
            image_selectors: default_post_image_selectors(),
            max_slides: default_max_slides(),
            posts_per_harvest: default_posts_per_harvest(),
            post_load_ms: default_post_load_ms(),
            slide_delay_ms: default_slide_delay_ms(),
        }
    }
}

/// Main configuration for scrollfeed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub cookies: CookieSettings,
    #[serde(default)]
    pub carousel: CarouselSettings,
}

fn default_true() -> bool {
    true
}

fn default_target_count() -> usize {
    50
}

fn default_max_attempts() -> u32 {
    40
}

fn default_stagnation_limit() -> u32 {
    6
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_require_any() -> Vec<String> {
    ["instagram", "cdninstagram", "fbcdn", "scontent"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_any() -> Vec<String> {
    ["profile_pic", "150x150", "320x320", "s150x150", "s320x320"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_width() -> u32 {
    1366
}

fn default_height() -> u32 {
    768
}

fn default_user_agent() -> Option<String> {
    Some(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .to_string(),
    )
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_image_selectors() -> Vec<String> {
    [
        "a[href*=\"/p/\"] img",
        "article img",
        "div[role=\"button\"] img",
        "a[role=\"link\"] img",
        "img[src*=\"cdninstagram\"]",
        "img[src*=\"fbcdn\"]",
        "img[src*=\"scontent\"]",
        "img[loading=\"lazy\"]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_full_width() -> u32 {
    400
}

fn default_login_url() -> String {
    "https://www.instagram.com/accounts/login/".to_string()
}

fn default_logged_in_selector() -> String {
    "svg[aria-label=\"Home\"], nav[role=\"navigation\"]".to_string()
}

fn default_login_timeout_secs() -> u64 {
    300
}

fn default_output_dir() -> String {
    "downloads".to_string()
}

fn default_download_delay_ms() -> u64 {
    1500
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_post_link_selector() -> String {
    "a[href*=\"/p/\"]".to_string()
}

fn default_next_button_selector() -> String {
    "button[aria-label*=\"Next\"], div[role=\"button\"][aria-label*=\"Next\"]".to_string()
}

fn default_post_image_selectors() -> Vec<String> {
    [
        "article img[src*=\"instagram\"]",
        "img[src*=\"cdninstagram\"]",
        "img[src*=\"scontent\"]",
        "div[role=\"button\"] img",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_slides() -> u32 {
    10
}

fn default_posts_per_harvest() -> usize {
    1
}

fn default_post_load_ms() -> u64 {
    3000
}

fn default_slide_delay_ms() -> u64 {
    1500
}

fn default_cookie_path() -> String {
    "scrollfeed_cookies.json".to_string()
}

fn default_cookie_ttl_days() -> i64 {
    30
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 文字列から設定を読み込む (環境変数の上書きなし)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 既存の環境変数で上書きされます (環境変数が優先)。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// デフォルト値 + 環境変数
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// 設定を読み込む
    ///
    /// `path` が指定されていればそのファイル、なければ
    /// `./scrollfeed.toml` を試し、見つからない場合は環境変数のみ。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Check that the discovery settings can drive a run
    pub fn validate(&self) -> Result<()> {
        self.discovery.to_discovery_config().validate()?;
        if self.cookies.ttl_days <= 0 {
            return Err(Error::Config("cookies.ttl_days must be positive".to_string()));
        }
        if self.carousel.enabled && self.carousel.posts_per_harvest == 0 {
            return Err(Error::Config(
                "carousel.posts_per_harvest must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        Config {
            discovery: toml.discovery.unwrap_or_default(),
            filter: toml.filter.unwrap_or_default(),
            browser: toml.browser.unwrap_or_default(),
            download: toml.download.unwrap_or_default(),
            cookies: toml.cookies.unwrap_or_default(),
            carousel: toml.carousel.unwrap_or_default(),
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// `lookup` から得た値で設定を上書きする
    ///
    /// 解析できない値は警告を出して無視します。
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(count) = parse_var(&lookup, "SCROLLFEED_TARGET_COUNT") {
            self.discovery.target_count = count;
        }
        if let Some(attempts) = parse_var(&lookup, "SCROLLFEED_MAX_ATTEMPTS") {
            self.discovery.max_attempts = attempts;
        }
        if let Some(limit) = parse_var(&lookup, "SCROLLFEED_STAGNATION_LIMIT") {
            self.discovery.stagnation_limit = limit;
        }
        if let Some(ms) = parse_var(&lookup, "SCROLLFEED_SETTLE_MS") {
            self.discovery.settle_ms = ms;
        }

        if let Some(dir) = lookup("SCROLLFEED_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.download.output_dir = dir;
        }

        if let Some(path) = lookup("SCROLLFEED_COOKIE_FILE").filter(|v| !v.is_empty()) {
            self.cookies.path = path;
        }

        if let Some(headless) = parse_var(&lookup, "SCROLLFEED_HEADLESS") {
            self.browser.headless = headless;
        }

        if let Some(carousel) = parse_var(&lookup, "SCROLLFEED_CAROUSEL") {
            self.carousel.enabled = carousel;
        }

        if let Some(ua) = lookup("SCROLLFEED_USER_AGENT").filter(|v| !v.is_empty()) {
            self.browser.user_agent = Some(ua);
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let value = raw.trim();

    match value.to_lowercase().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}: cannot parse {:?}", name, value);
            None
        }
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize)]
struct TomlConfig {
    discovery: Option<DiscoverySettings>,
    filter: Option<FilterConfig>,
    browser: Option<BrowserSettings>,
    download: Option<DownloadConfig>,
    cookies: Option<CookieSettings>,
    carousel: Option<CarouselSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_settings_default() {
        let settings = DiscoverySettings::default();
        assert_eq!(settings.target_count, 50);
        assert_eq!(settings.stagnation_limit, 6);

        let config = settings.to_discovery_config();
        assert_eq!(config.settle_delay, Duration::from_millis(2000));
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_config_default() {
        let filter = FilterConfig::default().to_item_filter();
        assert!(filter.is_excluded(&crate::HarvestedItem::new(
            "https://scontent.cdninstagram.com/v/s150x150/a.jpg"
        )));
        assert!(!filter.is_excluded(&crate::HarvestedItem::new(
            "https://scontent.cdninstagram.com/v/1080x1080/a.jpg"
        )));
        assert!(filter.is_excluded(&crate::HarvestedItem::new("https://example.com/a.jpg")));
    }

    #[test]
    fn test_filter_config_keeps_thumbnails() {
        let filter = FilterConfig {
            exclude_thumbnails: false,
            require_any: vec![],
            exclude_any: vec![],
        }
        .to_item_filter();
        assert!(!filter.is_excluded(&crate::HarvestedItem::tagged("a.jpg", ItemTag::Thumbnail)));
    }

    #[test]
    fn test_cookie_settings_default() {
        let settings = CookieSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.path, "scrollfeed_cookies.json");
        assert_eq!(settings.ttl_days, 30);
    }

    #[test]
    fn test_expand_env_vars() {
        // テスト用環境変数を設定
        unsafe {
            std::env::set_var("SCROLLFEED_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${SCROLLFEED_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        // 存在しない環境変数
        let result = Config::expand_env_vars("prefix_${SCROLLFEED_NONEXISTENT}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("SCROLLFEED_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("$HOME"), "$HOME");
    }

    #[test]
    fn test_expand_env_vars_empty_name() {
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[discovery]
target_count = 120
max_attempts = 60
stagnation_limit = 4
settle_ms = 500

[filter]
require_any = ["cdn.example.com"]
exclude_any = ["avatar"]

[browser]
headless = false
image_selectors = ["main img"]
min_full_width = 640

[download]
output_dir = "/tmp/out"
delay_ms = 0

[cookies]
enabled = false
path = "/tmp/cookies.json"
ttl_days = 7
"#;

        let config = Config::from_toml_str(toml_content).unwrap();

        assert_eq!(config.discovery.target_count, 120);
        assert_eq!(config.discovery.max_attempts, 60);
        assert_eq!(config.discovery.stagnation_limit, 4);
        assert_eq!(config.discovery.settle_ms, 500);
        // 未指定のキーはデフォルト値
        assert_eq!(config.discovery.max_consecutive_failures, 5);

        assert_eq!(config.filter.require_any, vec!["cdn.example.com"]);
        assert_eq!(config.filter.exclude_any, vec!["avatar"]);
        assert!(config.filter.exclude_thumbnails);

        assert!(!config.browser.headless);
        assert_eq!(config.browser.image_selectors, vec!["main img"]);
        assert_eq!(config.browser.min_full_width, 640);
        assert_eq!(config.browser.width, 1366);

        assert_eq!(config.download.output_dir, "/tmp/out");
        assert_eq!(config.download.delay_ms, 0);
        assert_eq!(config.download.max_retries, 3);

        assert!(!config.cookies.enabled);
        assert_eq!(config.cookies.path, "/tmp/cookies.json");
        assert_eq!(config.cookies.ttl_days, 7);
    }

    #[test]
    fn test_toml_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_invalid() {
        let err = Config::from_toml_str("[discovery\ntarget_count = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_file_with_env_expansion() {
        unsafe {
            std::env::set_var("SCROLLFEED_TEST_OUT", "/data/images");
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scrollfeed.toml");
        std::fs::write(&path, "[download]\noutput_dir = \"${SCROLLFEED_TEST_OUT}\"\n").unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.download.output_dir, "/data/images");

        unsafe {
            std::env::remove_var("SCROLLFEED_TEST_OUT");
        }
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.discovery.stagnation_limit = 0;
        assert!(matches!(config.validate(), Err(Error::Discovery(_))));

        let mut config = Config::default();
        config.cookies.ttl_days = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = Config::from_toml_str(
            r#"
[discovery]
target_count = 120
stagnation_limit = 4

[browser]
headless = true

[download]
output_dir = "/from/file"
"#,
        )
        .unwrap();

        config.apply_overrides(vars(&[
            ("SCROLLFEED_TARGET_COUNT", "7"),
            ("SCROLLFEED_HEADLESS", "FALSE"),
            ("SCROLLFEED_OUTPUT_DIR", "/from/env"),
            ("SCROLLFEED_COOKIE_FILE", "/tmp/jar.json"),
            ("SCROLLFEED_CAROUSEL", "true"),
            ("SCROLLFEED_USER_AGENT", "UA/2.0"),
        ]));

        assert_eq!(config.discovery.target_count, 7);
        // 環境変数にないキーはファイルの値のまま
        assert_eq!(config.discovery.stagnation_limit, 4);
        assert!(!config.browser.headless);
        assert_eq!(config.download.output_dir, "/from/env");
        assert_eq!(config.cookies.path, "/tmp/jar.json");
        assert!(config.carousel.enabled);
        assert_eq!(config.browser.user_agent.as_deref(), Some("UA/2.0"));
    }

    #[test]
    fn test_env_overrides_ignore_invalid_values() {
        let mut config = Config::default();

        config.apply_overrides(vars(&[
            ("SCROLLFEED_TARGET_COUNT", "abc"),
            ("SCROLLFEED_MAX_ATTEMPTS", "-3"),
            ("SCROLLFEED_HEADLESS", "maybe"),
            ("SCROLLFEED_OUTPUT_DIR", ""),
            ("SCROLLFEED_SETTLE_MS", " 250 "),
        ]));

        assert_eq!(config.discovery.target_count, 50);
        assert_eq!(config.discovery.max_attempts, 40);
        assert!(config.browser.headless);
        assert_eq!(config.download.output_dir, "downloads");
        assert_eq!(config.discovery.settle_ms, 250);
    }

    #[test]
    fn test_carousel_section() {
        let config = Config::from_toml_str(
            "[carousel]\nenabled = true\nmax_slides = 4\nposts_per_harvest = 2\n",
        )
        .unwrap();

        assert!(config.carousel.enabled);
        assert_eq!(config.carousel.max_slides, 4);
        assert_eq!(config.carousel.posts_per_harvest, 2);
        assert_eq!(config.carousel.post_link_selector, "a[href*=\"/p/\"]");
        assert!(config.validate().is_ok());

        let mut config = config;
        config.carousel.posts_per_harvest = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        assert!(!CarouselSettings::default().enabled);
    }
}
