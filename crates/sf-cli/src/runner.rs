//! Download run: browser setup, discovery, download

use std::path::Path;

use serde::Serialize;
use sf_browser::{
    BrowserConfig, BrowserSession, CarouselFeed, FeedPage, ProfileTarget, interactive_login,
};
use sf_core::{
    ContentSource, Config, CookieJar, DiscoveryLoop, DiscoveryOutcome, DownloadReport,
    ImageDownloader,
};
use tokio::task::block_in_place;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::Args;

/// What a run produced
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub username: String,
    pub discovery: DiscoveryOutcome,
    /// Files written; `None` for a dry run
    pub downloaded: Option<usize>,
}

impl RunSummary {
    /// A run counts as successful if it produced anything
    pub fn success(&self) -> bool {
        match self.downloaded {
            Some(n) => n > 0,
            None => !self.discovery.items.is_empty(),
        }
    }
}

/// Resolve configuration: file/env first, then command-line flags
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    Ok(config)
}

/// Delete the saved cookie jar
pub fn clear_cookies(config: &Config) -> anyhow::Result<()> {
    let jar = CookieJar::from_settings(&config.cookies);
    jar.clear()
        .map_err(|e| anyhow::anyhow!("Failed to clear cookies: {}", e))?;

    info!("Cleared saved cookies at {}", jar.path().display());
    Ok(())
}

/// Fail if the run was interrupted
fn ensure_active(cancel: &CancellationToken) -> anyhow::Result<()> {
    if cancel.is_cancelled() {
        anyhow::bail!("Interrupted before discovery started");
    }
    Ok(())
}

pub async fn run(
    args: &Args,
    config: Config,
    cancel: CancellationToken,
) -> anyhow::Result<RunSummary> {
    let target = args
        .target()
        .ok_or_else(|| anyhow::anyhow!("Either --username or --url is required"))?;
    let target = ProfileTarget::parse(target)?;

    info!("Target: {} ({})", target.username, target.url);
    info!(
        "Count: {}, headless: {}, cookies: {}, carousel: {}",
        config.discovery.target_count,
        config.browser.headless,
        if config.cookies.enabled { "enabled" } else { "disabled" },
        config.carousel.enabled
    );

    let jar = config
        .cookies
        .enabled
        .then(|| CookieJar::from_settings(&config.cookies));

    // headless_chrome は同期 API のため、ブラウザ操作は block_in_place で実行
    let session = block_in_place(|| -> anyhow::Result<BrowserSession> {
        ensure_active(&cancel)?;
        let session = BrowserSession::with_config(BrowserConfig::from(&config.browser))?;
        prepare_session(&session, &config, jar.as_ref(), args.login, &cancel)?;
        ensure_active(&cancel)?;
        session.open_profile(&target.url)?;
        Ok(session)
    })?;

    let mut feed: Box<dyn ContentSource> = if config.carousel.enabled {
        Box::new(CarouselFeed::from_session(&session, &config.browser, &config.carousel)?)
    } else {
        Box::new(FeedPage::from_session(&session, &config.browser)?)
    };

    let discovery = DiscoveryLoop::new(
        config.discovery.to_discovery_config(),
        config.filter.to_item_filter(),
    )
    .run(feed.as_mut(), &cancel)
    .await?;

    if discovery.items.len() < config.discovery.target_count {
        warn!(
            "Only found {} of {} requested images ({})",
            discovery.items.len(),
            config.discovery.target_count,
            discovery.stop_reason
        );
    }
    info!("Skipped {} thumbnail/profile images", discovery.excluded.len());

    // ダウンロード前にブラウザを閉じる
    drop(feed);
    drop(session);

    if args.dry_run {
        return Ok(RunSummary {
            username: target.username,
            discovery,
            downloaded: None,
        });
    }

    let prefix = file_prefix(&target.username, config.carousel.enabled);
    let report = download(&config, &target.username, &prefix, &discovery.items, &cancel).await?;

    Ok(RunSummary {
        username: target.username,
        discovery,
        downloaded: Some(report.downloaded()),
    })
}

/// Install saved cookies, logging in interactively when needed.
///
/// A login happens when requested explicitly, or when no valid cookies
/// exist and the browser window is visible.
fn prepare_session(
    session: &BrowserSession,
    config: &Config,
    jar: Option<&CookieJar>,
    force_login: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut cookies_loaded = false;

    if let Some(jar) = jar {
        match jar.load() {
            Ok(Some(loaded)) => {
                session.set_cookies(&loaded.cookies)?;
                cookies_loaded = true;
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable cookie file: {}", e),
        }
    }

    let needs_login =
        force_login || (jar.is_some() && !cookies_loaded && !config.browser.headless);

    if needs_login {
        interactive_login(session, &config.browser, jar, cancel)?;
        info!("Login completed, proceeding");
    } else if cookies_loaded {
        info!("Using saved cookies, skipping login");
    } else {
        warn!("No saved session; continuing without login");
    }

    Ok(())
}

/// File name prefix; carousel runs are kept apart from grid runs
fn file_prefix(username: &str, carousel: bool) -> String {
    if carousel {
        format!("{}_carousel", username)
    } else {
        username.to_string()
    }
}

async fn download(
    config: &Config,
    username: &str,
    prefix: &str,
    urls: &[String],
    cancel: &CancellationToken,
) -> anyhow::Result<DownloadReport> {
    if urls.is_empty() {
        warn!("No images found; the site may be blocking access");
        return Ok(DownloadReport::default());
    }

    let downloader =
        ImageDownloader::new(config.download.clone(), config.browser.user_agent.as_deref())?;
    let dest = Path::new(&config.download.output_dir).join(username);

    let report = downloader.download_all(urls, &dest, prefix, cancel).await?;

    for (url, reason) in &report.failed {
        warn!("Not saved: {} ({})", url, reason);
    }
    info!(
        "Downloaded {} images to {}",
        report.downloaded(),
        dest.display()
    );

    Ok(report)
}
