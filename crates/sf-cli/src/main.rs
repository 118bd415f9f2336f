//! scrollfeed: infinite-scroll profile image downloader
//!
//! Usage:
//!   scrollfeed --username <name> [--count N]   - Download images
//!   scrollfeed --url <profile-url> --dry-run   - List discovered image URLs
//!   scrollfeed --clear-cookies                 - Forget the saved login
//!   scrollfeed --help                          - Show help

mod args;
mod runner;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = runner::resolve_config(&args)?;

    if args.clear_cookies {
        runner::clear_cookies(&config)?;
        if args.target().is_none() {
            return Ok(());
        }
    }

    // Ctrl+C でスクロールとダウンロードを中断
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping...");
            signal_token.cancel();
        }
    });

    let summary = runner::run(&args, config, cancel).await?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if let Some(n) = summary.downloaded {
        tracing::info!(
            "Done: {} images for {} ({} scroll attempts, {})",
            n,
            summary.username,
            summary.discovery.attempts,
            summary.discovery.stop_reason
        );
    }

    if !summary.success() {
        std::process::exit(1);
    }

    Ok(())
}
