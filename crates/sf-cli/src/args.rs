//! コマンドライン引数

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use sf_core::Config;

/// Download images from an infinite-scroll profile feed
#[derive(Parser, Debug)]
#[command(
    name = "scrollfeed",
    version,
    after_help = "Examples:\n  scrollfeed --username grapeot --count 100 --show-browser\n  scrollfeed --url https://www.instagram.com/grapeot/ --count 200 --login\n  scrollfeed --username grapeot --carousel\n  scrollfeed --clear-cookies",
    group(ArgGroup::new("target").args(["username", "url"]))
)]
pub struct Args {
    /// Profile username
    #[arg(short, long, required_unless_present_any = ["url", "clear_cookies"])]
    pub username: Option<String>,

    /// Profile URL
    #[arg(long)]
    pub url: Option<String>,

    /// Number of images to download [default: 50]
    #[arg(short, long)]
    pub count: Option<usize>,

    /// Output directory [default: downloads]
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub show_browser: bool,

    /// Log in interactively before scraping
    #[arg(long)]
    pub login: bool,

    /// Do not load or save cookies
    #[arg(long)]
    pub no_cookies: bool,

    /// Delete saved login cookies (then continue if a target is given)
    #[arg(long)]
    pub clear_cookies: bool,

    /// Open each post and collect every image of multi-image posts
    #[arg(long)]
    pub carousel: bool,

    /// Config file (default: ./scrollfeed.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hard cap on scroll attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Stop after this many scrolls without new images
    #[arg(long)]
    pub stagnation_limit: Option<u32>,

    /// Print discovered image URLs as JSON instead of downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Username or URL, whichever was given
    pub fn target(&self) -> Option<&str> {
        self.username.as_deref().or(self.url.as_deref())
    }

    /// コマンドライン引数で設定を上書きする
    pub fn apply(&self, config: &mut Config) {
        if let Some(count) = self.count {
            config.discovery.target_count = count;
        }
        if let Some(attempts) = self.max_attempts {
            config.discovery.max_attempts = attempts;
        }
        if let Some(limit) = self.stagnation_limit {
            config.discovery.stagnation_limit = limit;
        }
        if let Some(ref dir) = self.output_dir {
            config.download.output_dir = dir.clone();
        }
        if self.show_browser || self.login {
            config.browser.headless = false;
        }
        if self.no_cookies {
            config.cookies.enabled = false;
        }
        if self.carousel {
            config.carousel.enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_username() {
        let args = Args::try_parse_from(["scrollfeed", "-u", "grapeot", "-c", "100"]).unwrap();
        assert_eq!(args.target(), Some("grapeot"));
        assert_eq!(args.count, Some(100));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_url() {
        let args = Args::try_parse_from([
            "scrollfeed",
            "--url",
            "https://www.instagram.com/grapeot/",
            "--login",
        ])
        .unwrap();
        assert_eq!(args.target(), Some("https://www.instagram.com/grapeot/"));
        assert!(args.login);
    }

    #[test]
    fn test_target_required() {
        assert!(Args::try_parse_from(["scrollfeed", "-c", "5"]).is_err());
    }

    #[test]
    fn test_clear_cookies_without_target() {
        let args = Args::try_parse_from(["scrollfeed", "--clear-cookies"]).unwrap();
        assert!(args.clear_cookies);
        assert_eq!(args.target(), None);
    }

    #[test]
    fn test_clear_cookies_with_target() {
        let args =
            Args::try_parse_from(["scrollfeed", "--clear-cookies", "-u", "grapeot"]).unwrap();
        assert!(args.clear_cookies);
        assert_eq!(args.target(), Some("grapeot"));
    }

    #[test]
    fn test_url_alone_satisfies_target() {
        let args = Args::try_parse_from(["scrollfeed", "--url", "https://x.com/a/"]).unwrap();
        assert_eq!(args.username, None);
    }

    #[test]
    fn test_username_and_url_conflict() {
        assert!(
            Args::try_parse_from(["scrollfeed", "-u", "a", "--url", "https://x.com/a/"]).is_err()
        );
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::try_parse_from([
            "scrollfeed",
            "-u",
            "grapeot",
            "-c",
            "7",
            "-o",
            "/tmp/out",
            "--max-attempts",
            "9",
            "--stagnation-limit",
            "2",
            "--show-browser",
            "--no-cookies",
            "--carousel",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.discovery.target_count, 7);
        assert_eq!(config.discovery.max_attempts, 9);
        assert_eq!(config.discovery.stagnation_limit, 2);
        assert_eq!(config.download.output_dir, "/tmp/out");
        assert!(!config.browser.headless);
        assert!(!config.cookies.enabled);
        assert!(config.carousel.enabled);
    }

    #[test]
    fn test_apply_keeps_config_when_unset() {
        let args = Args::try_parse_from(["scrollfeed", "-u", "grapeot"]).unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config, Config::default());
    }
}
