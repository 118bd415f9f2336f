//! sf-core: scrollfeed core library
//!
//! Lazily-loaded feeds are drained by alternating a "reveal more" action
//! with a "harvest visible items" action until a target is met or the feed
//! stops producing new content. This crate holds that loop together with
//! the configuration, cookie persistence and image download pieces that
//! the downloader binary wires around it.

pub mod config;
pub mod cookies;
pub mod discovery;
pub mod download;
pub mod error;

pub use config::{
    BrowserSettings, CarouselSettings, Config, CookieSettings, DiscoverySettings, DownloadConfig,
    FilterConfig,
};
pub use cookies::{CookieJar, LoadedCookies, StoredCookie};
pub use discovery::{
    ContentSource, DiscoveryConfig, DiscoveryError, DiscoveryLoop, DiscoveryOutcome,
    HarvestedItem, ItemFilter, ItemTag, SourceError, StopReason, discover,
};
pub use download::{DownloadReport, ImageDownloader};
pub use error::{Error, Result};
