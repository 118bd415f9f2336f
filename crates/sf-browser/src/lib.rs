//! sf-browser: headless Chrome feed source for scrollfeed
//!
//! ## Features
//!
//! - Headless Chrome automation via headless_chrome crate
//! - [`FeedPage`]: an infinite-scroll page exposed as a `ContentSource`
//! - [`CarouselFeed`]: opens each post and steps through its slides
//! - Cookie bridge between the on-disk jar and the browser
//! - Interactive login with cookie persistence
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sf_browser::{BrowserConfig, BrowserSession, FeedPage, ProfileTarget};
//! use sf_core::{Config, DiscoveryLoop};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load(None)?;
//! let session = BrowserSession::with_config(BrowserConfig::from(&config.browser))?;
//! let target = ProfileTarget::parse("grapeot")?;
//! session.open_profile(&target.url)?;
//!
//! let mut feed = FeedPage::from_session(&session, &config.browser)?;
//! let outcome = DiscoveryLoop::new(
//!     config.discovery.to_discovery_config(),
//!     config.filter.to_item_filter(),
//! )
//! .run(&mut feed, &CancellationToken::new())
//! .await?;
//! ```

mod blocking;
pub mod carousel;
pub mod cookies;
pub mod error;
pub mod feed;
pub mod login;
pub mod profile;
pub mod session;

pub use carousel::CarouselFeed;
pub use error::{BrowserError, Result};
pub use feed::{FeedPage, ScrollStrategy};
pub use login::interactive_login;
pub use profile::ProfileTarget;
pub use session::{BrowserConfig, BrowserConfigBuilder, BrowserSession};
