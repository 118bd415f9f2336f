//! Infinite-scroll feed page as a content source
//!
//! `reveal()` scrolls the page, rotating between scroll styles because a
//! single style tends to stop triggering the lazy loader. `harvest()` reads
//! the `src` of every image matched by the configured selectors.

use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::Tab;
use serde::Deserialize;
use serde_json::Value;
use sf_core::{BrowserSettings, ContentSource, HarvestedItem, ItemTag, SourceError};
use tracing::debug;

use crate::blocking::SerialBlocking;
use crate::error::{BrowserError, Result};
use crate::session::{BrowserSession, evaluate};

/// How a single reveal scrolls the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStrategy {
    /// Jump to the bottom of the document
    ToBottom,
    /// Scroll down by one viewport height
    ByViewport,
    /// Jump to just above the bottom so the sentinel re-enters the viewport
    NearBottom,
}

impl ScrollStrategy {
    /// Strategy for the `n`-th reveal (0-based)
    pub fn for_reveal(n: u32) -> Self {
        match n % 3 {
            0 => Self::ToBottom,
            1 => Self::ByViewport,
            _ => Self::NearBottom,
        }
    }

    pub fn script(&self) -> &'static str {
        match self {
            Self::ToBottom => "window.scrollTo(0, document.body.scrollHeight)",
            Self::ByViewport => "window.scrollBy(0, window.innerHeight)",
            Self::NearBottom => "window.scrollTo(0, document.body.scrollHeight - 100)",
        }
    }
}

/// Image record returned by the harvest script
#[derive(Debug, Deserialize)]
struct RawImage {
    src: String,
    #[serde(default)]
    width: u32,
}

/// Browser tab driven as a [`ContentSource`]
pub struct FeedPage {
    tab: Arc<Tab>,
    lane: SerialBlocking,
    harvest_script: String,
    min_full_width: u32,
    reveals: u32,
}

impl FeedPage {
    pub fn new(tab: Arc<Tab>, selectors: &[String], min_full_width: u32) -> Self {
        Self {
            tab,
            lane: SerialBlocking::default(),
            harvest_script: harvest_script(selectors),
            min_full_width,
            reveals: 0,
        }
    }

    /// Feed over the session's active tab
    pub fn from_session(session: &BrowserSession, settings: &BrowserSettings) -> Result<Self> {
        Ok(Self::new(
            session.active_tab()?,
            &settings.image_selectors,
            settings.min_full_width,
        ))
    }

    /// Run a script on the tab without blocking the async runtime.
    ///
    /// Scripts never overlap, even when an earlier call was abandoned.
    async fn run_script(&mut self, script: String) -> std::result::Result<Value, SourceError> {
        let tab = Arc::clone(&self.tab);

        self.lane
            .run(move || evaluate(&tab, &script))
            .await
            .and_then(|result| result)
            .map_err(SourceError::from)
    }
}

#[async_trait]
impl ContentSource for FeedPage {
    async fn reveal(&mut self) -> std::result::Result<(), SourceError> {
        let strategy = ScrollStrategy::for_reveal(self.reveals);
        self.reveals += 1;

        debug!("Reveal {} using {:?}", self.reveals, strategy);
        self.run_script(strategy.script().to_string()).await?;
        Ok(())
    }

    async fn harvest(&mut self) -> std::result::Result<Vec<HarvestedItem>, SourceError> {
        let script = self.harvest_script.clone();
        let value = self.run_script(script).await?;
        let items = parse_harvest(&value, self.min_full_width).map_err(SourceError::from)?;

        debug!("Harvested {} visible images", items.len());
        Ok(items)
    }
}

/// Script collecting `{src, width}` of matched images, in DOM order per selector.
///
/// The result is returned as a JSON string so it survives `evaluate`
/// without `returnByValue`.
pub(crate) fn harvest_script(selectors: &[String]) -> String {
    let selectors = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"(() => {{
  const selectors = {selectors};
  const seen = new Set();
  const out = [];
  for (const sel of selectors) {{
    let nodes;
    try {{ nodes = document.querySelectorAll(sel); }} catch (e) {{ continue; }}
    for (const node of nodes) {{
      const img = node.tagName === 'IMG' ? node : node.querySelector('img');
      if (!img) continue;
      const src = img.currentSrc || img.src;
      if (!src || seen.has(src)) continue;
      seen.add(src);
      out.push({{ src: src, width: img.naturalWidth || 0 }});
    }}
  }}
  return JSON.stringify(out);
}})()"#
    )
}

/// Turn the harvest script's output into tagged items.
///
/// Images that have not decoded yet are left out so they are classified
/// by size on a later harvest instead of being accepted untagged.
pub(crate) fn parse_harvest(value: &Value, min_full_width: u32) -> Result<Vec<HarvestedItem>> {
    let json = value.as_str().ok_or_else(|| {
        BrowserError::Extraction(format!("Harvest script returned non-string: {}", value))
    })?;

    let images: Vec<RawImage> = serde_json::from_str(json)
        .map_err(|e| BrowserError::Extraction(format!("Invalid harvest output: {}", e)))?;

    let total = images.len();
    let items: Vec<HarvestedItem> = images
        .into_iter()
        .filter_map(|img| {
            let tag = classify(&img, min_full_width)?;
            Some(HarvestedItem::tagged(img.src, tag))
        })
        .collect();

    if items.len() < total {
        debug!("{} images not decoded yet", total - items.len());
    }

    Ok(items)
}

/// `None` while the image has not decoded (natural width 0)
fn classify(img: &RawImage, min_full_width: u32) -> Option<ItemTag> {
    if img.src.contains("profile_pic") {
        Some(ItemTag::ProfilePicture)
    } else if img.width == 0 {
        None
    } else if img.width < min_full_width {
        Some(ItemTag::Thumbnail)
    } else {
        Some(ItemTag::FullSize)
    }
}
