//! Carousel mode
//!
//! The profile grid only shows the first image of a multi-image post.
//! [`CarouselFeed`] scrolls the grid the same way [`FeedPage`](crate::FeedPage)
//! does, but each harvest opens queued posts in a second tab and clicks
//! through their slides. Images come back flattened in first-seen order.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::Tab;
use serde_json::Value;
use sf_core::{BrowserSettings, CarouselSettings, ContentSource, HarvestedItem, SourceError};
use tracing::{debug, info, warn};
use url::Url;

use crate::blocking::SerialBlocking;
use crate::error::{BrowserError, Result};
use crate::feed::{ScrollStrategy, harvest_script, parse_harvest};
use crate::session::{BrowserSession, evaluate};

/// Post URLs waiting to be opened, each queued at most once
#[derive(Debug, Default)]
struct PostQueue {
    queued: VecDeque<String>,
    known: HashSet<String>,
}

impl PostQueue {
    /// Queue unseen links, returning how many were new
    fn extend(&mut self, links: impl IntoIterator<Item = String>) -> usize {
        let mut added = 0;
        for link in links {
            if self.known.insert(link.clone()) {
                self.queued.push_back(link);
                added += 1;
            }
        }
        added
    }

    fn take(&mut self, n: usize) -> Vec<String> {
        let n = n.min(self.queued.len());
        self.queued.drain(..n).collect()
    }

    fn len(&self) -> usize {
        self.queued.len()
    }
}

/// Blocking work done in the post tab
#[derive(Clone)]
struct PostExpander {
    tab: Arc<Tab>,
    images_script: String,
    next_script: String,
    min_full_width: u32,
    max_slides: u32,
    post_load: Duration,
    slide_delay: Duration,
}

impl PostExpander {
    /// Expand every post, skipping ones that fail. Errors only if all fail.
    fn expand_all(&self, posts: &[String]) -> Result<Vec<HarvestedItem>> {
        let mut items = Vec::new();
        let mut last_error = None;

        for url in posts {
            match self.expand(url) {
                Ok(found) => {
                    info!("Post {}: {} images", url, found.len());
                    items.extend(found);
                }
                Err(e) => {
                    warn!("Skipping post {}: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if items.is_empty() => Err(e),
            _ => Ok(items),
        }
    }

    fn expand(&self, url: &str) -> Result<Vec<HarvestedItem>> {
        debug!("Opening post: {}", url);

        self.tab.navigate_to(url).map_err(|e| {
            BrowserError::Navigation(format!("Failed to navigate to {}: {}", url, e))
        })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::Navigation(format!("Navigation timeout: {}", e)))?;
        std::thread::sleep(self.post_load);

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        self.collect(&mut items, &mut seen)?;

        for slide in 0..self.max_slides {
            let clicked = evaluate(&self.tab, &self.next_script)?
                .as_bool()
                .unwrap_or(false);
            if !clicked {
                debug!("No next button after {} slides", slide);
                break;
            }

            std::thread::sleep(self.slide_delay);
            self.collect(&mut items, &mut seen)?;
        }

        Ok(items)
    }

    fn collect(&self, items: &mut Vec<HarvestedItem>, seen: &mut HashSet<String>) -> Result<()> {
        let value = evaluate(&self.tab, &self.images_script)?;
        let found = parse_harvest(&value, self.min_full_width)?;
        merge_new(items, seen, found);
        Ok(())
    }
}

/// Profile grid whose posts are opened and expanded slide by slide
pub struct CarouselFeed {
    grid: Arc<Tab>,
    lane: SerialBlocking,
    expander: PostExpander,
    links_script: String,
    posts_per_harvest: usize,
    queue: PostQueue,
    reveals: u32,
}

impl CarouselFeed {
    /// `grid` shows the profile; `post` is a separate tab used to open posts
    pub fn new(
        grid: Arc<Tab>,
        post: Arc<Tab>,
        settings: &CarouselSettings,
        min_full_width: u32,
    ) -> Self {
        Self {
            grid,
            lane: SerialBlocking::default(),
            expander: PostExpander {
                tab: post,
                images_script: harvest_script(&settings.image_selectors),
                next_script: next_script(&settings.next_button_selector),
                min_full_width,
                max_slides: settings.max_slides,
                post_load: Duration::from_millis(settings.post_load_ms),
                slide_delay: Duration::from_millis(settings.slide_delay_ms),
            },
            links_script: links_script(&settings.post_link_selector),
            posts_per_harvest: settings.posts_per_harvest.max(1),
            queue: PostQueue::default(),
            reveals: 0,
        }
    }

    /// Carousel feed over the session's active tab plus a fresh post tab
    pub fn from_session(
        session: &BrowserSession,
        browser: &BrowserSettings,
        settings: &CarouselSettings,
    ) -> Result<Self> {
        Ok(Self::new(
            session.active_tab()?,
            session.new_tab()?,
            settings,
            browser.min_full_width,
        ))
    }

    async fn grid_script(&mut self, script: String) -> std::result::Result<Value, SourceError> {
        let tab = Arc::clone(&self.grid);

        self.lane
            .run(move || evaluate(&tab, &script))
            .await
            .and_then(|result| result)
            .map_err(SourceError::from)
    }
}

#[async_trait]
impl ContentSource for CarouselFeed {
    async fn reveal(&mut self) -> std::result::Result<(), SourceError> {
        let strategy = ScrollStrategy::for_reveal(self.reveals);
        self.reveals += 1;

        debug!("Reveal {} using {:?}", self.reveals, strategy);
        self.grid_script(strategy.script().to_string()).await?;
        Ok(())
    }

    async fn harvest(&mut self) -> std::result::Result<Vec<HarvestedItem>, SourceError> {
        let script = self.links_script.clone();
        let value = self.grid_script(script).await?;
        let added = self
            .queue
            .extend(parse_links(&value).map_err(SourceError::from)?);

        let batch = self.queue.take(self.posts_per_harvest);
        debug!(
            "{} new posts on grid, opening {}, {} still queued",
            added,
            batch.len(),
            self.queue.len()
        );

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let expander = self.expander.clone();
        self.lane
            .run(move || expander.expand_all(&batch))
            .await
            .and_then(|result| result)
            .map_err(SourceError::from)
    }
}

/// Append items not already in `seen`, keeping their order
fn merge_new(
    items: &mut Vec<HarvestedItem>,
    seen: &mut HashSet<String>,
    found: Vec<HarvestedItem>,
) {
    for item in found {
        if seen.insert(item.key.clone()) {
            items.push(item);
        }
    }
}

/// Script returning the absolute `href` of every post link as a JSON string
fn links_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"(() => {{
  const out = [];
  let nodes;
  try {{ nodes = document.querySelectorAll({selector}); }} catch (e) {{ return "[]"; }}
  for (const a of nodes) {{
    if (a.href) out.push(a.href);
  }}
  return JSON.stringify(out);
}})()"#
    )
}

/// Script clicking the carousel "next" button; returns whether one was found
fn next_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"(() => {{
  let button;
  try {{ button = document.querySelector({selector}); }} catch (e) {{ return false; }}
  if (!button) return false;
  button.click();
  return true;
}})()"#
    )
}

/// Parse the links script output into canonical post URLs, in order
fn parse_links(value: &Value) -> Result<Vec<String>> {
    let json = value.as_str().ok_or_else(|| {
        BrowserError::Extraction(format!("Links script returned non-string: {}", value))
    })?;

    let hrefs: Vec<String> = serde_json::from_str(json)
        .map_err(|e| BrowserError::Extraction(format!("Invalid links output: {}", e)))?;

    let mut seen = HashSet::new();
    Ok(hrefs
        .iter()
        .filter_map(|href| canonical_post_url(href))
        .filter(|url| seen.insert(url.clone()))
        .collect())
}

/// Drop query and fragment so the same post is only queued once
fn canonical_post_url(href: &str) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sf_core::ItemTag;

    #[test]
    fn test_post_queue_dedups_and_batches() {
        let mut queue = PostQueue::default();

        let added = queue.extend(vec![
            "https://www.instagram.com/p/A/".to_string(),
            "https://www.instagram.com/p/B/".to_string(),
        ]);
        assert_eq!(added, 2);

        assert_eq!(queue.take(1), vec!["https://www.instagram.com/p/A/"]);

        // 開いた投稿も再度キューに入らない
        let added = queue.extend(vec![
            "https://www.instagram.com/p/A/".to_string(),
            "https://www.instagram.com/p/B/".to_string(),
            "https://www.instagram.com/p/C/".to_string(),
        ]);
        assert_eq!(added, 1);
        assert_eq!(queue.len(), 2);

        assert_eq!(
            queue.take(5),
            vec![
                "https://www.instagram.com/p/B/",
                "https://www.instagram.com/p/C/"
            ]
        );
        assert!(queue.take(1).is_empty());
    }

    #[test]
    fn test_parse_links() {
        let output = json!(
            r#"[
                "https://www.instagram.com/p/A/?img_index=1",
                "https://www.instagram.com/p/A/",
                "https://www.instagram.com/p/B/#comments",
                "javascript:void(0)",
                "not a url"
            ]"#
        );

        let links = parse_links(&output).unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.instagram.com/p/A/",
                "https://www.instagram.com/p/B/"
            ]
        );
    }

    #[test]
    fn test_parse_links_rejects_non_string() {
        assert!(matches!(
            parse_links(&Value::Bool(true)),
            Err(BrowserError::Extraction(_))
        ));
    }

    #[test]
    fn test_merge_new_keeps_first_seen_order() {
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        merge_new(
            &mut items,
            &mut seen,
            vec![
                HarvestedItem::tagged("a.jpg", ItemTag::FullSize),
                HarvestedItem::tagged("b.jpg", ItemTag::FullSize),
            ],
        );
        merge_new(
            &mut items,
            &mut seen,
            vec![
                HarvestedItem::tagged("b.jpg", ItemTag::FullSize),
                HarvestedItem::tagged("c.jpg", ItemTag::FullSize),
            ],
        );

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_scripts_embed_selectors() {
        let script = links_script("a[href*=\"/p/\"]");
        assert!(script.contains(r#"document.querySelectorAll("a[href*=\"/p/\"]")"#));

        let script = next_script("button[aria-label*=\"Next\"]");
        assert!(script.contains(r#"document.querySelector("button[aria-label*=\"Next\"]")"#));
        assert!(script.contains("button.click()"));
    }
}
