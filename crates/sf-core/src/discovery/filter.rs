//! Exclusion predicate for harvested items

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::types::{HarvestedItem, ItemTag};

type Predicate = Arc<dyn Fn(&HarvestedItem) -> bool + Send + Sync>;

/// Decides which harvested items are excluded from the result set.
///
/// An item is excluded when any of these hold:
/// - `require_any` is non-empty and the key contains none of its substrings
/// - the key contains any `exclude_any` substring
/// - the item's tag is in `excluded_tags`
/// - a custom predicate returns `true`
#[derive(Clone)]
pub struct ItemFilter {
    require_any: Vec<String>,
    exclude_any: Vec<String>,
    excluded_tags: HashSet<ItemTag>,
    predicate: Option<Predicate>,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            require_any: Vec::new(),
            exclude_any: Vec::new(),
            excluded_tags: [ItemTag::Thumbnail, ItemTag::ProfilePicture]
                .into_iter()
                .collect(),
            predicate: None,
        }
    }
}

impl fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemFilter")
            .field("require_any", &self.require_any)
            .field("exclude_any", &self.exclude_any)
            .field("excluded_tags", &self.excluded_tags)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl ItemFilter {
    /// Filter that accepts everything
    pub fn accept_all() -> Self {
        Self {
            excluded_tags: HashSet::new(),
            ..Default::default()
        }
    }

    pub fn require_any<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_any = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_any<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_any = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = ItemTag>,
    {
        self.excluded_tags = tags.into_iter().collect();
        self
    }

    /// Add a custom exclusion predicate (`true` means excluded)
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&HarvestedItem) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether the item must be kept out of the result set
    pub fn is_excluded(&self, item: &HarvestedItem) -> bool {
        if item.key.is_empty() {
            return true;
        }

        if !self.require_any.is_empty()
            && !self.require_any.iter().any(|p| item.key.contains(p.as_str()))
        {
            return true;
        }

        if self.exclude_any.iter().any(|p| item.key.contains(p.as_str())) {
            return true;
        }

        if let Some(tag) = item.tag {
            if self.excluded_tags.contains(&tag) {
                return true;
            }
        }

        self.predicate.as_ref().is_some_and(|p| p(item))
    }
}
