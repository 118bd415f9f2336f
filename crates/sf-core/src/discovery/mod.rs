//! Incremental content discovery
//!
//! Drives a lazily-loaded [`ContentSource`] by alternating `reveal()` and
//! `harvest()` until one of the stop conditions in [`StopReason`] holds.

mod engine;
mod filter;
mod source;
mod types;

pub use engine::{DiscoveryLoop, discover};
pub use filter::ItemFilter;
pub use source::{ContentSource, SourceError};
pub use types::{
    DiscoveryConfig, DiscoveryError, DiscoveryOutcome, HarvestedItem, ItemTag, StopReason,
};
