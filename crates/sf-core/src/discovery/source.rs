//! Content source abstraction

use async_trait::async_trait;
use thiserror::Error;

use super::types::HarvestedItem;

/// Failure reported by a single reveal or harvest call.
///
/// The discovery loop treats these as transient: one failure costs an
/// attempt, not the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn timeout(operation: &str, millis: u128) -> Self {
        Self(format!("{} timed out after {}ms", operation, millis))
    }
}

/// A paginated or lazily-loaded feed.
#[async_trait]
pub trait ContentSource: Send {
    /// Advance the revealed extent of the source.
    ///
    /// May be a no-op once the source is exhausted.
    async fn reveal(&mut self) -> Result<(), SourceError>;

    /// Read every currently visible item without mutating the source.
    async fn harvest(&mut self) -> Result<Vec<HarvestedItem>, SourceError>;
}
