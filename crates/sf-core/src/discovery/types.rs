//! Discovery data types

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification attached to a harvested item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTag {
    /// Full-resolution content
    FullSize,
    /// Low-resolution grid thumbnail
    Thumbnail,
    /// Avatar / profile picture variant
    ProfilePicture,
}

/// A single visible item reported by `harvest()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedItem {
    /// Stable identity of the item (usually a URL)
    pub key: String,
    /// Optional classification used by the filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<ItemTag>,
}

impl HarvestedItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: None,
        }
    }

    pub fn tagged(key: impl Into<String>, tag: ItemTag) -> Self {
        Self {
            key: key.into(),
            tag: Some(tag),
        }
    }
}

/// Why a discovery run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Accepted set reached `target_count`
    TargetReached,
    /// `stagnation_limit` consecutive attempts produced nothing new
    Stagnant,
    /// `max_attempts` reveal/harvest pairs were spent
    AttemptsExhausted,
    /// Too many consecutive call failures after the source had worked
    SourceFailing,
    /// External cancellation was observed
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TargetReached => "target reached",
            Self::Stagnant => "no new items",
            Self::AttemptsExhausted => "attempts exhausted",
            Self::SourceFailing => "source failing",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result of a completed discovery run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    /// Accepted keys in first-seen order
    pub items: Vec<String>,
    /// Keys rejected by the filter, first-seen order, for diagnostics
    pub excluded: Vec<String>,
    pub stop_reason: StopReason,
    /// Reveal/harvest pairs started
    pub attempts: u32,
    /// Attempts where reveal or harvest failed
    pub failed_attempts: u32,
}

impl DiscoveryOutcome {
    pub fn target_reached(&self) -> bool {
        self.stop_reason == StopReason::TargetReached
    }
}

/// Discovery errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Source unavailable: all {attempts} attempts failed (last error: {last_error})")]
    SourceUnavailable { attempts: u32, last_error: String },

    #[error("Invalid discovery configuration: {0}")]
    InvalidConfig(String),
}

/// Tuning for a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Desired number of accepted items
    pub target_count: usize,
    /// Hard cap on reveal/harvest pairs
    pub max_attempts: u32,
    /// Consecutive no-progress attempts tolerated
    pub stagnation_limit: u32,
    /// Consecutive failed attempts tolerated
    pub max_consecutive_failures: u32,
    /// Wait between reveal and harvest for lazy content to load
    pub settle_delay: Duration,
    /// Upper bound for a single reveal or harvest call
    pub call_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target_count: 50,
            max_attempts: 40,
            stagnation_limit: 6,
            max_consecutive_failures: 5,
            settle_delay: Duration::from_millis(2000),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl DiscoveryConfig {
    /// Create a new configuration builder
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }

    /// Reject zero-valued limits
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.target_count == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "target_count must be positive".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "max_attempts must be positive".to_string(),
            ));
        }
        if self.stagnation_limit == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "stagnation_limit must be positive".to_string(),
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(DiscoveryError::InvalidConfig(
                "max_consecutive_failures must be positive".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(DiscoveryError::InvalidConfig(
                "call_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for DiscoveryConfig
#[derive(Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    pub fn target_count(mut self, count: usize) -> Self {
        self.config.target_count = count;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn stagnation_limit(mut self, limit: u32) -> Self {
        self.config.stagnation_limit = limit;
        self
    }

    pub fn max_consecutive_failures(mut self, limit: u32) -> Self {
        self.config.max_consecutive_failures = limit;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn build(self) -> DiscoveryConfig {
        self.config
    }
}
