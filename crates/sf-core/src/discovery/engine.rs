//! Bounded reveal/harvest loop

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::filter::ItemFilter;
use super::source::{ContentSource, SourceError};
use super::types::{DiscoveryConfig, DiscoveryError, DiscoveryOutcome, HarvestedItem, StopReason};

/// Result of one reveal/harvest pair
enum Attempt {
    Harvested(Vec<HarvestedItem>),
    Failed(SourceError),
    Cancelled,
}

/// Per-run bookkeeping. Created by [`DiscoveryLoop::run`] and dropped when it returns.
#[derive(Default)]
struct DiscoveryState {
    /// Accepted and excluded keys
    seen: HashSet<String>,
    accepted: Vec<String>,
    excluded: Vec<String>,
    stagnant: u32,
    attempts: u32,
    failed_attempts: u32,
    successful_attempts: u32,
    consecutive_failures: u32,
    last_error: Option<SourceError>,
}

impl DiscoveryState {
    /// Take newly visible items, returning how many were accepted
    fn absorb(&mut self, items: Vec<HarvestedItem>, filter: &ItemFilter, target: usize) -> usize {
        let mut accepted = 0;

        for item in items {
            if self.accepted.len() >= target {
                break;
            }
            if self.seen.contains(&item.key) {
                continue;
            }

            self.seen.insert(item.key.clone());
            if filter.is_excluded(&item) {
                self.excluded.push(item.key);
            } else {
                self.accepted.push(item.key);
                accepted += 1;
            }
        }

        accepted
    }

    fn finish(self, stop_reason: StopReason) -> Result<DiscoveryOutcome, DiscoveryError> {
        if self.successful_attempts == 0 && stop_reason != StopReason::Cancelled {
            return Err(DiscoveryError::SourceUnavailable {
                attempts: self.attempts,
                last_error: self
                    .last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }

        Ok(DiscoveryOutcome {
            items: self.accepted,
            excluded: self.excluded,
            stop_reason,
            attempts: self.attempts,
            failed_attempts: self.failed_attempts,
        })
    }
}

/// Incremental content discovery loop
#[derive(Debug, Clone, Default)]
pub struct DiscoveryLoop {
    config: DiscoveryConfig,
    filter: ItemFilter,
}

impl DiscoveryLoop {
    pub fn new(config: DiscoveryConfig, filter: ItemFilter) -> Self {
        Self { config, filter }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Drive `source` until the target is met, progress stalls, attempts run
    /// out, the source keeps failing, or `cancel` fires.
    pub async fn run<S>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryOutcome, DiscoveryError>
    where
        S: ContentSource + ?Sized,
    {
        self.config.validate()?;

        info!(
            "Starting discovery (target: {}, max attempts: {}, stagnation limit: {})",
            self.config.target_count, self.config.max_attempts, self.config.stagnation_limit
        );

        let mut state = DiscoveryState::default();

        loop {
            if cancel.is_cancelled() {
                info!("Discovery cancelled after {} attempts", state.attempts);
                return state.finish(StopReason::Cancelled);
            }

            state.attempts += 1;

            let new_items = match self.attempt(source, cancel).await {
                Attempt::Harvested(items) => {
                    state.successful_attempts += 1;
                    state.consecutive_failures = 0;
                    state.absorb(items, &self.filter, self.config.target_count)
                }
                Attempt::Failed(e) => {
                    warn!("Discovery attempt {} failed: {}", state.attempts, e);
                    state.failed_attempts += 1;
                    state.consecutive_failures += 1;
                    state.last_error = Some(e);
                    0
                }
                Attempt::Cancelled => {
                    info!("Discovery cancelled during attempt {}", state.attempts);
                    return state.finish(StopReason::Cancelled);
                }
            };

            if new_items == 0 {
                state.stagnant += 1;
            } else {
                state.stagnant = 0;
            }

            debug!(
                "Attempt {}/{}: {} new, {} accepted, {} excluded, stagnant {}",
                state.attempts,
                self.config.max_attempts,
                new_items,
                state.accepted.len(),
                state.excluded.len(),
                state.stagnant
            );

            if let Some(reason) = self.stop_reason(&state) {
                info!(
                    "Discovery stopped ({}): {} items after {} attempts",
                    reason,
                    state.accepted.len(),
                    state.attempts
                );
                return state.finish(reason);
            }
        }
    }

    fn stop_reason(&self, state: &DiscoveryState) -> Option<StopReason> {
        if state.accepted.len() >= self.config.target_count {
            Some(StopReason::TargetReached)
        } else if state.stagnant >= self.config.stagnation_limit {
            Some(StopReason::Stagnant)
        } else if state.consecutive_failures >= self.config.max_consecutive_failures {
            Some(StopReason::SourceFailing)
        } else if state.attempts >= self.config.max_attempts {
            Some(StopReason::AttemptsExhausted)
        } else {
            None
        }
    }

    async fn attempt<S>(&self, source: &mut S, cancel: &CancellationToken) -> Attempt
    where
        S: ContentSource + ?Sized,
    {
        let timeout = self.config.call_timeout;

        match tokio::time::timeout(timeout, source.reveal()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Attempt::Failed(e),
            Err(_) => return Attempt::Failed(SourceError::timeout("reveal", timeout.as_millis())),
        }

        if !self.config.settle_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Attempt::Cancelled,
                _ = tokio::time::sleep(self.config.settle_delay) => {}
            }
        }

        match tokio::time::timeout(timeout, source.harvest()).await {
            Ok(Ok(items)) => Attempt::Harvested(items),
            Ok(Err(e)) => Attempt::Failed(e),
            Err(_) => Attempt::Failed(SourceError::timeout("harvest", timeout.as_millis())),
        }
    }
}

/// Run a discovery with default tuning and filter
pub async fn discover<S>(
    source: &mut S,
    target_count: usize,
    max_attempts: u32,
    stagnation_limit: u32,
) -> Result<DiscoveryOutcome, DiscoveryError>
where
    S: ContentSource + ?Sized,
{
    let config = DiscoveryConfig::builder()
        .target_count(target_count)
        .max_attempts(max_attempts)
        .stagnation_limit(stagnation_limit)
        .build();

    DiscoveryLoop::new(config, ItemFilter::default())
        .run(source, &CancellationToken::new())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Clone)]
    enum Step {
        Items(Vec<&'static str>),
        Fail,
    }

    /// Source replaying a harvest script; the last step repeats forever
    struct ScriptedSource {
        steps: Vec<Step>,
        fail_reveal: bool,
        harvest_delay: Option<Duration>,
        cancel_after: Option<(u32, CancellationToken)>,
        reveals: u32,
        harvests: u32,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                fail_reveal: false,
                harvest_delay: None,
                cancel_after: None,
                reveals: 0,
                harvests: 0,
            }
        }
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        async fn reveal(&mut self) -> Result<(), SourceError> {
            self.reveals += 1;
            if self.fail_reveal {
                return Err(SourceError::new("scroll failed"));
            }
            Ok(())
        }

        async fn harvest(&mut self) -> Result<Vec<HarvestedItem>, SourceError> {
            if let Some(delay) = self.harvest_delay {
                tokio::time::sleep(delay).await;
            }

            let index = (self.harvests as usize).min(self.steps.len() - 1);
            self.harvests += 1;

            if let Some((after, token)) = &self.cancel_after {
                if self.harvests >= *after {
                    token.cancel();
                }
            }

            match &self.steps[index] {
                Step::Items(keys) => Ok(keys.iter().map(|k| HarvestedItem::new(*k)).collect()),
                Step::Fail => Err(SourceError::new("page crashed")),
            }
        }
    }

    fn config(target: usize, max_attempts: u32, stagnation: u32) -> DiscoveryConfig {
        DiscoveryConfig::builder()
            .target_count(target)
            .max_attempts(max_attempts)
            .stagnation_limit(stagnation)
            .max_consecutive_failures(100)
            .settle_delay(Duration::ZERO)
            .call_timeout(Duration::from_secs(5))
            .build()
    }

    async fn run(
        config: DiscoveryConfig,
        filter: ItemFilter,
        source: &mut ScriptedSource,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        DiscoveryLoop::new(config, filter)
            .run(source, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_dedup_and_exclusion() {
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a", "b", "a", "thumb_x", "c"]),
            Step::Items(vec!["b", "c", "d", "thumb_y", "thumb_x"]),
            Step::Items(vec![]),
        ]);
        let filter = ItemFilter::accept_all().exclude_any(["thumb"]);

        let outcome = run(config(10, 20, 2), filter, &mut source).await.unwrap();

        assert_eq!(outcome.items, vec!["a", "b", "c", "d"]);
        assert_eq!(outcome.excluded, vec!["thumb_x", "thumb_y"]);
        assert_eq!(outcome.stop_reason, StopReason::Stagnant);
    }

    #[tokio::test]
    async fn test_excluded_items_do_not_count_as_progress() {
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a"]),
            Step::Items(vec!["a", "thumb_1"]),
            Step::Items(vec!["a", "thumb_1", "thumb_2"]),
            Step::Items(vec!["a", "thumb_1", "thumb_2", "thumb_3"]),
        ]);
        let filter = ItemFilter::accept_all().exclude_any(["thumb"]);

        let outcome = run(config(10, 20, 3), filter, &mut source).await.unwrap();

        assert_eq!(outcome.items, vec!["a"]);
        assert_eq!(outcome.stop_reason, StopReason::Stagnant);
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_target_reached_in_one_attempt() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a", "b", "c", "d", "e"])]);

        let outcome = run(config(5, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert!(outcome.target_reached());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(source.reveals, 1);
        assert_eq!(source.harvests, 1);
        assert_eq!(outcome.items.len(), 5);
    }

    #[tokio::test]
    async fn test_overshoot_is_truncated_to_target() {
        let mut source =
            ScriptedSource::new(vec![Step::Items(vec!["a", "b", "c", "d", "e", "f", "g"])]);

        let outcome = run(config(3, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.items, vec!["a", "b", "c"]);
        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    }

    #[tokio::test]
    async fn test_no_new_items_stops_at_stagnation_limit() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec![])]);

        let outcome = run(config(5, 20, 4), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Stagnant);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(source.reveals, 4);
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn test_attempt_cap_applies_before_stagnation_limit() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec![])]);

        let outcome = run(config(5, 3, 10), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::AttemptsExhausted);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(source.reveals, 3);
    }

    #[tokio::test]
    async fn test_attempts_exhausted_with_steady_progress() {
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a"]),
            Step::Items(vec!["a", "b"]),
            Step::Items(vec!["a", "b", "c"]),
        ]);

        let outcome = run(config(10, 2, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::AttemptsExhausted);
        assert_eq!(outcome.items, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_always_failing_source_is_unavailable() {
        let mut source = ScriptedSource::new(vec![Step::Fail]);

        let err = run(config(5, 7, 100), ItemFilter::default(), &mut source)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DiscoveryError::SourceUnavailable {
                attempts: 7,
                last_error: "page crashed".to_string(),
            }
        );
        assert_eq!(source.reveals, 7);
    }

    #[tokio::test]
    async fn test_failing_reveal_is_unavailable_within_max_attempts() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a"])]);
        source.fail_reveal = true;

        let err = run(config(5, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap_err();

        match err {
            DiscoveryError::SourceUnavailable { attempts, last_error } => {
                assert!(attempts <= 20);
                assert_eq!(last_error, "scroll failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(source.harvests, 0);
    }

    #[tokio::test]
    async fn test_two_then_two_then_stagnant() {
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a", "b"]),
            Step::Items(vec!["a", "b", "c", "d"]),
        ]);

        let outcome = run(config(5, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Stagnant);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.items, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_tolerated() {
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a", "b"]),
            Step::Fail,
            Step::Items(vec!["a", "b", "c", "d"]),
        ]);

        let outcome = run(config(4, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_consecutive_failures_abort_after_success() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a"]), Step::Fail]);
        let config = DiscoveryConfig {
            max_consecutive_failures: 3,
            ..config(5, 20, 10)
        };

        let outcome = run(config, ItemFilter::default(), &mut source).await.unwrap();

        assert_eq!(outcome.stop_reason, StopReason::SourceFailing);
        assert_eq!(outcome.items, vec!["a"]);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.failed_attempts, 3);
    }

    #[tokio::test]
    async fn test_slow_harvest_counts_as_failure() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a"])]);
        source.harvest_delay = Some(Duration::from_millis(500));
        let config = DiscoveryConfig {
            call_timeout: Duration::from_millis(20),
            ..config(5, 3, 10)
        };

        let err = run(config, ItemFilter::default(), &mut source)
            .await
            .unwrap_err();

        match err {
            DiscoveryError::SourceUnavailable { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timed out"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_run_returns_partial_results() {
        let token = CancellationToken::new();
        let mut source = ScriptedSource::new(vec![
            Step::Items(vec!["a"]),
            Step::Items(vec!["a", "b"]),
            Step::Items(vec!["a", "b", "c"]),
        ]);
        source.cancel_after = Some((2, token.clone()));

        let outcome = DiscoveryLoop::new(config(10, 20, 5), ItemFilter::default())
            .run(&mut source, &token)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.items, vec!["a", "b"]);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(source.reveals, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a"])]);

        let outcome = DiscoveryLoop::new(config(10, 20, 5), ItemFilter::default())
            .run(&mut source, &token)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(source.reveals, 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_settle_delay() {
        let token = CancellationToken::new();
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a"])]);
        let config = DiscoveryConfig {
            settle_delay: Duration::from_secs(30),
            ..config(10, 20, 5)
        };

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = DiscoveryLoop::new(config, ItemFilter::default())
            .run(&mut source, &token)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(source.harvests, 0);
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec![])]);

        let err = run(config(0, 20, 3), ItemFilter::default(), &mut source)
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::InvalidConfig(_)));
        assert_eq!(source.reveals, 0);
    }

    #[tokio::test]
    async fn test_discover_helper() {
        let mut source = ScriptedSource::new(vec![Step::Items(vec!["a", "b"])]);

        let outcome = discover(&mut source, 2, 5, 3).await.unwrap();

        assert_eq!(outcome.items, vec!["a", "b"]);
        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    }
}
