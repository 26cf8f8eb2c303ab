// ============================================
// File: crates/fleetmock-server/src/services/scheduler.rs
// ============================================
//! # Distributed Query Scheduler
//!
//! ## Creation Reason
//! Agents poll `/read` continuously. The scheduler decides, per poll,
//! whether to hand out the next configured query or to hold the poll
//! for a while and answer with nothing.
//!
//! ## Main Functionality
//! - `QueryScheduler::poll()`: The `/read` decision, including the wait
//! - `QueryScheduler::try_emit()`: Atomic compare-and-emit step
//! - `QueryScheduler::record_completed_poll()`: Post-wait increment
//!
//! ## Cadence
//! ```text
//! counter + 1 >= skip?  ──yes──► emit query<rotation>, rotation += 1 (mod len),
//!        │                       counter = 0, answer immediately
//!        no
//!        ▼
//! sleep(delay) ──► counter += 1 (saturating at skip) ──► answer {}
//! ```
//! The poll being answered counts toward the threshold: with skip = 5,
//! polls 1-4 are held and poll 5 emits. With an agent that re-polls
//! immediately, emissions are `(skip - 1) × delay` apart plus re-poll
//! latency.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The wait and the increment run in a spawned task: a client that
//!   disconnects mid-wait still advances the counter
//! - Two concurrent polls can never both emit for the same cycle
//! - With no queries configured the emit branch answers `{}` and only
//!   resets the counter
//!
//! ## Last Modified
//! v0.1.0 - Initial scheduler implementation

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use fleetmock_core::protocol::{query_key, ReadResponse};

// ============================================
// CadenceState
// ============================================

/// Mutable cadence state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceState {
    /// Completed empty polls since the last emission.
    pub counter: u32,
    /// Index of the next query to hand out.
    pub rotation_index: usize,
}

// ============================================
// QueryScheduler
// ============================================

/// Hands out distributed queries on a fixed poll cadence.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use fleetmock_server::services::QueryScheduler;
///
/// let scheduler = QueryScheduler::new(vec!["select 1;".into()], 2, Duration::ZERO);
/// assert!(scheduler.try_emit().is_none());
///
/// scheduler.record_completed_poll();
/// let response = scheduler.try_emit().unwrap();
/// assert_eq!(response.queries["query0"], "select 1;");
/// ```
pub struct QueryScheduler {
    queries: Arc<[String]>,
    skip_threshold: u32,
    delay: Duration,
    state: Arc<Mutex<CadenceState>>,
}

impl QueryScheduler {
    /// Creates a scheduler. A `skip_threshold` of 0 is treated as 1.
    #[must_use]
    pub fn new(queries: Vec<String>, skip_threshold: u32, delay: Duration) -> Self {
        let skip_threshold = if skip_threshold == 0 {
            warn!("Skip threshold of 0 clamped to 1");
            1
        } else {
            skip_threshold
        };

        debug!(
            queries = queries.len(),
            skip_threshold,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Query scheduler initialized"
        );

        Self {
            queries: queries.into(),
            skip_threshold,
            delay,
            state: Arc::new(Mutex::new(CadenceState::default())),
        }
    }

    /// Answers one `/read` poll.
    ///
    /// Emits immediately when the cadence is due; otherwise waits `delay`,
    /// records the completed poll and answers with no queries.
    pub async fn poll(&self) -> ReadResponse {
        if let Some(response) = self.try_emit() {
            return response;
        }

        let state = Arc::clone(&self.state);
        let delay = self.delay;
        let threshold = self.skip_threshold;

        let waiter = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::increment(&state, threshold)
        });

        match waiter.await {
            Ok(counter) => debug!(counter, threshold, "Empty poll completed"),
            Err(e) => warn!("Poll wait task failed: {}", e),
        }

        ReadResponse::empty()
    }

    /// Emits the next query if the cadence is due.
    ///
    /// The current poll counts toward the threshold, so this emits once
    /// `skip_threshold - 1` polls have completed. Returns `None` otherwise.
    /// The check, the rotation advance and the counter reset happen under
    /// one lock.
    #[must_use]
    pub fn try_emit(&self) -> Option<ReadResponse> {
        let mut state = self.state.lock();
        if state.counter.saturating_add(1) < self.skip_threshold {
            return None;
        }
        state.counter = 0;

        if self.queries.is_empty() {
            debug!("Cadence due but no queries configured");
            return Some(ReadResponse::empty());
        }

        let index = state.rotation_index % self.queries.len();
        state.rotation_index = (index + 1) % self.queries.len();
        drop(state);

        let key = query_key(index);
        debug!(key = %key, "Emitting distributed query");
        Some(ReadResponse::single(key, self.queries[index].clone()))
    }

    /// Records one completed empty poll. Saturates at the threshold.
    pub fn record_completed_poll(&self) -> u32 {
        Self::increment(&self.state, self.skip_threshold)
    }

    fn increment(state: &Mutex<CadenceState>, threshold: u32) -> u32 {
        let mut state = state.lock();
        state.counter = state.counter.saturating_add(1).min(threshold);
        state.counter
    }

    /// Returns a copy of the current cadence state.
    #[must_use]
    pub fn snapshot(&self) -> CadenceState {
        *self.state.lock()
    }

    /// Returns the configured queries.
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Returns the effective skip threshold.
    #[must_use]
    pub const fn skip_threshold(&self) -> u32 {
        self.skip_threshold
    }

    /// Returns the empty-poll delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl std::fmt::Debug for QueryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryScheduler")
            .field("queries", &self.queries.len())
            .field("skip_threshold", &self.skip_threshold)
            .field("delay", &self.delay)
            .field("state", &self.snapshot())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn two_queries() -> Vec<String> {
        vec!["select * from osquery_info;".into(), "select * from users;".into()]
    }

    async fn emitted_keys(scheduler: &QueryScheduler, polls: usize) -> Vec<(usize, String)> {
        let mut emissions = Vec::new();
        for poll in 1..=polls {
            let response = scheduler.poll().await;
            if !response.is_empty() {
                assert_eq!(response.queries.len(), 1);
                let (key, _) = response.queries.into_iter().next().unwrap();
                emissions.push((poll, key));
            }
        }
        emissions
    }

    #[tokio::test]
    async fn test_fifth_poll_emits_with_skip_five() {
        let scheduler = QueryScheduler::new(two_queries(), 5, Duration::ZERO);

        let first = emitted_keys(&scheduler, 5).await;
        assert_eq!(first, vec![(5, "query0".to_string())]);
        assert_eq!(scheduler.snapshot(), CadenceState { counter: 0, rotation_index: 1 });

        let next = emitted_keys(&scheduler, 10).await;
        assert_eq!(next, vec![(5, "query1".to_string()), (10, "query0".to_string())]);
        assert_eq!(scheduler.snapshot().rotation_index, 1);
    }

    #[tokio::test]
    async fn test_cadence_emits_every_skip_polls() {
        let scheduler = QueryScheduler::new(two_queries(), 5, Duration::ZERO);

        assert_eq!(
            emitted_keys(&scheduler, 15).await,
            vec![
                (5, "query0".to_string()),
                (10, "query1".to_string()),
                (15, "query0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_skip_one_emits_every_poll() {
        let queries = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let scheduler = QueryScheduler::new(queries, 1, Duration::ZERO);
        let mut emitted = Vec::new();

        for _ in 0..4 {
            let response = scheduler.poll().await;
            emitted.extend(response.queries.into_values());
        }

        assert_eq!(emitted, ["a", "b", "c", "a"]);
        assert_eq!(scheduler.snapshot().rotation_index, 1);
    }

    #[tokio::test]
    async fn test_empty_query_list() {
        let scheduler = QueryScheduler::new(Vec::new(), 2, Duration::ZERO);
        for _ in 0..4 {
            assert!(scheduler.poll().await.is_empty());
        }
        assert_eq!(scheduler.snapshot().rotation_index, 0);

        scheduler.record_completed_poll();
        assert_eq!(scheduler.try_emit(), Some(ReadResponse::empty()));
        assert_eq!(scheduler.snapshot().counter, 0);
    }

    #[test]
    fn test_counter_saturates() {
        let scheduler = QueryScheduler::new(two_queries(), 2, Duration::ZERO);
        assert_eq!(scheduler.record_completed_poll(), 1);
        assert_eq!(scheduler.record_completed_poll(), 2);
        assert_eq!(scheduler.record_completed_poll(), 2);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let scheduler = QueryScheduler::new(two_queries(), 0, Duration::ZERO);
        assert_eq!(scheduler.skip_threshold(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_poll_takes_delay() {
        let scheduler = QueryScheduler::new(two_queries(), 5, Duration::from_secs(12));

        let started = Instant::now();
        assert!(scheduler.poll().await.is_empty());
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(12));
        assert!(elapsed < Duration::from_secs(13));
        assert_eq!(scheduler.snapshot().counter, 1);
    }

    /// Four held polls of 12s separate two emissions when skip is 5.
    #[tokio::test(start_paused = true)]
    async fn test_emission_period_with_immediate_repolls() {
        let scheduler = QueryScheduler::new(two_queries(), 5, Duration::from_secs(12));
        let mut emitted_at = Vec::new();

        while emitted_at.len() < 3 {
            if !scheduler.poll().await.is_empty() {
                emitted_at.push(Instant::now());
            }
        }

        for pair in emitted_at.windows(2) {
            let period = pair[1] - pair[0];
            assert!(period >= Duration::from_secs(48));
            assert!(period < Duration::from_secs(49));
        }
    }

    /// Polls that arrive together while a query is due get it exactly once.
    ///
    /// An unsynchronized counter lets every poll that reads it before the
    /// first reset emit the same cycle's query. The check and reset here
    /// share one lock, so the other polls are held and answer `{}`.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_polls_emit_once() {
        let scheduler = Arc::new(QueryScheduler::new(two_queries(), 2, Duration::from_secs(10)));
        scheduler.record_completed_poll();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.poll().await })
            })
            .collect();

        let mut emitted = 0;
        for handle in handles {
            if !handle.await.unwrap().is_empty() {
                emitted += 1;
            }
        }

        assert_eq!(emitted, 1);
        assert_eq!(scheduler.snapshot().rotation_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_poll_still_counts() {
        let scheduler = QueryScheduler::new(two_queries(), 5, Duration::from_secs(10));

        let result = tokio::time::timeout(Duration::from_secs(1), scheduler.poll()).await;
        assert!(result.is_err());
        assert_eq!(scheduler.snapshot().counter, 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(scheduler.snapshot().counter, 1);
    }
}
