//! # Cinema Testing
//!
//! Testing utilities and helpers for criteria-based event sourcing.
//!
//! This crate provides:
//! - An in-memory, criteria-aware event store with conditional append
//! - Store wrappers injecting conflicts, outages and concurrent writers
//! - A fixed clock for deterministic commands
//! - A fluent given/when/then harness for any [`Decider`](cinema_core::Decider)
//!
//! ## Example
//!
//! ```ignore
//! use cinema_testing::DecisionTest;
//!
//! DecisionTest::new(BlockSeatsDecider)
//!     .given([scheduled, placed_1_1])
//!     .when(block_1_1)
//!     .then_events(vec![blocked_1_1])
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use cinema_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use cinema_core::criteria::EventCriteria;
    use cinema_core::event::{SerializedEvent, StoredEvent};
    use cinema_core::event_store::{AppendCondition, EventStore, EventStoreError, SourcedEvents};
    use cinema_core::position::Position;
    use futures::future::BoxFuture;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use cinema_testing::mocks::FixedClock;
    /// use cinema_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory event store.
    ///
    /// Keeps the whole log in a `Vec` behind a `RwLock`. `source` filters by
    /// criteria under the read lock and reports the head it saw; `append`
    /// evaluates the condition and writes under the write lock, so both are
    /// atomic with respect to each other, like a real store.
    #[derive(Debug, Default)]
    pub struct InMemoryEventStore {
        log: RwLock<Vec<StoredEvent>>,
    }

    impl InMemoryEventStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Append events without any condition. Returns the new head.
        pub async fn seed(&self, events: Vec<SerializedEvent>) -> Position {
            let mut log = self.log.write().await;
            write(&mut log, events)
        }

        /// Snapshot of the whole log.
        pub async fn all_events(&self) -> Vec<StoredEvent> {
            self.log.read().await.clone()
        }

        /// Current log head.
        pub async fn head(&self) -> Position {
            head(&self.log.read().await)
        }
    }

    fn head(log: &[StoredEvent]) -> Position {
        log.last().map_or(Position::INITIAL, |e| e.position)
    }

    fn write(log: &mut Vec<StoredEvent>, events: Vec<SerializedEvent>) -> Position {
        let mut position = head(log);
        let recorded_at = Utc::now();
        for event in events {
            position = position.next();
            log.push(StoredEvent {
                position,
                event,
                recorded_at,
            });
        }
        position
    }

    fn first_conflict(log: &[StoredEvent], condition: &AppendCondition) -> Option<Position> {
        log.iter()
            .filter(|stored| stored.position > condition.after)
            .find(|stored| {
                condition
                    .fail_if_events_match
                    .matches(&stored.event.event_type, &stored.event.tags)
            })
            .map(|stored| stored.position)
    }

    impl EventStore for InMemoryEventStore {
        fn source(&self, criteria: EventCriteria) -> BoxFuture<'_, Result<SourcedEvents, EventStoreError>> {
            Box::pin(async move {
                let log = self.log.read().await;
                let events = log
                    .iter()
                    .filter(|stored| criteria.matches(&stored.event.event_type, &stored.event.tags))
                    .cloned()
                    .collect();
                Ok(SourcedEvents {
                    events,
                    position: head(&log),
                })
            })
        }

        fn append(
            &self,
            events: Vec<SerializedEvent>,
            condition: Option<AppendCondition>,
        ) -> BoxFuture<'_, Result<Position, EventStoreError>> {
            Box::pin(async move {
                let mut log = self.log.write().await;
                if let Some(condition) = &condition {
                    if let Some(actual) = first_conflict(&log, condition) {
                        return Err(EventStoreError::ConcurrencyConflict {
                            expected: condition.after,
                            actual,
                        });
                    }
                }
                Ok(write(&mut log, events))
            })
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fault {
        Conflicts,
        Unavailable,
    }

    /// Event store wrapper that injects failures.
    ///
    /// - [`FlakyEventStore::conflicting`]: the first `n` appends report a
    ///   concurrency conflict without writing anything
    /// - [`FlakyEventStore::unavailable`]: every call fails with a database error
    #[derive(Debug)]
    pub struct FlakyEventStore<S> {
        inner: S,
        fault: Fault,
        remaining: AtomicUsize,
        appends: AtomicUsize,
    }

    impl<S: EventStore> FlakyEventStore<S> {
        /// Conflict on the first `conflicts` appends, then delegate.
        #[must_use]
        pub const fn conflicting(inner: S, conflicts: usize) -> Self {
            Self {
                inner,
                fault: Fault::Conflicts,
                remaining: AtomicUsize::new(conflicts),
                appends: AtomicUsize::new(0),
            }
        }

        /// Fail every call as if the database were down.
        #[must_use]
        pub const fn unavailable(inner: S) -> Self {
            Self {
                inner,
                fault: Fault::Unavailable,
                remaining: AtomicUsize::new(0),
                appends: AtomicUsize::new(0),
            }
        }

        /// The wrapped store.
        pub const fn inner(&self) -> &S {
            &self.inner
        }

        /// Number of append calls received, failed ones included.
        pub fn append_calls(&self) -> usize {
            self.appends.load(Ordering::SeqCst)
        }

        fn outage() -> EventStoreError {
            EventStoreError::DatabaseError("connection refused".to_string())
        }
    }

    impl<S: EventStore> EventStore for FlakyEventStore<S> {
        fn source(&self, criteria: EventCriteria) -> BoxFuture<'_, Result<SourcedEvents, EventStoreError>> {
            if self.fault == Fault::Unavailable {
                return Box::pin(async { Err(Self::outage()) });
            }
            self.inner.source(criteria)
        }

        fn append(
            &self,
            events: Vec<SerializedEvent>,
            condition: Option<AppendCondition>,
        ) -> BoxFuture<'_, Result<Position, EventStoreError>> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            match self.fault {
                Fault::Unavailable => Box::pin(async { Err(Self::outage()) }),
                Fault::Conflicts => {
                    let inject = self
                        .remaining
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok();
                    if inject {
                        let expected = condition.map_or(Position::INITIAL, |c| c.after);
                        tracing::debug!(%expected, "Injecting concurrency conflict");
                        Box::pin(async move {
                            Err(EventStoreError::ConcurrencyConflict {
                                expected,
                                actual: expected.next(),
                            })
                        })
                    } else {
                        self.inner.append(events, condition)
                    }
                }
            }
        }
    }

    /// Event store wrapper simulating a concurrent writer.
    ///
    /// The first append it receives is preceded by an unconditional append of
    /// the competitor's events, exactly as if another command had committed
    /// between our `source` and our `append`.
    #[derive(Debug)]
    pub struct InterleavingEventStore<S> {
        inner: S,
        competitor: Mutex<Option<Vec<SerializedEvent>>>,
    }

    impl<S: EventStore> InterleavingEventStore<S> {
        /// Commit `competitor` right before the first append.
        #[must_use]
        pub const fn new(inner: S, competitor: Vec<SerializedEvent>) -> Self {
            Self {
                inner,
                competitor: Mutex::new(Some(competitor)),
            }
        }

        /// The wrapped store.
        pub const fn inner(&self) -> &S {
            &self.inner
        }

        fn take_competitor(&self) -> Option<Vec<SerializedEvent>> {
            self.competitor.lock().ok().and_then(|mut slot| slot.take())
        }
    }

    impl<S: EventStore> EventStore for InterleavingEventStore<S> {
        fn source(&self, criteria: EventCriteria) -> BoxFuture<'_, Result<SourcedEvents, EventStoreError>> {
            self.inner.source(criteria)
        }

        fn append(
            &self,
            events: Vec<SerializedEvent>,
            condition: Option<AppendCondition>,
        ) -> BoxFuture<'_, Result<Position, EventStoreError>> {
            Box::pin(async move {
                if let Some(competitor) = self.take_competitor() {
                    let committed = self.inner.append(competitor, None).await?;
                    tracing::debug!(position = %committed, "Competing writer committed first");
                }
                self.inner.append(events, condition).await
            })
        }
    }
}

/// Install a test subscriber printing `tracing` output, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use decision_test::DecisionTest;
pub use mocks::{FixedClock, FlakyEventStore, InMemoryEventStore, InterleavingEventStore, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
