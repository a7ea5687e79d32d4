//! Event store trait and related types for criteria-based event sourcing.
//!
//! This module defines the one shared resource of the write side: an
//! append-only log that can be queried by [`EventCriteria`] and appended to
//! under an optimistic [`AppendCondition`].
//!
//! # Design
//!
//! The trait is deliberately minimal. It provides exactly what a decision
//! cycle needs:
//!
//! - Source every event matching a criteria, together with the log position
//!   observed by that same read
//! - Append new events, atomically, provided nothing matching the same
//!   criteria was appended after the observed position
//!
//! Because the condition is scoped by criteria rather than by a single stream,
//! two commands whose boundaries do not overlap never conflict, even though
//! they write to the same log.
//!
//! # Implementations
//!
//! - `PostgresEventStore` (in `cinema-postgres` crate): Production implementation
//! - `InMemoryEventStore` (in `cinema-testing` crate): Fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use cinema_core::criteria::EventCriteria;
//! use cinema_core::event::SerializedEvent;
//! use cinema_core::event_store::{AppendCondition, EventStore, EventStoreError};
//! use cinema_core::tag::Tag;
//!
//! async fn example(store: &dyn EventStore, new_events: Vec<SerializedEvent>) -> Result<(), EventStoreError> {
//!     let criteria = EventCriteria::having_tag(Tag::new("seatId", "1:1"))
//!         .and_being_one_of_types(["SeatPlaced", "SeatBlocked"]);
//!
//!     let sourced = store.source(criteria.clone()).await?;
//!
//!     // ... fold sourced.events and decide ...
//!
//!     store
//!         .append(new_events, Some(AppendCondition::new(criteria, sourced.position)))
//!         .await?;
//!     Ok(())
//! }
//! ```

use crate::criteria::EventCriteria;
use crate::event::{SerializedEvent, StoredEvent};
use crate::position::Position;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: an event matching the append
    /// condition was written after the position the caller observed.
    ///
    /// The caller is expected to source again and re-decide.
    #[error("Concurrency conflict: expected no matching events after position {expected}, found one at {actual}")]
    ConcurrencyConflict {
        /// The position the caller observed when sourcing.
        expected: Position,
        /// Position of the first conflicting event.
        actual: Position,
    },

    /// The backing store failed or is unreachable.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error inside the store.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EventStoreError {
    /// Whether this error is an optimistic concurrency conflict, which is
    /// recoverable by sourcing again.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Guard evaluated atomically with an append.
///
/// The append commits only if the log holds no event matching
/// `fail_if_events_match` at a position after `after`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendCondition {
    /// Criteria of the consistency boundary the decision was made on.
    pub fail_if_events_match: EventCriteria,
    /// Log position observed while sourcing.
    pub after: Position,
}

impl AppendCondition {
    /// Create a new append condition.
    #[must_use]
    pub const fn new(fail_if_events_match: EventCriteria, after: Position) -> Self {
        Self {
            fail_if_events_match,
            after,
        }
    }
}

/// Result of a `source` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourcedEvents {
    /// Matching events in log order (ascending position).
    pub events: Vec<StoredEvent>,
    /// Log head observed by the same read. Use it as
    /// [`AppendCondition::after`].
    pub position: Position,
}

/// Event store abstraction: criteria-based sourcing and conditional append.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a single store is shared by every
/// command execution running in parallel.
///
/// # Dyn Compatibility
///
/// This trait returns boxed futures instead of using `async fn` so it can be
/// used as `Arc<dyn EventStore>`.
pub trait EventStore: Send + Sync {
    /// Load every event matching `criteria`, in log order, plus the log head.
    ///
    /// An empty result is not an error; a boundary nobody has written to yet
    /// simply folds to the initial state.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: the store is unavailable or the query failed
    fn source(&self, criteria: EventCriteria) -> BoxFuture<'_, Result<SourcedEvents, EventStoreError>>;

    /// Append `events` atomically, optionally guarded by `condition`.
    ///
    /// Events receive consecutive positions in the order given. Returns the
    /// position of the last appended event (or the current head if `events`
    /// is empty).
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the condition failed; nothing was written
    /// - `DatabaseError`: the store is unavailable or the write failed; nothing was written
    fn append(
        &self,
        events: Vec<SerializedEvent>,
        condition: Option<AppendCondition>,
    ) -> BoxFuture<'_, Result<Position, EventStoreError>>;
}
