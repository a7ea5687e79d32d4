//! # Cinema Core
//!
//! Core traits and types for criteria-based event sourcing.
//!
//! Instead of "one aggregate owns one stream", every command computes its own
//! *consistency boundary*: an [`EventCriteria`](criteria::EventCriteria)
//! expression over event tags and event types. The events selected by that
//! expression are folded into a transient state, a pure decision function
//! validates the command, and the resulting events are appended on the
//! condition that nothing matching the same criteria was written in between.
//!
//! ## Core Concepts
//!
//! - **Tag**: key/value label attached to an event purely for selection
//! - **Event criteria**: AND/OR tree of tag-equality and event-type predicates
//! - **Event store**: `source(criteria)` and conditional `append`
//! - **Decider**: `boundary → resolve → evolve → decide`, all pure
//! - **Environment**: injected dependencies such as the [`Clock`](environment::Clock)
//!
//! ## Example
//!
//! ```
//! use cinema_core::criteria::EventCriteria;
//! use cinema_core::tag::{Tag, Tags};
//!
//! let criteria = EventCriteria::having_tag(Tag::new("seatId", "1:1"))
//!     .and_being_one_of_types(["SeatPlaced", "SeatBlocked"]);
//!
//! let tags = Tags::from([Tag::new("seatId", "1:1"), Tag::new("screeningId", "s-1")]);
//! assert!(criteria.matches("SeatBlocked", &tags));
//! assert!(!criteria.matches("ScreeningScheduled", &tags));
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Event criteria expressions used to select a consistency boundary
pub mod criteria;

/// Decider trait: the pure resolve/evolve/decide contract of a write slice
pub mod decider;

/// Event trait and serialized event records
pub mod event;

/// Event store trait with criteria-based sourcing and conditional append
pub mod event_store;

/// Global log position used for optimistic concurrency
pub mod position;

/// Tags attached to events for stream selection
pub mod tag;

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// into the code that needs them. The decision functions never use them
/// directly: time enters a decision only through the command.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use cinema_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use criteria::EventCriteria;
pub use decider::Decider;
pub use event::{DomainEvent, Event, EventError, SerializedEvent, StoredEvent};
pub use event_store::{AppendCondition, EventStore, EventStoreError, SourcedEvents};
pub use position::Position;
pub use tag::{Tag, Tags};
