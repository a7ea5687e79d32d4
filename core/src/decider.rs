//! The pure contract of a write slice.
//!
//! A [`Decider`] bundles the four pure functions of one command type:
//!
//! ```text
//! command ──boundary──▶ BoundaryId ──resolve──▶ EventCriteria
//!                                                   │ (event store: source)
//!                                                   ▼
//!              State ◀──evolve (fold, log order)── events
//!                │
//!                └──decide(command, state)──▶ new events | rejection
//! ```
//!
//! Nothing here performs I/O. The orchestrator in `cinema-runtime` threads the
//! values through the event store; tests can call the functions directly.

use crate::criteria::EventCriteria;
use crate::event::DomainEvent;

/// Pure decision logic for one command type.
///
/// # Determinism
///
/// `decide` must return the same output for the same `(command, state)`.
/// It may not read clocks, random sources or shared mutable state: a retry
/// after a concurrency conflict re-runs it against fresh state and relies on
/// that.
pub trait Decider: Send + Sync {
    /// The command this decider handles.
    type Command: Send + Sync;

    /// Identifier of the per-command consistency boundary.
    type BoundaryId: Send + Sync + std::fmt::Debug;

    /// Transient state rebuilt for every decision.
    type State: Default + Send;

    /// Events folded into the state and produced by decisions.
    type Event: DomainEvent;

    /// Business rule violation.
    type Rejection: std::error::Error + Send + Sync + 'static;

    /// Stable name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Derive the consistency boundary from the command.
    fn boundary(&self, command: &Self::Command) -> Self::BoundaryId;

    /// Turn a boundary into the criteria selecting every decision-relevant event.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the boundary is degenerate (for example, empty)
    /// and would otherwise select nothing or everything.
    fn resolve(&self, boundary: &Self::BoundaryId) -> Result<EventCriteria, Self::Rejection>;

    /// Fold one event into the state. Total: unknown or irrelevant events
    /// leave the state unchanged.
    fn evolve(&self, state: Self::State, event: &Self::Event) -> Self::State;

    /// Validate the command against the state and derive new events.
    ///
    /// `Ok(vec![])` means the command is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first business rule the command violates.
    fn decide(
        &self,
        command: &Self::Command,
        state: &Self::State,
    ) -> Result<Vec<Self::Event>, Self::Rejection>;

    /// Fold `events` into a fresh state in the order given.
    fn fold<'a, I>(&self, events: I) -> Self::State
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        events
            .into_iter()
            .fold(Self::State::default(), |state, event| self.evolve(state, event))
    }
}
