//! Command orchestrator: the decide/evolve/resolve/append cycle.
//!
//! ```text
//!   command
//!      │ boundary + resolve
//!      ▼
//!   criteria ──source──▶ events, position ──fold──▶ state ──decide──▶ new events
//!                  ▲                                                     │
//!                  │          conflict (retry with backoff)              │
//!                  └──────────── append(new events, criteria, position) ◀┘
//! ```
//!
//! Every execution keeps its state on the stack of one task. Many executions
//! may run in parallel against the same store; the conditional append is the
//! only synchronisation point. Dropping the future before the append leaves
//! no trace, and the append itself is atomic.

use crate::error::{CommandError, ExecutionError};
use crate::metrics::{CommandMetrics, CommandOutcome, EventStoreMetrics};
use crate::result::CommandResult;
use crate::retry::RetryPolicy;
use cinema_core::criteria::EventCriteria;
use cinema_core::decider::Decider;
use cinema_core::event::DomainEvent;
use cinema_core::event_store::{AppendCondition, EventStore};
use cinema_core::position::Position;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// The outcome of an accepted command.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision<E> {
    /// Events appended (empty for a no-op).
    pub events: Vec<E>,
    /// Position of the last appended event, or the observed log head for a no-op.
    pub position: Position,
    /// Attempts it took, the first one included.
    pub attempts: usize,
}

/// Executes commands of one [`Decider`] against an [`EventStore`].
///
/// # Example
///
/// ```ignore
/// let handler = CommandHandler::new(BlockSeatsDecider, Arc::new(InMemoryEventStore::new()))
///     .with_retry_policy(RetryPolicy::no_backoff(3));
///
/// let result = handler.execute(command).await?;
/// assert!(result.is_success());
/// ```
pub struct CommandHandler<D: Decider> {
    decider: D,
    event_store: Arc<dyn EventStore>,
    retry_policy: RetryPolicy,
}

impl<D: Decider> CommandHandler<D> {
    /// Create a handler with the default retry policy.
    #[must_use]
    pub fn new(decider: D, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            decider,
            event_store,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Submit a command and map the outcome onto the submission boundary.
    ///
    /// Business rejections (from `resolve` or `decide`) and recorded failure
    /// events come back as `Ok(CommandResult::Failure(..))`. A no-op command
    /// is `Ok(CommandResult::Success { appended: 0 })`.
    ///
    /// # Errors
    ///
    /// - `ExecutionError::RetriesExhausted`: every attempt conflicted
    /// - `ExecutionError::StoreUnavailable`: the event store failed
    /// - `ExecutionError::Encoding`: an event could not be encoded or decoded
    pub async fn execute(&self, command: D::Command) -> Result<CommandResult, ExecutionError> {
        let result = match self.handle(command).await {
            Ok(decision) => Ok(CommandResult::from_events(&decision.events)),
            Err(CommandError::Rejected(rejection)) => Ok(CommandResult::Failure(rejection.to_string())),
            Err(CommandError::RetriesExhausted { attempts }) => {
                Err(ExecutionError::RetriesExhausted { attempts })
            }
            Err(CommandError::Store(e)) => Err(ExecutionError::StoreUnavailable(e)),
            Err(CommandError::Encoding(e)) => Err(ExecutionError::Encoding(e)),
        };

        match &result {
            Ok(outcome) => tracing::info!(command = self.decider.name(), %outcome, "Command processed"),
            Err(error) => tracing::error!(command = self.decider.name(), %error, "Command failed"),
        }

        result
    }

    /// Run the full cycle for one command.
    ///
    /// # Errors
    ///
    /// - `CommandError::Rejected`: a business rule refused the command; nothing was appended
    /// - `CommandError::RetriesExhausted`: every attempt hit a concurrency conflict
    /// - `CommandError::Store`: the event store failed
    /// - `CommandError::Encoding`: an event could not be encoded or decoded
    pub async fn handle(
        &self,
        command: D::Command,
    ) -> Result<Decision<D::Event>, CommandError<D::Rejection>> {
        let name = self.decider.name();
        let boundary = self.decider.boundary(&command);
        let span = tracing::info_span!("command", command = name, boundary = ?boundary);

        let started = Instant::now();
        let result = self.run(&command, &boundary).instrument(span).await;

        let outcome = match &result {
            Ok(_) => CommandOutcome::Accepted,
            Err(CommandError::Rejected(_)) => CommandOutcome::Rejected,
            Err(CommandError::RetriesExhausted { .. }) => CommandOutcome::Exhausted,
            Err(_) => CommandOutcome::Failed,
        };
        CommandMetrics::record_execution(name, outcome, started.elapsed());

        result
    }

    async fn run(
        &self,
        command: &D::Command,
        boundary: &D::BoundaryId,
    ) -> Result<Decision<D::Event>, CommandError<D::Rejection>> {
        let criteria = self
            .decider
            .resolve(boundary)
            .map_err(CommandError::Rejected)?;
        tracing::debug!(%criteria, tags = criteria.referenced_tags().len(), "Consistency boundary resolved");

        let max_attempts = self.retry_policy.attempts();

        for attempt in 1..=max_attempts {
            let (state, position) = self.load(&criteria).await?;

            let events = self
                .decider
                .decide(command, &state)
                .map_err(CommandError::Rejected)?;

            if events.is_empty() {
                tracing::debug!(attempt, %position, "Command is a no-op, nothing to append");
                return Ok(Decision {
                    events,
                    position,
                    attempts: attempt,
                });
            }

            let serialized = events
                .iter()
                .map(DomainEvent::encode)
                .collect::<Result<Vec<_>, _>>()?;
            let count = serialized.len();
            let condition = AppendCondition::new(criteria.clone(), position);

            let append_started = Instant::now();
            match self.event_store.append(serialized, Some(condition)).await {
                Ok(last) => {
                    EventStoreMetrics::record_append(count, append_started.elapsed());
                    tracing::debug!(attempt, appended = count, position = %last, "Events appended");
                    return Ok(Decision {
                        events,
                        position: last,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_conflict() => {
                    CommandMetrics::record_conflict(self.decider.name());
                    if attempt < max_attempts {
                        let delay = self.retry_policy.backoff(attempt);
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Boundary changed since it was sourced, retrying..."
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::warn!(attempt, error = %e, "Boundary changed since it was sourced");
                    }
                }
                Err(e) => return Err(CommandError::Store(e)),
            }
        }

        tracing::error!(attempts = max_attempts, "Command failed after max attempts");
        CommandMetrics::record_exhausted(self.decider.name());
        Err(CommandError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Source the boundary and fold it, in log order.
    async fn load(
        &self,
        criteria: &EventCriteria,
    ) -> Result<(D::State, Position), CommandError<D::Rejection>> {
        let started = Instant::now();
        let sourced = self
            .event_store
            .source(criteria.clone())
            .await
            .map_err(CommandError::Store)?;
        EventStoreMetrics::record_source(sourced.events.len(), started.elapsed());

        let mut state = D::State::default();
        for stored in &sourced.events {
            match D::Event::decode(&stored.event)? {
                Some(event) => state = self.decider.evolve(state, &event),
                None => tracing::debug!(
                    event_type = %stored.event.event_type,
                    position = %stored.position,
                    "Skipping unknown event type"
                ),
            }
        }

        tracing::debug!(
            events = sourced.events.len(),
            position = %sourced.position,
            "Boundary sourced"
        );
        Ok((state, sourced.position))
    }
}
