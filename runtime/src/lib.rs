//! # Cinema Runtime
//!
//! Runtime implementation of the criteria-based write side.
//!
//! This crate provides the command orchestrator that sequences the pure
//! functions of a [`Decider`](cinema_core::Decider) around the event store.
//!
//! ## Core Components
//!
//! - **`CommandHandler`**: resolve → source → fold → decide → conditional append,
//!   re-running the cycle on a concurrency conflict
//! - **`RetryPolicy`**: bounded attempts with exponential backoff
//! - **`CommandResult`**: the `Success` / `Failure(message)` submission result
//! - **Metrics**: Prometheus counters and histograms
//!
//! ## Example
//!
//! ```ignore
//! use cinema_runtime::{CommandHandler, RetryPolicy};
//!
//! let handler = CommandHandler::new(BlockSeatsDecider, event_store)
//!     .with_retry_policy(RetryPolicy::default());
//!
//! match handler.execute(command).await? {
//!     CommandResult::Success { appended } => tracing::info!(appended, "seats blocked"),
//!     CommandResult::Failure(message) => tracing::info!(%message, "command rejected"),
//! }
//! ```

/// Retry policy for conflicting appends
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Command orchestrator
pub mod handler;

/// Result reported at the command submission boundary
pub mod result;

/// Error types for command execution
pub mod error {
    use cinema_core::event::EventError;
    use cinema_core::event_store::EventStoreError;
    use thiserror::Error;

    /// Everything that can stop a command execution.
    ///
    /// `R` is the decider's rejection type. Only [`CommandError::Rejected`] is a
    /// business outcome; every other variant is an infrastructure problem.
    #[derive(Error, Debug)]
    pub enum CommandError<R> {
        /// A business rule rejected the command. Nothing was appended.
        #[error(transparent)]
        Rejected(R),

        /// Every attempt ended in a concurrency conflict.
        #[error("Command gave up after {attempts} conflicting attempts")]
        RetriesExhausted {
            /// Attempts made, the first one included.
            attempts: usize,
        },

        /// The event store failed for a reason other than a conflict.
        #[error("Event store failure: {0}")]
        Store(EventStoreError),

        /// An event could not be encoded or decoded.
        #[error("Event codec failure: {0}")]
        Encoding(#[from] EventError),
    }

    /// Non-business failure reported at the command submission boundary.
    ///
    /// Callers can tell "retry the command later" (these) apart from "fix the
    /// input" (a [`CommandResult::Failure`](crate::result::CommandResult::Failure)).
    #[derive(Error, Debug)]
    pub enum ExecutionError {
        /// Every attempt ended in a concurrency conflict.
        #[error("Command gave up after {attempts} conflicting attempts")]
        RetriesExhausted {
            /// Attempts made, the first one included.
            attempts: usize,
        },

        /// The event store is unavailable or failed.
        #[error("Event store failure: {0}")]
        StoreUnavailable(EventStoreError),

        /// An event could not be encoded or decoded.
        #[error("Event codec failure: {0}")]
        Encoding(EventError),
    }

    impl ExecutionError {
        /// Whether resubmitting the same command later may succeed.
        #[must_use]
        pub const fn is_transient(&self) -> bool {
            matches!(self, Self::RetriesExhausted { .. } | Self::StoreUnavailable(_))
        }
    }
}

pub use error::{CommandError, ExecutionError};
pub use handler::{CommandHandler, Decision};
pub use result::CommandResult;
pub use retry::RetryPolicy;
