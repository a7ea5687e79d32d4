//! Application wiring: the enabled write slices over one event store.

use crate::block_seats::{BlockSeats, BlockSeatsDecider};
use crate::config::Config;
use cinema_core::event_store::EventStore;
use cinema_runtime::{CommandHandler, CommandResult, ExecutionError, RetryPolicy};
use std::sync::Arc;
use thiserror::Error;

/// Errors at the command submission boundary.
///
/// Business rule violations are not errors here: they arrive as
/// [`CommandResult::Failure`].
#[derive(Error, Debug)]
pub enum AppError {
    /// The slice handling this command is switched off.
    #[error("The {0} slice is disabled")]
    SliceDisabled(&'static str),

    /// Retries exhausted, store unavailable, or a codec failure.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// The cinema write side.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and commands
/// may be submitted from many tasks at once.
pub struct CinemaApp {
    event_store: Arc<dyn EventStore>,
    block_seats: Option<CommandHandler<BlockSeatsDecider>>,
}

impl CinemaApp {
    /// Wire the slices enabled in `config`.
    #[must_use]
    pub fn new(event_store: Arc<dyn EventStore>, config: &Config) -> Self {
        Self::builder(event_store)
            .retry_policy(config.retry_policy())
            .block_seats_enabled(config.slices.block_seats_enabled)
            .build()
    }

    /// Start a builder with every slice enabled and the default retry policy.
    #[must_use]
    pub fn builder(event_store: Arc<dyn EventStore>) -> CinemaAppBuilder {
        CinemaAppBuilder {
            event_store,
            retry_policy: RetryPolicy::default(),
            block_seats_enabled: true,
        }
    }

    /// The event store the slices write to.
    #[must_use]
    pub const fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.event_store
    }

    /// Submit a [`BlockSeats`] command.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SliceDisabled`] when the slice is off, and
    /// [`AppError::Execution`] for infrastructure faults.
    pub async fn block_seats(&self, command: BlockSeats) -> Result<CommandResult, AppError> {
        let handler = self.block_seats.as_ref().ok_or_else(|| {
            tracing::warn!(screening = %command.screening_id(), "BlockSeats received while the slice is disabled");
            AppError::SliceDisabled("BlockSeats")
        })?;
        Ok(handler.execute(command).await?)
    }
}

/// Builder for [`CinemaApp`].
pub struct CinemaAppBuilder {
    event_store: Arc<dyn EventStore>,
    retry_policy: RetryPolicy,
    block_seats_enabled: bool,
}

impl CinemaAppBuilder {
    /// Retry policy for every slice.
    #[must_use]
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Switch the block-seats slice on or off.
    #[must_use]
    pub const fn block_seats_enabled(mut self, enabled: bool) -> Self {
        self.block_seats_enabled = enabled;
        self
    }

    /// Build the application.
    #[must_use]
    pub fn build(self) -> CinemaApp {
        let block_seats = self.block_seats_enabled.then(|| {
            CommandHandler::new(BlockSeatsDecider, Arc::clone(&self.event_store))
                .with_retry_policy(self.retry_policy.clone())
        });
        tracing::info!(block_seats = block_seats.is_some(), "Cinema write slices wired");
        CinemaApp {
            event_store: self.event_store,
            block_seats,
        }
    }
}
