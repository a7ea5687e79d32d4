//! Result reported at the command submission boundary.
//!
//! A calling layer (HTTP, CLI, message consumer) never receives a business
//! rule violation as an error: it gets a [`CommandResult::Failure`] with a
//! readable message. Infrastructure problems travel separately as
//! [`ExecutionError`](crate::error::ExecutionError).

use cinema_core::event::Event;
use std::fmt;

/// Outcome of a submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The command was accepted. `appended` is zero for a no-op.
    Success {
        /// Number of events appended to the log.
        appended: usize,
    },
    /// The command was refused for a business reason.
    Failure(String),
}

impl CommandResult {
    /// Accepted command result.
    #[must_use]
    pub const fn success(appended: usize) -> Self {
        Self::Success { appended }
    }

    /// Refused command result.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Build the result from the events a decision produced.
    ///
    /// Failure events (events carrying a
    /// [`failure_reason`](Event::failure_reason)) turn the result into a
    /// `Failure` whose message joins their reasons with `", "`.
    #[must_use]
    pub fn from_events<E: Event>(events: &[E]) -> Self {
        let reasons: Vec<&str> = events.iter().filter_map(Event::failure_reason).collect();
        if reasons.is_empty() {
            Self::success(events.len())
        } else {
            Self::Failure(reasons.join(", "))
        }
    }

    /// Whether the command was accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure message, if the command was refused.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failure(message) => Some(message),
            Self::Success { .. } => None,
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { appended } => write!(f, "Success ({appended} events appended)"),
            Self::Failure(message) => write!(f, "Failure: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::tag::Tags;

    struct Noted(Option<&'static str>);

    impl Event for Noted {
        fn event_type(&self) -> &'static str {
            "Noted"
        }

        fn tags(&self) -> Tags {
            Tags::new()
        }

        fn failure_reason(&self) -> Option<&str> {
            self.0
        }
    }

    #[test]
    fn test_regular_events_are_success() {
        let result = CommandResult::from_events(&[Noted(None), Noted(None)]);
        assert_eq!(result, CommandResult::success(2));
        assert!(result.is_success());
    }

    #[test]
    fn test_no_events_is_success_with_nothing_appended() {
        let result = CommandResult::from_events::<Noted>(&[]);
        assert_eq!(result, CommandResult::Success { appended: 0 });
    }

    #[test]
    fn test_failure_events_join_their_reasons() {
        let result = CommandResult::from_events(&[
            Noted(Some("seat 1:1 taken")),
            Noted(None),
            Noted(Some("seat 1:2 taken")),
        ]);

        assert_eq!(result.failure_message(), Some("seat 1:1 taken, seat 1:2 taken"));
        assert!(!result.is_success());
    }

    #[test]
    fn test_display_is_human_readable() {
        assert_eq!(CommandResult::success(3).to_string(), "Success (3 events appended)");
        assert_eq!(CommandResult::failure("nope").to_string(), "Failure: nope");
    }
}
