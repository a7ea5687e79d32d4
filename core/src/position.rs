//! Global log position used for optimistic concurrency control.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an event in the global event log.
///
/// Positions start at 1 for the first appended event and increase by one for
/// every event after it, across all tags and types. [`Position::INITIAL`] (0)
/// stands for "nothing observed yet": the log head of an empty store.
///
/// A position returned by a `source` call is the marker a later append is
/// conditioned on:
///
/// - When appending, you pass the position observed while sourcing
/// - If an event matching the same criteria was appended after it, the append fails
/// - This prevents lost updates between concurrent commands that share a boundary
///
/// # Examples
///
/// ```
/// use cinema_core::position::Position;
///
/// let p0 = Position::INITIAL;
/// let p1 = p0.next();
/// assert_eq!(p1, Position::new(1));
/// assert!(p1 > p0);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(u64);

impl Position {
    /// The position of an empty log.
    pub const INITIAL: Self = Self(0);

    /// Create a position with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw sequence number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The position right after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Position {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
