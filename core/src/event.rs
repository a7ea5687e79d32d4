//! Event trait and related types for criteria-based event sourcing.
//!
//! Events represent facts about things that have happened in the past and are
//! immutable. Besides its payload every event carries a set of [`Tags`]; the
//! tags are what an [`EventCriteria`](crate::criteria::EventCriteria) selects on.
//!
//! # Design
//!
//! Payloads are serialized with `bincode`: compact, fast, and shared by every
//! Rust service reading the log. Tags and metadata stay JSON so the store can
//! index and query them without understanding payloads.
//!
//! # Example
//!
//! ```
//! use cinema_core::event::Event;
//! use cinema_core::tag::{Tag, Tags};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct SeatPlaced { seat: String }
//!
//! impl Event for SeatPlaced {
//!     fn event_type(&self) -> &'static str { "SeatPlaced" }
//!     fn tags(&self) -> Tags { Tags::from([Tag::new("seatId", self.seat.clone())]) }
//! }
//!
//! let event = SeatPlaced { seat: "1:1".into() };
//! assert_eq!(event.tags().get("seatId"), Some("1:1"));
//! ```

use crate::position::Position;
use crate::tag::Tags;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize {event_type}: {reason}")]
    DeserializationError {
        /// Type of the event whose payload could not be decoded.
        event_type: String,
        /// Decoder error message.
        reason: String,
    },
}

/// An event that can be stored in the event log and folded into state.
///
/// # Event Naming Convention
///
/// `event_type()` returns a stable identifier. Criteria select on it, so
/// renaming a type is a breaking change for every boundary that mentions it.
///
/// # Thread Safety
///
/// Events must be `Send + Sync + 'static` to be passed between tasks.
pub trait Event: Send + Sync + 'static {
    /// Stable type identifier (e.g. `"SeatBlocked"`).
    fn event_type(&self) -> &'static str;

    /// Tags used to select this event. Derived from the payload, never
    /// interpreted by domain logic.
    fn tags(&self) -> Tags;

    /// Reason carried by failure events (facts recording that something was
    /// *not* done). `None` for regular events.
    fn failure_reason(&self) -> Option<&str> {
        None
    }

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to a different schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError {
            event_type: std::any::type_name::<Self>().to_string(),
            reason: e.to_string(),
        })
    }
}

/// A closed family of events (a sum type) that can cross the log boundary.
///
/// Implementations map each variant to its own type name and payload, so the
/// payload encoding of one variant never depends on the position of the
/// variant inside the Rust enum.
pub trait DomainEvent: Event + Sized {
    /// Encode into the persisted record shape.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the payload cannot be encoded.
    fn encode(&self) -> Result<SerializedEvent, EventError>;

    /// Decode a persisted record.
    ///
    /// Returns `Ok(None)` for an event type this family does not know, so
    /// that folding stays forward compatible with newer writers.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` when the type is known but
    /// the payload is malformed.
    fn decode(event: &SerializedEvent) -> Result<Option<Self>, EventError>;
}

/// A serialized event ready for storage: `{type, payload, tags}`.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. "SeatBlocked").
    pub event_type: String,

    /// The bincode-serialized payload.
    pub data: Vec<u8>,

    /// Selection tags.
    pub tags: Tags,

    /// Optional metadata in JSON format.
    ///
    /// Common metadata fields:
    /// - `correlation_id`: Links related events across commands
    /// - `causation_id`: The command that produced this event
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinema_core::event::SerializedEvent;
    /// use cinema_core::tag::{Tag, Tags};
    ///
    /// let event = SerializedEvent::new(
    ///     "SeatPlaced".to_string(),
    ///     vec![1, 2, 3, 4],
    ///     Tags::from([Tag::new("seatId", "1:1")]),
    /// );
    /// assert!(event.metadata.is_none());
    /// ```
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>, tags: Tags) -> Self {
        Self {
            event_type,
            data,
            tags,
            metadata: None,
        }
    }

    /// Create a serialized event from any `Event`, using its bincode payload.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self::new(
            event.event_type().to_string(),
            event.to_bytes()?,
            event.tags(),
        ))
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Decode the payload as `T`, labelling failures with this record's type.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not decode.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        bincode::deserialize(&self.data).map_err(|e| EventError::DeserializationError {
            event_type: self.event_type.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, tags: {}, size: {} bytes }}",
            self.event_type,
            self.tags,
            self.data.len()
        )
    }
}

/// An event as read back from the log.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEvent {
    /// Global position assigned at append time.
    pub position: Position,
    /// The persisted record.
    pub event: SerializedEvent,
    /// When the store committed the event.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct SeatTouched {
        seat: String,
        times: u32,
    }

    impl Event for SeatTouched {
        fn event_type(&self) -> &'static str {
            "SeatTouched"
        }

        fn tags(&self) -> Tags {
            Tags::from([Tag::new("seatId", self.seat.clone())])
        }
    }

    #[test]
    fn test_default_failure_reason_is_none() {
        let event = SeatTouched {
            seat: "1:1".to_string(),
            times: 1,
        };
        assert!(event.failure_reason().is_none());
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn test_serialized_event_from_event_carries_type_and_tags() {
        let event = SeatTouched {
            seat: "3:4".to_string(),
            times: 2,
        };

        let serialized = SerializedEvent::from_event(&event).expect("serialization should succeed");

        assert_eq!(serialized.event_type, "SeatTouched");
        assert_eq!(serialized.tags.get("seatId"), Some("3:4"));
        assert_eq!(
            serialized.payload::<SeatTouched>().expect("payload should decode"),
            event
        );
    }

    #[test]
    fn test_malformed_payload_reports_event_type() {
        let serialized = SerializedEvent::new("SeatTouched".to_string(), vec![1], Tags::new());

        let err = serialized.payload::<SeatTouched>();
        assert!(matches!(
            err,
            Err(EventError::DeserializationError { ref event_type, .. }) if event_type == "SeatTouched"
        ));
    }

    #[test]
    fn test_serialized_event_display() {
        let serialized = SerializedEvent::new(
            "SeatTouched".to_string(),
            vec![1, 2, 3, 4, 5],
            Tags::from([Tag::new("seatId", "1:1")]),
        );

        let display = format!("{serialized}");
        assert!(display.contains("SeatTouched"));
        assert!(display.contains("seatId=1:1"));
        assert!(display.contains("5 bytes"));
    }
}
