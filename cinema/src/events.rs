//! Events of the cinema domain.
//!
//! Every fact is a plain payload struct. [`CinemaEvent`] is the closed family
//! crossing the log boundary: each variant is stored under its own type name
//! with its own bincode payload and the tags that criteria select on.
//!
//! | Type | Tags |
//! |---|---|
//! | `SeatPlaced`, `SeatBlocked`, `SeatUnblocked`, `SeatBlockDenied` | `screeningId`, `seatId` |
//! | `DayScheduleCreated` | `dayScheduleId` |
//! | `ScreeningScheduled` | `dayScheduleId`, `screeningId`, `movieId` |
//! | `ScreeningCancelled` | `dayScheduleId`, `screeningId` |

use crate::tags;
use crate::types::{DayScheduleId, MovieId, ScreeningId, SeatNumber};
use chrono::{DateTime, NaiveTime, Utc};
use cinema_core::event::{DomainEvent, Event, EventError, SerializedEvent};
use cinema_core::tag::Tags;
use serde::{Deserialize, Serialize};

/// Stable event type names.
pub mod event_types {
    /// [`SeatPlaced`](super::SeatPlaced)
    pub const SEAT_PLACED: &str = "SeatPlaced";
    /// [`SeatBlocked`](super::SeatBlocked)
    pub const SEAT_BLOCKED: &str = "SeatBlocked";
    /// [`SeatUnblocked`](super::SeatUnblocked)
    pub const SEAT_UNBLOCKED: &str = "SeatUnblocked";
    /// [`SeatBlockDenied`](super::SeatBlockDenied)
    pub const SEAT_BLOCK_DENIED: &str = "SeatBlockDenied";
    /// [`DayScheduleCreated`](super::DayScheduleCreated)
    pub const DAY_SCHEDULE_CREATED: &str = "DayScheduleCreated";
    /// [`ScreeningScheduled`](super::ScreeningScheduled)
    pub const SCREENING_SCHEDULED: &str = "ScreeningScheduled";
    /// [`ScreeningCancelled`](super::ScreeningCancelled)
    pub const SCREENING_CANCELLED: &str = "ScreeningCancelled";
}

// ============================================================================
// Seats
// ============================================================================

/// A seat was made available for a screening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPlaced {
    /// Screening the seat belongs to.
    pub screening_id: ScreeningId,
    /// The seat.
    pub seat: SeatNumber,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// A seat was blocked for an owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatBlocked {
    /// Screening the seat belongs to.
    pub screening_id: ScreeningId,
    /// The seat.
    pub seat: SeatNumber,
    /// Who holds the blockade.
    pub blockade_owner: String,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// A blockade was released.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatUnblocked {
    /// Screening the seat belongs to.
    pub screening_id: ScreeningId,
    /// The seat.
    pub seat: SeatNumber,
    /// Who held the blockade.
    pub blockade_owner: String,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// A blocking attempt was refused and recorded as a fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatBlockDenied {
    /// Screening the seat belongs to.
    pub screening_id: ScreeningId,
    /// The seat.
    pub seat: SeatNumber,
    /// Why the seat was not blocked.
    pub reason: String,
    /// Who tried to block it.
    pub tried_by: String,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

// ============================================================================
// Day schedule
// ============================================================================

/// Opening hours of one cinema day were set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayScheduleCreated {
    /// The day.
    pub day_schedule_id: DayScheduleId,
    /// Opening time, UTC.
    pub opening_time: NaiveTime,
    /// Closing time, UTC.
    pub closing_time: NaiveTime,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

/// A screening was put on a day's schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningScheduled {
    /// The day of the screening.
    pub day_schedule_id: DayScheduleId,
    /// The screening.
    pub screening_id: ScreeningId,
    /// The movie shown.
    pub movie_id: MovieId,
    /// Start time on that day, UTC.
    pub start_time: NaiveTime,
    /// End time on that day, UTC.
    pub end_time: NaiveTime,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

impl ScreeningScheduled {
    /// The instant the screening ends: its day at `end_time`, UTC.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.day_schedule_id.day().and_time(self.end_time).and_utc()
    }
}

/// A screening was taken off the schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningCancelled {
    /// The day of the screening.
    pub day_schedule_id: DayScheduleId,
    /// The screening.
    pub screening_id: ScreeningId,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

// ============================================================================
// Families
// ============================================================================

/// The seat lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeatEvent {
    /// See [`SeatPlaced`].
    Placed(SeatPlaced),
    /// See [`SeatBlocked`].
    Blocked(SeatBlocked),
    /// See [`SeatUnblocked`].
    Unblocked(SeatUnblocked),
    /// See [`SeatBlockDenied`].
    BlockDenied(SeatBlockDenied),
}

/// Every event of the cinema domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CinemaEvent {
    /// See [`SeatPlaced`].
    SeatPlaced(SeatPlaced),
    /// See [`SeatBlocked`].
    SeatBlocked(SeatBlocked),
    /// See [`SeatUnblocked`].
    SeatUnblocked(SeatUnblocked),
    /// See [`SeatBlockDenied`].
    SeatBlockDenied(SeatBlockDenied),
    /// See [`DayScheduleCreated`].
    DayScheduleCreated(DayScheduleCreated),
    /// See [`ScreeningScheduled`].
    ScreeningScheduled(ScreeningScheduled),
    /// See [`ScreeningCancelled`].
    ScreeningCancelled(ScreeningCancelled),
}

impl From<SeatEvent> for CinemaEvent {
    fn from(event: SeatEvent) -> Self {
        match event {
            SeatEvent::Placed(e) => Self::SeatPlaced(e),
            SeatEvent::Blocked(e) => Self::SeatBlocked(e),
            SeatEvent::Unblocked(e) => Self::SeatUnblocked(e),
            SeatEvent::BlockDenied(e) => Self::SeatBlockDenied(e),
        }
    }
}

fn seat_tags(screening_id: &ScreeningId, seat: SeatNumber) -> Tags {
    Tags::from([tags::screening(screening_id), tags::seat(seat)])
}

fn payload<T: Serialize>(value: &T) -> Result<Vec<u8>, EventError> {
    bincode::serialize(value).map_err(|e| EventError::SerializationError(e.to_string()))
}

impl Event for CinemaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::SeatPlaced(_) => event_types::SEAT_PLACED,
            Self::SeatBlocked(_) => event_types::SEAT_BLOCKED,
            Self::SeatUnblocked(_) => event_types::SEAT_UNBLOCKED,
            Self::SeatBlockDenied(_) => event_types::SEAT_BLOCK_DENIED,
            Self::DayScheduleCreated(_) => event_types::DAY_SCHEDULE_CREATED,
            Self::ScreeningScheduled(_) => event_types::SCREENING_SCHEDULED,
            Self::ScreeningCancelled(_) => event_types::SCREENING_CANCELLED,
        }
    }

    fn tags(&self) -> Tags {
        match self {
            Self::SeatPlaced(e) => seat_tags(&e.screening_id, e.seat),
            Self::SeatBlocked(e) => seat_tags(&e.screening_id, e.seat),
            Self::SeatUnblocked(e) => seat_tags(&e.screening_id, e.seat),
            Self::SeatBlockDenied(e) => seat_tags(&e.screening_id, e.seat),
            Self::DayScheduleCreated(e) => Tags::from([tags::day_schedule(e.day_schedule_id)]),
            Self::ScreeningScheduled(e) => Tags::from([
                tags::day_schedule(e.day_schedule_id),
                tags::screening(&e.screening_id),
                tags::movie(&e.movie_id),
            ]),
            Self::ScreeningCancelled(e) => Tags::from([
                tags::day_schedule(e.day_schedule_id),
                tags::screening(&e.screening_id),
            ]),
        }
    }

    fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::SeatBlockDenied(e) => Some(&e.reason),
            _ => None,
        }
    }
}

impl DomainEvent for CinemaEvent {
    fn encode(&self) -> Result<SerializedEvent, EventError> {
        let data = match self {
            Self::SeatPlaced(e) => payload(e)?,
            Self::SeatBlocked(e) => payload(e)?,
            Self::SeatUnblocked(e) => payload(e)?,
            Self::SeatBlockDenied(e) => payload(e)?,
            Self::DayScheduleCreated(e) => payload(e)?,
            Self::ScreeningScheduled(e) => payload(e)?,
            Self::ScreeningCancelled(e) => payload(e)?,
        };
        Ok(SerializedEvent::new(self.event_type().to_string(), data, self.tags()))
    }

    fn decode(event: &SerializedEvent) -> Result<Option<Self>, EventError> {
        let decoded = match event.event_type.as_str() {
            event_types::SEAT_PLACED => Self::SeatPlaced(event.payload()?),
            event_types::SEAT_BLOCKED => Self::SeatBlocked(event.payload()?),
            event_types::SEAT_UNBLOCKED => Self::SeatUnblocked(event.payload()?),
            event_types::SEAT_BLOCK_DENIED => Self::SeatBlockDenied(event.payload()?),
            event_types::DAY_SCHEDULE_CREATED => Self::DayScheduleCreated(event.payload()?),
            event_types::SCREENING_SCHEDULED => Self::ScreeningScheduled(event.payload()?),
            event_types::SCREENING_CANCELLED => Self::ScreeningCancelled(event.payload()?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }
}
