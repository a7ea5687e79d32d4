//! Tag keys used to select cinema events.

use crate::types::{DayScheduleId, MovieId, ScreeningId, SeatNumber};
use cinema_core::tag::Tag;

/// Day schedule the event belongs to.
pub const DAY_SCHEDULE_ID: &str = "dayScheduleId";
/// Screening the event concerns.
pub const SCREENING_ID: &str = "screeningId";
/// Movie being screened.
pub const MOVIE_ID: &str = "movieId";
/// Seat, as `row:column`.
pub const SEAT_ID: &str = "seatId";

/// `dayScheduleId` tag.
#[must_use]
pub fn day_schedule(id: DayScheduleId) -> Tag {
    Tag::new(DAY_SCHEDULE_ID, id.to_string())
}

/// `screeningId` tag.
#[must_use]
pub fn screening(id: &ScreeningId) -> Tag {
    Tag::new(SCREENING_ID, id.as_str())
}

/// `movieId` tag.
#[must_use]
pub fn movie(id: &MovieId) -> Tag {
    Tag::new(MOVIE_ID, id.as_str())
}

/// `seatId` tag.
#[must_use]
pub fn seat(seat: SeatNumber) -> Tag {
    Tag::new(SEAT_ID, seat.to_string())
}
