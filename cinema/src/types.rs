//! Value types of the cinema domain.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Invalid raw value for one of the domain types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidValue {
    /// An identifier was empty.
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    /// Seat coordinates outside the grid.
    #[error("Seat {row}:{column} is outside the {max}x{max} grid", max = SeatNumber::MAX + 1)]
    SeatOutOfRange {
        /// Requested row.
        row: u8,
        /// Requested column.
        column: u8,
    },

    /// Seat text not in `row:column` form.
    #[error("Invalid seat number '{0}', expected row:column")]
    MalformedSeat(String),

    /// Day text not an ISO date.
    #[error("Invalid day '{0}', expected YYYY-MM-DD")]
    MalformedDay(String),
}

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of one screening.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreeningId(String);

impl ScreeningId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ScreeningId {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(InvalidValue::EmptyIdentifier("Screening id"));
        }
        Ok(Self::new(s))
    }
}

/// Identifier of a movie.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieId(String);

impl MovieId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A day schedule is identified by its calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayScheduleId(NaiveDate);

impl DayScheduleId {
    /// Schedule of `day`.
    #[must_use]
    pub const fn new(day: NaiveDate) -> Self {
        Self(day)
    }

    /// The scheduled day.
    #[must_use]
    pub const fn day(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DayScheduleId {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| InvalidValue::MalformedDay(s.to_string()))
    }
}

// ============================================================================
// Seats
// ============================================================================

/// A seat on the fixed 10x10 auditorium grid.
///
/// Both coordinates are checked at construction, so every `SeatNumber` in
/// the system is on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u8, u8)", into = "(u8, u8)")]
pub struct SeatNumber {
    row: u8,
    column: u8,
}

impl SeatNumber {
    /// Highest row and column index.
    pub const MAX: u8 = 9;

    /// Seat at `row`, `column`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValue::SeatOutOfRange`] unless both are in `0..=9`.
    pub const fn new(row: u8, column: u8) -> Result<Self, InvalidValue> {
        if row > Self::MAX || column > Self::MAX {
            return Err(InvalidValue::SeatOutOfRange { row, column });
        }
        Ok(Self { row, column })
    }

    /// Row index.
    #[must_use]
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Column index.
    #[must_use]
    pub const fn column(self) -> u8 {
        self.column
    }
}

impl TryFrom<(u8, u8)> for SeatNumber {
    type Error = InvalidValue;

    fn try_from((row, column): (u8, u8)) -> Result<Self, Self::Error> {
        Self::new(row, column)
    }
}

impl From<SeatNumber> for (u8, u8) {
    fn from(seat: SeatNumber) -> Self {
        (seat.row, seat.column)
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

impl FromStr for SeatNumber {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || InvalidValue::MalformedSeat(s.to_string());
        let (row, column) = s.split_once(':').ok_or_else(malformed)?;
        let row = row.trim().parse().map_err(|_| malformed())?;
        let column = column.trim().parse().map_err(|_| malformed())?;
        Self::new(row, column)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_seat_number_bounds() {
        assert!(SeatNumber::new(0, 0).is_ok());
        assert!(SeatNumber::new(9, 9).is_ok());
        assert_eq!(
            SeatNumber::new(10, 3),
            Err(InvalidValue::SeatOutOfRange { row: 10, column: 3 })
        );
        assert!(SeatNumber::new(3, 10).is_err());
    }

    #[test]
    fn test_seat_number_text() {
        let seat: SeatNumber = "1:2".parse().unwrap();
        assert_eq!((seat.row(), seat.column()), (1, 2));
        assert_eq!(seat.to_string(), "1:2");

        assert!(matches!("12".parse::<SeatNumber>(), Err(InvalidValue::MalformedSeat(_))));
        assert!(matches!("a:1".parse::<SeatNumber>(), Err(InvalidValue::MalformedSeat(_))));
        assert!(matches!("1:10".parse::<SeatNumber>(), Err(InvalidValue::SeatOutOfRange { .. })));
    }

    #[test]
    fn test_seat_order_is_row_major() {
        let mut seats = vec![
            SeatNumber::new(2, 0).unwrap(),
            SeatNumber::new(1, 5).unwrap(),
            SeatNumber::new(1, 2).unwrap(),
        ];
        seats.sort();
        let text: Vec<_> = seats.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["1:2", "1:5", "2:0"]);
    }

    #[test]
    fn test_seat_payload_rejects_off_grid_values() {
        let bytes = bincode::serialize(&(4u8, 11u8)).unwrap();
        assert!(bincode::deserialize::<SeatNumber>(&bytes).is_err());

        let bytes = bincode::serialize(&SeatNumber::new(4, 7).unwrap()).unwrap();
        assert_eq!(bincode::deserialize::<SeatNumber>(&bytes).unwrap().to_string(), "4:7");
    }

    #[test]
    fn test_screening_id_rejects_empty_text() {
        assert_eq!("s-1".parse::<ScreeningId>().unwrap().as_str(), "s-1");
        assert!("  ".parse::<ScreeningId>().is_err());
        assert_ne!(ScreeningId::random(), ScreeningId::random());
    }

    #[test]
    fn test_day_schedule_id_text() {
        let day: DayScheduleId = "2025-03-14".parse().unwrap();
        assert_eq!(day.to_string(), "2025-03-14");
        assert!("14/03/2025".parse::<DayScheduleId>().is_err());
    }
}
