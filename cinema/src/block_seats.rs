//! Write slice: block seats of a screening.
//!
//! The consistency boundary of one `BlockSeats` command is the requested
//! seats of one screening plus that screening's schedule. Two commands only
//! contend when their boundaries share a seat (or a screening schedule is
//! written concurrently); everything else proceeds in parallel.

use crate::events::{CinemaEvent, SeatBlocked, SeatEvent, event_types};
use crate::tags;
use crate::types::{ScreeningId, SeatNumber};
use chrono::{DateTime, Utc};
use cinema_core::criteria::EventCriteria;
use cinema_core::decider::Decider;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Identifier of the per-command consistency boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundaryId {
    /// The screening.
    pub screening_id: ScreeningId,
    /// The requested seats.
    pub seats: BTreeSet<SeatNumber>,
}

/// Block `seats` of a screening for `blockade_owner`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSeats {
    screening_id: ScreeningId,
    seats: Vec<SeatNumber>,
    blockade_owner: String,
    issued_at: DateTime<Utc>,
}

impl BlockSeats {
    /// Build the command. Seats keep their request order; repeats are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BlockSeatsError::EmptySeatSelection`] when no seat is given.
    pub fn new(
        screening_id: ScreeningId,
        seats: impl IntoIterator<Item = SeatNumber>,
        blockade_owner: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, BlockSeatsError> {
        let mut seen = BTreeSet::new();
        let seats: Vec<_> = seats.into_iter().filter(|seat| seen.insert(*seat)).collect();
        if seats.is_empty() {
            return Err(BlockSeatsError::EmptySeatSelection);
        }
        Ok(Self {
            screening_id,
            seats,
            blockade_owner: blockade_owner.into(),
            issued_at,
        })
    }

    /// The screening.
    #[must_use]
    pub const fn screening_id(&self) -> &ScreeningId {
        &self.screening_id
    }

    /// Requested seats, in request order.
    #[must_use]
    pub fn seats(&self) -> &[SeatNumber] {
        &self.seats
    }

    /// Who asks for the blockade.
    #[must_use]
    pub fn blockade_owner(&self) -> &str {
        &self.blockade_owner
    }

    /// When the command was issued.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// The consistency boundary this command decides on.
    #[must_use]
    pub fn boundary_id(&self) -> BoundaryId {
        BoundaryId {
            screening_id: self.screening_id.clone(),
            seats: self.seats.iter().copied().collect(),
        }
    }
}

/// State folded from the boundary's events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    /// Placed seats and their current blockade owner, if any. A seat missing
    /// from the map has not been placed.
    pub blockade_by_seat: BTreeMap<SeatNumber, Option<String>>,
    /// End of the screening, once it is scheduled.
    pub screening_end_time: Option<DateTime<Utc>>,
}

/// Why seats could not be blocked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockSeatsError {
    /// The screening has not been scheduled.
    #[error("Cannot block seats - screening not scheduled yet")]
    NotScheduled,

    /// The command was issued after the screening ended.
    #[error("Cannot block seats - screening has already ended")]
    AlreadyEnded,

    /// Some requested seats were never placed.
    #[error("Cannot block seats - must be placed first: {}", seat_list(.seats))]
    NotPlaced {
        /// The unplaced seats, in request order.
        seats: Vec<SeatNumber>,
    },

    /// Some requested seats are held by another owner.
    #[error("Cannot block seats - some seats are already blocked by others: {}", seat_list(.seats))]
    BlockedByOthers {
        /// The contested seats, in request order.
        seats: Vec<SeatNumber>,
    },

    /// The command named no seat at all.
    #[error("Cannot block seats - no seats selected")]
    EmptySeatSelection,
}

fn seat_list(seats: &[SeatNumber]) -> String {
    let names: Vec<String> = seats.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

/// Criteria selecting every event the decision depends on:
///
/// ```text
///   (screeningId=S AND seatId=s1 AND type IN {SeatPlaced, SeatBlocked, SeatUnblocked})
/// OR ...one leg per requested seat...
/// OR (screeningId=S AND type IN {ScreeningScheduled})
/// ```
///
/// Seat legs carry the screening tag on top of `seatId`: seat numbers repeat
/// across screenings, and without it the same seat of any other screening
/// would join the boundary and its blockades would reach `decide`.
///
/// # Errors
///
/// Returns [`BlockSeatsError::EmptySeatSelection`] for a boundary without
/// seats, which would otherwise reduce to the screening leg alone.
pub fn resolve(boundary: &BoundaryId) -> Result<EventCriteria, BlockSeatsError> {
    let screening = tags::screening(&boundary.screening_id);

    let seats = EventCriteria::either(boundary.seats.iter().map(|seat| {
        EventCriteria::having_tags([screening.clone(), tags::seat(*seat)]).and_being_one_of_types([
            event_types::SEAT_PLACED,
            event_types::SEAT_BLOCKED,
            event_types::SEAT_UNBLOCKED,
        ])
    }));
    if seats.is_unsatisfiable() {
        return Err(BlockSeatsError::EmptySeatSelection);
    }

    let schedule = EventCriteria::having_tag(screening).and_being_one_of_types([event_types::SCREENING_SCHEDULED]);

    Ok(seats.or(schedule))
}

/// Fold one event into the state. Events outside the boundary's concern
/// leave it unchanged.
#[must_use]
pub fn evolve(mut state: State, event: &CinemaEvent) -> State {
    match event {
        CinemaEvent::SeatPlaced(e) => {
            state.blockade_by_seat.entry(e.seat).or_insert(None);
        }
        CinemaEvent::SeatBlocked(e) => {
            state
                .blockade_by_seat
                .insert(e.seat, Some(e.blockade_owner.clone()));
        }
        CinemaEvent::SeatUnblocked(e) => {
            state.blockade_by_seat.insert(e.seat, None);
        }
        CinemaEvent::ScreeningScheduled(e) => {
            state.screening_end_time = Some(e.ends_at());
        }
        CinemaEvent::SeatBlockDenied(_)
        | CinemaEvent::DayScheduleCreated(_)
        | CinemaEvent::ScreeningCancelled(_) => {}
    }
    state
}

/// Validate the command against the state. The first broken rule rejects
/// the whole command; otherwise every requested seat that is still free is
/// blocked, in request order. Seats the owner already holds produce nothing.
///
/// # Errors
///
/// In rule order: [`BlockSeatsError::NotScheduled`],
/// [`BlockSeatsError::AlreadyEnded`], [`BlockSeatsError::NotPlaced`],
/// [`BlockSeatsError::BlockedByOthers`].
pub fn decide(command: &BlockSeats, state: &State) -> Result<Vec<SeatEvent>, BlockSeatsError> {
    let Some(ends_at) = state.screening_end_time else {
        return Err(BlockSeatsError::NotScheduled);
    };
    if command.issued_at > ends_at {
        return Err(BlockSeatsError::AlreadyEnded);
    }

    let not_placed: Vec<_> = command
        .seats
        .iter()
        .copied()
        .filter(|seat| !state.blockade_by_seat.contains_key(seat))
        .collect();
    if !not_placed.is_empty() {
        return Err(BlockSeatsError::NotPlaced { seats: not_placed });
    }

    let blocked_by_others: Vec<_> = command
        .seats
        .iter()
        .copied()
        .filter(|seat| {
            matches!(
                state.blockade_by_seat.get(seat),
                Some(Some(owner)) if *owner != command.blockade_owner
            )
        })
        .collect();
    if !blocked_by_others.is_empty() {
        return Err(BlockSeatsError::BlockedByOthers {
            seats: blocked_by_others,
        });
    }

    Ok(command
        .seats
        .iter()
        .filter(|seat| matches!(state.blockade_by_seat.get(seat), Some(None)))
        .map(|seat| {
            SeatEvent::Blocked(SeatBlocked {
                screening_id: command.screening_id.clone(),
                seat: *seat,
                blockade_owner: command.blockade_owner.clone(),
                occurred_at: command.issued_at,
            })
        })
        .collect())
}

/// The block-seats slice as a [`Decider`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockSeatsDecider;

impl Decider for BlockSeatsDecider {
    type Command = BlockSeats;
    type BoundaryId = BoundaryId;
    type State = State;
    type Event = CinemaEvent;
    type Rejection = BlockSeatsError;

    fn name(&self) -> &'static str {
        "BlockSeats"
    }

    fn boundary(&self, command: &BlockSeats) -> BoundaryId {
        command.boundary_id()
    }

    fn resolve(&self, boundary: &BoundaryId) -> Result<EventCriteria, BlockSeatsError> {
        resolve(boundary)
    }

    fn evolve(&self, state: State, event: &CinemaEvent) -> State {
        evolve(state, event)
    }

    fn decide(&self, command: &BlockSeats, state: &State) -> Result<Vec<CinemaEvent>, BlockSeatsError> {
        decide(command, state).map(|events| events.into_iter().map(CinemaEvent::from).collect())
    }
}
