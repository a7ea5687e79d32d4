//! # Cinema
//!
//! Seat blocking for cinema screenings, built on a dynamic consistency
//! boundary instead of a per-aggregate stream.
//!
//! A `BlockSeats` command reads exactly the events it needs (the requested
//! seats of one screening plus the screening's schedule), folds them into a
//! transient [`State`](block_seats::State), decides, and appends under a
//! condition scoped by the same criteria. Requests for disjoint seats never
//! contend.
//!
//! ## Modules
//!
//! - [`types`]: screening, seat, day schedule and movie identifiers
//! - [`tags`]: tag keys events are selected by
//! - [`events`]: seat and day schedule events
//! - [`block_seats`]: the write slice (`resolve`, `evolve`, `decide`)
//! - [`app`]: slice wiring over an event store
//! - [`config`]: environment configuration
//!
//! ## Example
//!
//! ```ignore
//! let app = CinemaApp::new(Arc::new(InMemoryEventStore::new()), &Config::default());
//!
//! let command = BlockSeats::new(screening_id, seats, "alice", Utc::now())?;
//! match app.block_seats(command).await? {
//!     CommandResult::Success { appended } => println!("{appended} seats blocked"),
//!     CommandResult::Failure(message) => println!("refused: {message}"),
//! }
//! ```

pub mod app;
pub mod block_seats;
pub mod config;
pub mod events;
pub mod tags;
pub mod types;

pub use app::{AppError, CinemaApp};
pub use block_seats::{BlockSeats, BlockSeatsDecider, BlockSeatsError, BoundaryId};
pub use config::Config;
pub use events::{CinemaEvent, SeatEvent};
pub use types::{DayScheduleId, InvalidValue, MovieId, ScreeningId, SeatNumber};
