//! End-to-end block-seats scenarios through [`CinemaApp`] over the in-memory store.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use cinema::block_seats::{self, State};
use cinema::events::{ScreeningScheduled, SeatBlocked, SeatPlaced};
use cinema::{AppError, BlockSeats, BlockSeatsError, CinemaApp, CinemaEvent, Config, MovieId, ScreeningId, SeatNumber};
use cinema_core::environment::Clock;
use cinema_core::event::DomainEvent;
use cinema_runtime::{CommandResult, ExecutionError};
use cinema_testing::{FixedClock, FlakyEventStore, InMemoryEventStore, test_clock};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
        .and_utc()
}

fn seat(raw: &str) -> SeatNumber {
    raw.parse().unwrap()
}

fn scheduled(screening_id: &ScreeningId) -> CinemaEvent {
    CinemaEvent::ScreeningScheduled(ScreeningScheduled {
        day_schedule_id: "2025-03-14".parse().unwrap(),
        screening_id: screening_id.clone(),
        movie_id: MovieId::new("m-1"),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        occurred_at: at(6, 0),
    })
}

fn placed(screening_id: &ScreeningId, raw: &str) -> CinemaEvent {
    CinemaEvent::SeatPlaced(SeatPlaced {
        screening_id: screening_id.clone(),
        seat: seat(raw),
        occurred_at: at(7, 0),
    })
}

fn blocked(screening_id: &ScreeningId, raw: &str, owner: &str) -> CinemaEvent {
    CinemaEvent::SeatBlocked(SeatBlocked {
        screening_id: screening_id.clone(),
        seat: seat(raw),
        blockade_owner: owner.into(),
        occurred_at: at(9, 0),
    })
}

fn clock_at(hour: u32, minute: u32) -> FixedClock {
    FixedClock::new(at(hour, minute))
}

/// Command stamped with the time `clock` reads.
fn block(screening_id: &ScreeningId, seats: &[&str], owner: &str, clock: &dyn Clock) -> BlockSeats {
    BlockSeats::new(screening_id.clone(), seats.iter().map(|s| seat(s)), owner, clock.now()).unwrap()
}

async fn store_with(events: &[CinemaEvent]) -> Arc<InMemoryEventStore> {
    let store = Arc::new(InMemoryEventStore::new());
    store
        .seed(events.iter().map(|e| e.encode().unwrap()).collect())
        .await;
    store
}

/// Screening ending at 12:00 with seats 1:1, 1:2 and 1:3 placed.
fn three_seat_screening(screening_id: &ScreeningId) -> [CinemaEvent; 4] {
    [
        scheduled(screening_id),
        placed(screening_id, "1:1"),
        placed(screening_id, "1:2"),
        placed(screening_id, "1:3"),
    ]
}

async fn screening_with_three_seats() -> (ScreeningId, Arc<InMemoryEventStore>) {
    let screening_id = ScreeningId::new("s-1");
    let store = store_with(&three_seat_screening(&screening_id)).await;
    (screening_id, store)
}

fn app(store: &Arc<InMemoryEventStore>) -> CinemaApp {
    CinemaApp::new(Arc::clone(store) as _, &Config::default())
}

async fn blockades(store: &InMemoryEventStore) -> Vec<(String, String)> {
    store
        .all_events()
        .await
        .iter()
        .filter_map(|stored| match CinemaEvent::decode(&stored.event).unwrap() {
            Some(CinemaEvent::SeatBlocked(e)) => Some((e.seat.to_string(), e.blockade_owner)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_owner_blocks_three_free_seats() {
    let (screening_id, store) = screening_with_three_seats().await;
    let before = store.head().await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:1", "1:2", "1:3"], "owner", &clock_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(result, CommandResult::Success { appended: 3 });
    assert_eq!(store.head().await.value(), before.value() + 3);
    assert_eq!(
        blockades(&store).await,
        [
            ("1:1".to_string(), "owner".to_string()),
            ("1:2".to_string(), "owner".to_string()),
            ("1:3".to_string(), "owner".to_string()),
        ]
    );

    for stored in store.all_events().await.iter().skip(4) {
        assert_eq!(stored.event.tags.get("screeningId"), Some("s-1"));
        assert!(stored.event.tags.get("seatId").is_some());
    }
}

#[tokio::test]
async fn test_resubmitting_the_same_command_appends_nothing() {
    let (screening_id, store) = screening_with_three_seats().await;
    let app = app(&store);
    let command = block(&screening_id, &["1:1", "1:2"], "owner", &clock_at(10, 0));

    let first = app.block_seats(command.clone()).await.unwrap();
    let head = store.head().await;
    let second = app.block_seats(command).await.unwrap();

    assert_eq!(first, CommandResult::Success { appended: 2 });
    assert_eq!(second, CommandResult::Success { appended: 0 });
    assert_eq!(store.head().await, head);
}

#[tokio::test]
async fn test_one_contested_seat_blocks_nothing() {
    let (screening_id, store) = screening_with_three_seats().await;
    store
        .seed(vec![blocked(&screening_id, "1:1", "bob").encode().unwrap()])
        .await;
    let head = store.head().await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:1", "1:2"], "alice", &clock_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(
        result.failure_message(),
        Some("Cannot block seats - some seats are already blocked by others: [1:1]")
    );
    assert_eq!(store.head().await, head, "nothing appended");
    assert_eq!(blockades(&store).await, [("1:1".to_string(), "bob".to_string())]);
}

#[tokio::test]
async fn test_blocking_after_the_screening_ended_fails() {
    let (screening_id, store) = screening_with_three_seats().await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:1"], "alice", &clock_at(12, 1)))
        .await
        .unwrap();

    assert_eq!(
        result,
        CommandResult::failure("Cannot block seats - screening has already ended")
    );
}

#[tokio::test]
async fn test_unscheduled_screening_fails() {
    let screening_id = ScreeningId::new("s-9");
    let store = store_with(&[placed(&screening_id, "1:1")]).await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:1"], "alice", &clock_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(
        result.failure_message(),
        Some("Cannot block seats - screening not scheduled yet")
    );
}

#[tokio::test]
async fn test_unplaced_seats_are_named_in_the_failure() {
    let (screening_id, store) = screening_with_three_seats().await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["2:2", "1:1", "0:9"], "alice", &clock_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(
        result.failure_message(),
        Some("Cannot block seats - must be placed first: [2:2, 0:9]")
    );
}

#[tokio::test]
async fn test_same_seat_of_another_screening_is_independent() {
    let (screening_id, store) = screening_with_three_seats().await;
    let other = ScreeningId::new("s-2");
    store
        .seed(
            [scheduled(&other), placed(&other, "1:1"), blocked(&other, "1:1", "bob")]
                .iter()
                .map(|e| e.encode().unwrap())
                .collect(),
        )
        .await;

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:1"], "alice", &clock_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(result, CommandResult::Success { appended: 1 });
}

#[tokio::test]
async fn test_disabled_slice_refuses_commands() {
    let (screening_id, store) = screening_with_three_seats().await;
    let app = CinemaApp::builder(Arc::clone(&store) as _)
        .block_seats_enabled(false)
        .build();

    let result = app
        .block_seats(block(&screening_id, &["1:1"], "alice", &clock_at(10, 0)))
        .await;

    assert!(matches!(result, Err(AppError::SliceDisabled("BlockSeats"))));
    assert_eq!(store.all_events().await.len(), 4);
}

#[tokio::test]
async fn test_store_outage_is_not_a_business_failure() {
    let screening_id = ScreeningId::new("s-1");
    let inner = InMemoryEventStore::new();
    inner
        .seed(three_seat_screening(&screening_id).iter().map(|e| e.encode().unwrap()).collect())
        .await;
    let flaky = Arc::new(FlakyEventStore::unavailable(inner));
    let app = CinemaApp::new(Arc::clone(&flaky) as _, &Config::default());

    let result = app
        .block_seats(block(&screening_id, &["1:1"], "alice", &clock_at(10, 0)))
        .await;

    match result {
        Err(AppError::Execution(error @ ExecutionError::StoreUnavailable(_))) => {
            assert!(error.is_transient());
        }
        other => panic!("expected a store outage, got {other:?}"),
    }
    assert_eq!(flaky.append_calls(), 0, "sourcing already failed");
    assert_eq!(flaky.inner().all_events().await.len(), 4);
    assert!(blockades(flaky.inner()).await.is_empty());
}

#[tokio::test]
async fn test_blockade_is_stamped_with_the_issuing_clock() {
    let (screening_id, store) = screening_with_three_seats().await;
    let clock = test_clock();

    let result = app(&store)
        .block_seats(block(&screening_id, &["1:2"], "alice", &clock))
        .await
        .unwrap();

    assert_eq!(result, CommandResult::Success { appended: 1 });
    let last = store.all_events().await.pop().unwrap();
    match CinemaEvent::decode(&last.event).unwrap() {
        Some(CinemaEvent::SeatBlocked(e)) => {
            assert_eq!(e.seat, seat("1:2"));
            assert_eq!(e.occurred_at, clock.now());
        }
        other => panic!("expected a blockade, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_selection_never_reaches_the_store() {
    let result = BlockSeats::new(ScreeningId::new("s-1"), Vec::new(), "alice", at(10, 0));
    assert_eq!(result, Err(BlockSeatsError::EmptySeatSelection));
}

// ----------------------------------------------------------------------------
// Decision model
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum SeatFixture {
    Unplaced,
    Free,
    HeldBy(u8),
}

fn seat_fixture() -> impl Strategy<Value = SeatFixture> {
    prop_oneof![
        Just(SeatFixture::Unplaced),
        Just(SeatFixture::Free),
        (0u8..3).prop_map(SeatFixture::HeldBy),
    ]
}

fn owner(n: u8) -> String {
    format!("owner-{n}")
}

proptest! {
    /// The decision is accepted exactly when every requested seat is placed
    /// and none is held by someone else, and it blocks only the free ones.
    #[test]
    fn prop_decision_matches_seat_model(
        fixtures in proptest::collection::vec(seat_fixture(), 1..10),
        requester in 0u8..3,
    ) {
        let screening_id = ScreeningId::new("s-1");
        let seats: Vec<SeatNumber> = (0..fixtures.len())
            .map(|i| SeatNumber::new(0, u8::try_from(i).unwrap()).unwrap())
            .collect();

        let mut history = vec![scheduled(&screening_id)];
        for (seat, fixture) in seats.iter().zip(&fixtures) {
            let raw = seat.to_string();
            match fixture {
                SeatFixture::Unplaced => {}
                SeatFixture::Free => history.push(placed(&screening_id, &raw)),
                SeatFixture::HeldBy(n) => {
                    history.push(placed(&screening_id, &raw));
                    history.push(blocked(&screening_id, &raw, &owner(*n)));
                }
            }
        }

        let state = history.iter().fold(State::default(), block_seats::evolve);
        let command = BlockSeats::new(screening_id, seats.clone(), owner(requester), at(10, 0)).unwrap();
        let outcome = block_seats::decide(&command, &state);

        let any_unplaced = fixtures.iter().any(|f| matches!(f, SeatFixture::Unplaced));
        let any_foreign = fixtures.iter().any(|f| matches!(f, SeatFixture::HeldBy(n) if *n != requester));
        let free: Vec<SeatNumber> = seats
            .iter()
            .zip(&fixtures)
            .filter(|(_, f)| matches!(f, SeatFixture::Free))
            .map(|(s, _)| *s)
            .collect();

        match outcome {
            Ok(events) => {
                prop_assert!(!any_unplaced && !any_foreign);
                let emitted: Vec<SeatNumber> = events
                    .iter()
                    .map(|event| match event {
                        cinema::SeatEvent::Blocked(e) => e.seat,
                        other => panic!("only blockades are decided, got {other:?}"),
                    })
                    .collect();
                prop_assert_eq!(emitted, free);
            }
            Err(BlockSeatsError::NotPlaced { .. }) => prop_assert!(any_unplaced),
            Err(BlockSeatsError::BlockedByOthers { .. }) => prop_assert!(!any_unplaced && any_foreign),
            Err(other) => prop_assert!(false, "unexpected rejection {other}"),
        }
    }

    /// Folding is total over any mix of events. Denials, day schedules and
    /// cancellations leave the state untouched.
    #[test]
    fn prop_fold_tracks_every_touched_seat(
        steps in proptest::collection::vec((0u8..6, 0u8..3, 0u8..3), 0..40),
    ) {
        let screening_id = ScreeningId::new("s-1");
        let mut expected: BTreeMap<SeatNumber, Option<String>> = BTreeMap::new();
        let mut state = State::default();

        for (kind, column, who) in steps {
            let seat = SeatNumber::new(0, column).unwrap();
            let raw = seat.to_string();
            let event = match kind {
                0 => {
                    expected.entry(seat).or_insert(None);
                    placed(&screening_id, &raw)
                }
                1 => {
                    expected.insert(seat, Some(owner(who)));
                    blocked(&screening_id, &raw, &owner(who))
                }
                2 => {
                    expected.insert(seat, None);
                    CinemaEvent::SeatUnblocked(cinema::events::SeatUnblocked {
                        screening_id: screening_id.clone(),
                        seat,
                        blockade_owner: owner(who),
                        occurred_at: at(9, 30),
                    })
                }
                3 => CinemaEvent::SeatBlockDenied(cinema::events::SeatBlockDenied {
                    screening_id: screening_id.clone(),
                    seat,
                    reason: "taken".into(),
                    tried_by: owner(who),
                    occurred_at: at(9, 30),
                }),
                4 => CinemaEvent::DayScheduleCreated(cinema::events::DayScheduleCreated {
                    day_schedule_id: "2025-03-14".parse().unwrap(),
                    opening_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    closing_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                    occurred_at: at(5, 0),
                }),
                _ => CinemaEvent::ScreeningCancelled(cinema::events::ScreeningCancelled {
                    day_schedule_id: "2025-03-14".parse().unwrap(),
                    screening_id: screening_id.clone(),
                    occurred_at: at(9, 45),
                }),
            };
            state = block_seats::evolve(state, &event);
        }

        prop_assert_eq!(state.blockade_by_seat, expected);
        prop_assert_eq!(state.screening_end_time, None);
    }
}
