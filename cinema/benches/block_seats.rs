//! Block-seats benchmarks.
//!
//! - `resolve`: criteria construction for growing seat selections
//! - `fold_and_decide`: state from a fully placed 10x10 grid, then a decision
//! - `end_to_end`: full command cycle against the in-memory store
//!
//! Run with: `cargo bench -p cinema`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used, clippy::unwrap_used)] // Benchmarks can use expect for setup

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use cinema::block_seats::{self, State};
use cinema::events::{ScreeningScheduled, SeatBlocked, SeatPlaced};
use cinema::{BlockSeats, CinemaApp, CinemaEvent, Config, MovieId, ScreeningId, SeatNumber};
use cinema_core::event::DomainEvent;
use cinema_testing::InMemoryEventStore;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

fn at(hour: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid time")
        .and_utc()
}

fn grid() -> impl Iterator<Item = SeatNumber> {
    (0..=SeatNumber::MAX)
        .flat_map(|row| (0..=SeatNumber::MAX).map(move |column| SeatNumber::new(row, column).expect("on grid")))
}

/// Scheduled screening, every seat placed, the first row blocked by someone else.
fn history(screening_id: &ScreeningId) -> Vec<CinemaEvent> {
    let mut events = vec![CinemaEvent::ScreeningScheduled(ScreeningScheduled {
        day_schedule_id: "2025-03-14".parse().expect("valid day"),
        screening_id: screening_id.clone(),
        movie_id: MovieId::new("m-1"),
        start_time: NaiveTime::from_hms_opt(20, 0, 0).expect("valid time"),
        end_time: NaiveTime::from_hms_opt(22, 0, 0).expect("valid time"),
        occurred_at: at(6),
    })];
    events.extend(grid().map(|seat| {
        CinemaEvent::SeatPlaced(SeatPlaced {
            screening_id: screening_id.clone(),
            seat,
            occurred_at: at(7),
        })
    }));
    events.extend(grid().take(10).map(|seat| {
        CinemaEvent::SeatBlocked(SeatBlocked {
            screening_id: screening_id.clone(),
            seat,
            blockade_owner: "bob".into(),
            occurred_at: at(8),
        })
    }));
    events
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let screening_id = ScreeningId::new("s-1");

    for size in [1usize, 10, 100] {
        let command = BlockSeats::new(screening_id.clone(), grid().take(size), "alice", at(10)).expect("seats");
        let boundary = command.boundary_id();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &boundary, |b, boundary| {
            b.iter(|| block_seats::resolve(black_box(boundary)));
        });
    }

    group.finish();
}

fn bench_fold_and_decide(c: &mut Criterion) {
    let screening_id = ScreeningId::new("s-1");
    let history = history(&screening_id);
    let command = BlockSeats::new(screening_id, grid().skip(10).take(4), "alice", at(10)).expect("seats");

    c.bench_function("fold_and_decide", |b| {
        b.iter(|| {
            let state = black_box(&history).iter().fold(State::default(), block_seats::evolve);
            block_seats::decide(black_box(&command), &state)
        });
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("end_to_end", |b| {
        b.iter_batched(
            || {
                let screening_id = ScreeningId::random();
                let store = Arc::new(InMemoryEventStore::new());
                let seed = history(&screening_id).iter().map(|e| e.encode().unwrap()).collect();
                runtime.block_on(store.seed(seed));
                let app = CinemaApp::new(store, &Config::default());
                let command = BlockSeats::new(screening_id, grid().skip(10).take(4), "alice", at(10)).expect("seats");
                (app, command)
            },
            |(app, command)| runtime.block_on(app.block_seats(command)),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_resolve, bench_fold_and_decide, bench_end_to_end);
criterion_main!(benches);
