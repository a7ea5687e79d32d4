//! Cinema write side demo.
//!
//! Seeds one screening scheduled for tomorrow with three placed seats, then
//! blocks them for one owner and lets a second owner try one of them. Runs
//! against `PostgreSQL` when `DATABASE_URL` is set, in memory otherwise.

use anyhow::Context;
use chrono::{Days, NaiveTime};
use cinema::events::{ScreeningScheduled, SeatPlaced};
use cinema::{BlockSeats, CinemaApp, CinemaEvent, Config, DayScheduleId, MovieId, ScreeningId, SeatNumber};
use cinema_core::environment::{Clock, SystemClock};
use cinema_core::event::DomainEvent;
use cinema_core::event_store::EventStore;
use cinema_postgres::PostgresEventStore;
use cinema_runtime::metrics::MetricsServer;
use cinema_testing::InMemoryEventStore;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.observability.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        postgres = config.postgres.url.is_some(),
        max_attempts = config.commands.max_attempts,
        block_seats_enabled = config.slices.block_seats_enabled,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.observability.metrics_addr.parse()?);
    if config.observability.metrics_enabled {
        metrics.start()?;
    }

    let event_store: Arc<dyn EventStore> = match &config.postgres.url {
        Some(url) => {
            info!("Connecting to event store database...");
            let store = PostgresEventStore::with_max_connections(url, config.postgres.max_connections)
                .await
                .context("connecting to the event store")?;
            store.migrate().await.context("running event store migrations")?;
            info!("Event store connected");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory event store");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let app = CinemaApp::new(event_store, &config);
    let clock = SystemClock;

    let screening_id = ScreeningId::random();
    let seats = [SeatNumber::new(1, 1)?, SeatNumber::new(1, 2)?, SeatNumber::new(1, 3)?];
    seed_screening(&app, &clock, &screening_id, &seats).await?;

    let issued_at = clock.now();

    let first = app
        .block_seats(BlockSeats::new(screening_id.clone(), seats, "alice", issued_at)?)
        .await?;
    info!(owner = "alice", result = %first, "Blocking attempt finished");

    let second = app
        .block_seats(BlockSeats::new(screening_id.clone(), [seats[2]], "bob", issued_at)?)
        .await?;
    info!(owner = "bob", result = %second, "Blocking attempt finished");

    if let Some(text) = metrics.render() {
        info!(metrics = %text, "Metrics snapshot");
    }

    Ok(())
}

/// Schedule `screening_id` for tomorrow evening and place `seats`.
async fn seed_screening(
    app: &CinemaApp,
    clock: &dyn Clock,
    screening_id: &ScreeningId,
    seats: &[SeatNumber],
) -> anyhow::Result<()> {
    let now = clock.now();
    let day = DayScheduleId::new(
        now.date_naive()
            .checked_add_days(Days::new(1))
            .context("screening day")?,
    );

    let mut setup = vec![CinemaEvent::ScreeningScheduled(ScreeningScheduled {
        day_schedule_id: day,
        screening_id: screening_id.clone(),
        movie_id: MovieId::random(),
        start_time: NaiveTime::from_hms_opt(20, 0, 0).context("start time")?,
        end_time: NaiveTime::from_hms_opt(22, 30, 0).context("end time")?,
        occurred_at: now,
    })];
    setup.extend(seats.iter().map(|seat| {
        CinemaEvent::SeatPlaced(SeatPlaced {
            screening_id: screening_id.clone(),
            seat: *seat,
            occurred_at: now,
        })
    }));

    let setup = setup.iter().map(DomainEvent::encode).collect::<Result<Vec<_>, _>>()?;
    let head = app.event_store().append(setup, None).await?;
    info!(screening = %screening_id, %day, %head, "Screening scheduled and seats placed");
    Ok(())
}
