//! `PostgreSQL` event store implementation for the cinema write side.
//!
//! This crate provides a PostgreSQL-based event store that implements the
//! `EventStore` trait from `cinema-core`:
//!
//! - One append-only `events` table shared by every consistency boundary
//! - Tags stored as `JSONB` and matched by containment (GIN indexed)
//! - Criteria compiled to a parameterised `WHERE` clause
//! - Conditional append scoped by criteria, serialised by a transaction-level
//!   advisory lock so positions become visible in commit order
//!
//! # Example
//!
//! ```ignore
//! use cinema_postgres::PostgresEventStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let event_store = PostgresEventStore::new("postgres://localhost/cinema").await?;
//!     event_store.migrate().await?;
//!     Ok(())
//! }
//! ```

mod query;

use chrono::{DateTime, Utc};
use cinema_core::criteria::EventCriteria;
use cinema_core::event::{SerializedEvent, StoredEvent};
use cinema_core::event_store::{AppendCondition, EventStore, EventStoreError, SourcedEvents};
use cinema_core::position::Position;
use cinema_core::tag::Tags;
use futures::future::BoxFuture;
use query::push_criteria;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Instant;

/// Advisory lock key serialising appends (ASCII `cinema`).
const APPEND_LOCK_KEY: i64 = 0x6369_6e65_6d61;

/// `PostgreSQL` event store.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect with a pool of default size.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::DatabaseError`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, EventStoreError> {
        Self::with_max_connections(database_url, 10).await
    }

    /// Connect with at most `max_connections` pooled connections.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::DatabaseError`] if the connection fails.
    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self, EventStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to connect: {e}")))?;
        tracing::info!(max_connections, "Connected to PostgreSQL event store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `events` table and its indexes if missing.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Migration failed: {e}")))?;
        tracing::info!("Event store migrations applied");
        Ok(())
    }

    async fn source_events(&self, criteria: EventCriteria) -> Result<SourcedEvents, EventStoreError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Events and head must come from the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT position, event_type, payload, tags, metadata, recorded_at FROM events WHERE ",
        );
        push_criteria(&mut select, &criteria);
        select.push(" ORDER BY position");

        let rows = select.build().fetch_all(&mut *tx).await.map_err(database_error)?;
        let head = log_head(&mut tx).await?;
        tx.commit().await.map_err(database_error)?;

        let events = rows.iter().map(stored_event).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(%criteria, count = events.len(), %head, "Sourced events");
        Ok(SourcedEvents { events, position: head })
    }

    async fn append_events(
        &self,
        events: Vec<SerializedEvent>,
        condition: Option<AppendCondition>,
    ) -> Result<Position, EventStoreError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let waiting = Instant::now();
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        metrics::histogram!("postgres_append_lock_wait_seconds").record(waiting.elapsed().as_secs_f64());

        if let Some(condition) = &condition {
            let mut check = QueryBuilder::<Postgres>::new("SELECT position FROM events WHERE position > ");
            check.push_bind(to_db_position(condition.after)?);
            check.push(" AND ");
            push_criteria(&mut check, &condition.fail_if_events_match);
            check.push(" ORDER BY position LIMIT 1");

            let conflicting: Option<i64> = check
                .build_query_scalar()
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error)?;

            if let Some(actual) = conflicting {
                // Dropping the transaction rolls it back and releases the lock.
                let actual = from_db_position(actual)?;
                tracing::debug!(expected = %condition.after, %actual, "Append condition failed");
                return Err(EventStoreError::ConcurrencyConflict {
                    expected: condition.after,
                    actual,
                });
            }
        }

        let head = if events.is_empty() {
            log_head(&mut tx).await?
        } else {
            let mut insert =
                QueryBuilder::<Postgres>::new("INSERT INTO events (event_type, payload, tags, metadata) ");
            insert.push_values(&events, |mut row, event| {
                row.push_bind(&event.event_type)
                    .push_bind(&event.data)
                    .push_bind(Json(&event.tags))
                    .push_bind(&event.metadata);
            });
            insert.push(" RETURNING position");

            let positions: Vec<i64> = insert
                .build_query_scalar()
                .fetch_all(&mut *tx)
                .await
                .map_err(database_error)?;
            let last = positions.into_iter().max().unwrap_or_default();
            from_db_position(last)?
        };

        tx.commit().await.map_err(database_error)?;
        tracing::debug!(count = events.len(), %head, "Appended events");
        Ok(head)
    }
}

impl EventStore for PostgresEventStore {
    fn source(&self, criteria: EventCriteria) -> BoxFuture<'_, Result<SourcedEvents, EventStoreError>> {
        Box::pin(self.source_events(criteria))
    }

    fn append(
        &self,
        events: Vec<SerializedEvent>,
        condition: Option<AppendCondition>,
    ) -> BoxFuture<'_, Result<Position, EventStoreError>> {
        Box::pin(self.append_events(events, condition))
    }
}

async fn log_head(tx: &mut sqlx::Transaction<'_, Postgres>) -> Result<Position, EventStoreError> {
    let head: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) FROM events")
        .fetch_one(&mut **tx)
        .await
        .map_err(database_error)?;
    from_db_position(head)
}

fn stored_event(row: &PgRow) -> Result<StoredEvent, EventStoreError> {
    let position: i64 = row.try_get("position").map_err(database_error)?;
    let event_type: String = row.try_get("event_type").map_err(database_error)?;
    let data: Vec<u8> = row.try_get("payload").map_err(database_error)?;
    let Json(tags): Json<Tags> = row
        .try_get("tags")
        .map_err(|e| EventStoreError::SerializationError(format!("Invalid tags at {position}: {e}")))?;
    let metadata: Option<serde_json::Value> = row.try_get("metadata").map_err(database_error)?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at").map_err(database_error)?;

    let event = SerializedEvent::new(event_type, data, tags);
    Ok(StoredEvent {
        position: from_db_position(position)?,
        event: match metadata {
            Some(metadata) => event.with_metadata(metadata),
            None => event,
        },
        recorded_at,
    })
}

fn database_error(e: sqlx::Error) -> EventStoreError {
    EventStoreError::DatabaseError(e.to_string())
}

fn to_db_position(position: Position) -> Result<i64, EventStoreError> {
    i64::try_from(position.value())
        .map_err(|_| EventStoreError::DatabaseError(format!("Position {position} out of range")))
}

fn from_db_position(value: i64) -> Result<Position, EventStoreError> {
    u64::try_from(value)
        .map(Position::new)
        .map_err(|_| EventStoreError::DatabaseError(format!("Negative position {value}")))
}
