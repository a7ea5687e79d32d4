//! Write-side metrics in Prometheus format.
//!
//! Recorded by the command handler:
//! - `commands_executed_total{command, outcome}` and `command_duration_seconds{command}`
//! - `command_conflicts_total{command}` and `command_retries_exhausted_total{command}`
//! - `event_store_events_{appended,sourced}_total` with their duration histograms
//!
//! Nothing is exported until [`MetricsServer::start`] installs the recorder;
//! before that every `counter!`/`histogram!` call is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use cinema_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut metrics = MetricsServer::new("0.0.0.0:9090".parse()?);
//! metrics.start()?;
//!
//! if let Some(text) = metrics.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Latency buckets, in seconds, for every `*_duration_seconds` histogram.
/// A conflict-free command against a local store sits in the low milliseconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Errors installing the Prometheus recorder.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The histogram buckets were refused.
    #[error("Invalid metrics configuration: {0}")]
    Build(String),
    /// Another recorder could not be replaced.
    #[error("Could not install the metrics recorder: {0}")]
    Install(String),
}

/// Owner of the process-wide Prometheus recorder.
///
/// The scrape endpoint itself belongs to the embedding application; this
/// type only installs the recorder and renders the exposition text.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Recorder advertised at `addr`. Nothing is installed yet.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe every metric and install the recorder.
    ///
    /// A recorder installed earlier in the process (by another server or a
    /// test) is kept: the call logs a warning, succeeds, and [`render`](Self::render)
    /// stays `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] when the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                self.handle = Some(handle);
                Ok(())
            }
            Err(BuildError::FailedToSetGlobalRecorder(_)) => {
                tracing::warn!(addr = %self.addr, "A metrics recorder is already installed, keeping it");
                Ok(())
            }
            Err(e) => Err(MetricsError::Install(e.to_string())),
        }
    }

    /// Address the scrape endpoint is advertised on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle of the recorder this server installed.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Exposition text for a `/metrics` response.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Command Metrics
    describe_counter!(
        "commands_executed_total",
        "Total number of commands executed, labelled by command and outcome"
    );
    describe_counter!(
        "command_conflicts_total",
        "Total number of conditional appends rejected by a concurrency conflict"
    );
    describe_counter!(
        "command_retries_exhausted_total",
        "Total number of commands that gave up after exhausting their attempts"
    );
    describe_histogram!(
        "command_duration_seconds",
        "Time taken to execute a command, retries included"
    );

    // Event Store Metrics
    describe_counter!(
        "event_store_events_appended_total",
        "Total number of events appended to the event store"
    );
    describe_counter!(
        "event_store_events_sourced_total",
        "Total number of events sourced from the event store"
    );
    describe_histogram!(
        "event_store_append_duration_seconds",
        "Time taken to append events"
    );
    describe_histogram!(
        "event_store_source_duration_seconds",
        "Time taken to source events"
    );
}

/// Outcome label of one command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Events were appended, or the command was a no-op.
    Accepted,
    /// A business rule rejected the command.
    Rejected,
    /// Every attempt hit a concurrency conflict.
    Exhausted,
    /// The store or the codec failed.
    Failed,
}

impl CommandOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

/// Command metrics recorder.
pub struct CommandMetrics;

impl CommandMetrics {
    /// Record a finished command execution.
    pub fn record_execution(command: &'static str, outcome: CommandOutcome, duration: Duration) {
        counter!("commands_executed_total", "command" => command, "outcome" => outcome.as_str())
            .increment(1);
        histogram!("command_duration_seconds", "command" => command).record(duration.as_secs_f64());
    }

    /// Record a concurrency conflict on append.
    pub fn record_conflict(command: &'static str) {
        counter!("command_conflicts_total", "command" => command).increment(1);
    }

    /// Record a command giving up after its last attempt.
    pub fn record_exhausted(command: &'static str) {
        counter!("command_retries_exhausted_total", "command" => command).increment(1);
    }
}

/// Event store metrics recorder.
pub struct EventStoreMetrics;

impl EventStoreMetrics {
    /// Record an event append operation.
    pub fn record_append(count: usize, duration: Duration) {
        counter!("event_store_events_appended_total").increment(count as u64);
        histogram!("event_store_append_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a source operation.
    pub fn record_source(count: usize, duration: Duration) {
        counter!("event_store_events_sourced_total").increment(count as u64);
        histogram!("event_store_source_duration_seconds").record(duration.as_secs_f64());
    }
}
