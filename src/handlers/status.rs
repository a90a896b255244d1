//! Status and health check handlers for the site-meta server.
//!
//! - `/status` - server status with inspection counters and runtime metrics
//! - `/health` - liveness probe
//! - `/ready` - readiness probe
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "name": "site-meta",
//!   "uptime_seconds": 3600,
//!   "inspections_processed": 1024,
//!   "inspection_errors": 12,
//!   "memory": { "rss_bytes": 52428800, "virtual_bytes": 268435456 },
//!   "latency": { "p50_ms": 120.5, "p95_ms": 450.2, "p99_ms": 980.7, ... },
//!   "status": "running",
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, instrument};

use crate::fetch::UserSettings;
use crate::pipeline::SiteInspector;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Liveness/readiness body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" whenever the server answers
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Body of `/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server version
    pub version: String,
    /// Server name
    pub name: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Inspections that produced a record
    pub inspections_processed: u64,
    /// Inspections that failed (input, fetch or timeout)
    pub inspection_errors: u64,
    /// Process memory usage
    pub memory: MemoryMetrics,
    /// Inspection latency percentiles
    pub latency: LatencyMetrics,
    /// Always "running"
    pub status: String,
    /// RFC 3339 generation time
    pub timestamp: String,
}

/// Memory usage metrics collected from sysinfo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Resident set size (bytes)
    pub rss_bytes: u64,
    /// Virtual memory size (bytes)
    pub virtual_bytes: u64,
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// Median
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
    /// Number of samples
    pub total_requests: u64,
    /// Mean
    pub mean_ms: f64,
    /// Maximum
    pub max_ms: f64,
}

/// Thread-safe latency histogram.
///
/// Tracks 1us to 60s with 3 significant figures; samples outside the bounds
/// are dropped.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, 60_000_000, 3).expect("static histogram bounds");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a duration
    pub fn record(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let _ = self.inner.write().record(micros.max(1));
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Percentiles converted to milliseconds
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1000.0,
            total_requests: hist.len(),
            mean_ms: hist.mean() / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state behind every route.
///
/// Holds the inspector (one pooled HTTP client for all requests), the
/// settings used when a request carries no `userAgent` cookie, and the
/// counters reported by `/status`.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use site_meta::handlers::AppState;
/// use site_meta::{SiteInspector, UserSettings};
///
/// let inspector = SiteInspector::new().unwrap();
/// let state = Arc::new(AppState::new(inspector, UserSettings::default()));
/// state.record_inspection(std::time::Duration::from_millis(120));
/// ```
#[derive(Debug)]
pub struct AppState {
    inspector: SiteInspector,
    default_settings: UserSettings,
    start_time: Instant,
    inspections_processed: AtomicU64,
    inspection_errors: AtomicU64,
    latency_histogram: LatencyHistogram,
}

impl AppState {
    /// Create state around an inspector
    pub fn new(inspector: SiteInspector, default_settings: UserSettings) -> Self {
        Self {
            inspector,
            default_settings,
            start_time: Instant::now(),
            inspections_processed: AtomicU64::new(0),
            inspection_errors: AtomicU64::new(0),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// The shared inspector
    pub fn inspector(&self) -> &SiteInspector {
        &self.inspector
    }

    /// Settings used when a request has none of its own
    pub fn default_settings(&self) -> &UserSettings {
        &self.default_settings
    }

    /// Seconds since startup
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record a successful inspection and its latency; returns the new total.
    pub fn record_inspection(&self, elapsed: Duration) -> u64 {
        self.latency_histogram.record(elapsed);
        self.inspections_processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a failed inspection; returns the new error total.
    pub fn record_error(&self) -> u64 {
        self.inspection_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Successful inspections so far
    #[inline]
    pub fn inspections_processed(&self) -> u64 {
        self.inspections_processed.load(Ordering::Relaxed)
    }

    /// Failed inspections so far
    #[inline]
    pub fn inspection_errors(&self) -> u64 {
        self.inspection_errors.load(Ordering::Relaxed)
    }

    /// Latency percentiles of successful inspections
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }
}

/// Memory usage of the current process, zeroed if sysinfo cannot see it.
fn collect_memory_metrics() -> MemoryMetrics {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match system.process(pid) {
        Some(process) => MemoryMetrics {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        },
        None => {
            debug!("Could not find current process in sysinfo");
            MemoryMetrics::default()
        }
    }
}

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /status`
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Status check requested");

    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        inspections_processed: state.inspections_processed(),
        inspection_errors: state.inspection_errors(),
        memory: collect_memory_metrics(),
        latency: state.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

/// `GET /ready`
///
/// The server holds no external connections, so it is ready as soon as it
/// answers.
#[instrument(skip_all)]
pub async fn readiness_handler() -> impl IntoResponse {
    debug!("Readiness check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}
