use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use helldivers_hub_shared::{PlanetsView, StatisticsView};
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::config::{
    DEFAULT_SUPER_CLIENT, sse_broadcast_buffer, upstream_connect_timeout, upstream_http_timeout,
};
use crate::fetch::FetchOutcome;

/// Pre-serialized SSE event, serialized once by the renderer and shared by all clients via Arc.
#[derive(Debug, Clone)]
pub enum PreSerializedEvent {
    Statistics { seq: u64, json: Arc<Bytes> },
    Planets { seq: u64, json: Arc<Bytes> },
}

/// Latest rendered dashboard data plus its pre-serialized API and SSE payloads.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub statistics: StatisticsView,
    pub statistics_json: Arc<Bytes>,
    pub statistics_event: Option<Arc<Bytes>>,
    pub planets: PlanetsView,
    pub planets_json: Arc<Bytes>,
    pub planets_event: Option<Arc<Bytes>>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        let statistics = StatisticsView {
            seq: 0,
            timestamp: None,
            items: Vec::new(),
        };
        let planets = PlanetsView {
            seq: 0,
            timestamp: None,
            coordinates: Vec::new(),
            points: Vec::new(),
        };
        let statistics_json = serde_json::to_vec(&statistics)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(br#"{"seq":0,"timestamp":null,"items":[]}"#));
        let planets_json = serde_json::to_vec(&planets)
            .map(Bytes::from)
            .unwrap_or_else(|_| {
                Bytes::from_static(br#"{"seq":0,"timestamp":null,"coordinates":[],"points":[]}"#)
            });

        Self {
            statistics,
            statistics_json: Arc::new(statistics_json),
            statistics_event: None,
            planets,
            planets_json: Arc::new(planets_json),
            planets_event: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<RwLock<DashboardSnapshot>>,
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
    pub http_client: reqwest::Client,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    fetch_success_total: AtomicU64,
    fetch_rate_limited_total: AtomicU64,
    fetch_parse_failures_total: AtomicU64,
    fetch_transport_failures_total: AtomicU64,
    skipped_polls_total: AtomicU64,
    planet_sweeps_total: AtomicU64,
    skipped_sweeps_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub fetch_success_total: u64,
    pub fetch_rate_limited_total: u64,
    pub fetch_parse_failures_total: u64,
    pub fetch_transport_failures_total: u64,
    pub skipped_polls_total: u64,
    pub planet_sweeps_total: u64,
    pub skipped_sweeps_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            fetch_success_total: self.fetch_success_total.load(Ordering::Relaxed),
            fetch_rate_limited_total: self.fetch_rate_limited_total.load(Ordering::Relaxed),
            fetch_parse_failures_total: self.fetch_parse_failures_total.load(Ordering::Relaxed),
            fetch_transport_failures_total: self
                .fetch_transport_failures_total
                .load(Ordering::Relaxed),
            skipped_polls_total: self.skipped_polls_total.load(Ordering::Relaxed),
            planet_sweeps_total: self.planet_sweeps_total.load(Ordering::Relaxed),
            skipped_sweeps_total: self.skipped_sweeps_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_outcome(&self, outcome: &FetchOutcome) {
        let counter = match outcome {
            FetchOutcome::Success(_) => &self.fetch_success_total,
            FetchOutcome::RateLimited { .. } => &self.fetch_rate_limited_total,
            FetchOutcome::ParseFailure => &self.fetch_parse_failures_total,
            FetchOutcome::TransportFailure(_) => &self.fetch_transport_failures_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_poll(&self) {
        self.skipped_polls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_planet_sweep(&self) {
        self.planet_sweeps_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_sweep(&self) {
        self.skipped_sweeps_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new() -> Result<Self, reqwest::Error> {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent(format!("{DEFAULT_SUPER_CLIENT}/{}", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })?;

        Ok(Self {
            dashboard: Arc::new(RwLock::new(DashboardSnapshot::default())),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
            http_client,
            observability: Arc::new(ObservabilityCounters::default()),
        })
    }
}
