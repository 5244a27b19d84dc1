use std::sync::Arc;
use std::time::Duration;

use helldivers_hub_shared::Coordinate;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PLANETS_ENDPOINT;
use crate::fetch::{FetchGate, HandlerFuture, PayloadHandler, PollRequest, RateLimitedFetcher};
use crate::render::CoordinateRenderer;
use crate::services::spawn_every;
use crate::state::ObservabilityCounters;

type Accumulator = Arc<Mutex<Vec<Coordinate>>>;

/// Appends each planet's `position` to the sweep accumulator.
///
/// Late retries land here too, whichever sweep is current when they fire.
pub struct PlanetPositionHandler {
    accumulator: Accumulator,
}

impl PayloadHandler for PlanetPositionHandler {
    fn handle<'a>(&'a self, request: &'a PollRequest, payload: &'a Value) -> HandlerFuture<'a> {
        Box::pin(async move {
            match Coordinate::from_payload(payload) {
                Some(coordinate) => self.accumulator.lock().await.push(coordinate),
                None => {
                    warn!(endpoint = %request, "planet payload has no numeric position; skipping");
                }
            }
        })
    }
}

/// Sequential sweep over `planets/0..count`, feeding one coordinate list per sweep to the renderer.
#[derive(Clone)]
pub struct PlanetPoller {
    fetcher: RateLimitedFetcher,
    accumulator: Accumulator,
    sweep_gate: Arc<FetchGate>,
    renderer: Arc<dyn CoordinateRenderer>,
    observability: Arc<ObservabilityCounters>,
    planet_count: usize,
}

impl PlanetPoller {
    /// Builds the poller and its fetcher together so the fetcher's handler shares the accumulator.
    pub fn new(
        build_fetcher: impl FnOnce(Arc<dyn PayloadHandler>) -> RateLimitedFetcher,
        renderer: Arc<dyn CoordinateRenderer>,
        observability: Arc<ObservabilityCounters>,
        planet_count: usize,
    ) -> Self {
        let accumulator: Accumulator = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<dyn PayloadHandler> = Arc::new(PlanetPositionHandler {
            accumulator: Arc::clone(&accumulator),
        });

        Self {
            fetcher: build_fetcher(handler),
            accumulator,
            sweep_gate: Arc::new(FetchGate::new()),
            renderer,
            observability,
            planet_count,
        }
    }

    /// Returns the plotted coordinates, or `None` if another sweep was already running.
    pub async fn sweep(&self) -> Option<Vec<Coordinate>> {
        let Some(_sweep) = self.sweep_gate.try_acquire() else {
            self.observability.record_skipped_sweep();
            warn!("previous planet sweep still running; skipping this tick");
            return None;
        };

        self.accumulator.lock().await.clear();

        let mut fetched = 0usize;
        for index in 0..self.planet_count {
            let request = PollRequest::new(format!("{PLANETS_ENDPOINT}/{index}"));
            if self
                .fetcher
                .fetch(request)
                .await
                .is_some_and(|outcome| outcome.is_success())
            {
                fetched += 1;
            }
        }

        let coordinates = self.accumulator.lock().await.clone();
        self.observability.record_planet_sweep();
        info!(
            planets = self.planet_count,
            fetched,
            coordinates = coordinates.len(),
            "planet sweep complete"
        );
        self.renderer.plot_coordinates(coordinates.clone()).await;
        Some(coordinates)
    }

    /// First sweep starts one full `period` after startup.
    pub async fn run(self, period: Duration) {
        info!(
            interval_secs = period.as_secs(),
            planets = self.planet_count,
            "planet coordinate poller started"
        );

        spawn_every(period, true, move || {
            let poller = self.clone();
            async move {
                poller.sweep().await;
            }
        })
        .await;
    }
}
