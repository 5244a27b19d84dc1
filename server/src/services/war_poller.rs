use std::sync::Arc;
use std::time::Duration;

use helldivers_hub_shared::filter_statistics;
use serde_json::Value;
use tracing::info;

use crate::config::WAR_ENDPOINT;
use crate::fetch::{FetchOutcome, HandlerFuture, PayloadHandler, PollRequest, RateLimitedFetcher};
use crate::render::StatisticsRenderer;
use crate::services::spawn_every;

/// Filters `statistics` down to the allowlist and hands the rows to the renderer.
pub struct WarStatisticsHandler {
    renderer: Arc<dyn StatisticsRenderer>,
}

impl WarStatisticsHandler {
    pub fn new(renderer: Arc<dyn StatisticsRenderer>) -> Self {
        Self { renderer }
    }
}

impl PayloadHandler for WarStatisticsHandler {
    fn handle<'a>(&'a self, _request: &'a PollRequest, payload: &'a Value) -> HandlerFuture<'a> {
        Box::pin(async move {
            let items = filter_statistics(payload);
            self.renderer.render_statistics(items).await;
        })
    }
}

/// One poll cycle. `None` when the previous cycle still holds the gate.
pub async fn poll_once(fetcher: &RateLimitedFetcher) -> Option<FetchOutcome> {
    fetcher.fetch(PollRequest::new(WAR_ENDPOINT)).await
}

/// Polls `war` immediately and then every `period`. Each tick runs as its own task, so
/// a slow cycle makes the next tick bounce off the gate instead of queueing behind it.
pub async fn run(fetcher: RateLimitedFetcher, period: Duration) {
    info!(interval_secs = period.as_secs(), "war statistics poller started");

    spawn_every(period, false, move || {
        let fetcher = fetcher.clone();
        async move {
            poll_once(&fetcher).await;
        }
    })
    .await;
}
