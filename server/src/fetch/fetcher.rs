use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{ClientIdentity, SUPER_CLIENT_HEADER, SUPER_CONTACT_HEADER};
use crate::fetch::gate::FetchGate;
use crate::fetch::rate_limit::{RateLimitInfo, retry_delay};
use crate::state::ObservabilityCounters;

/// Resolves to `None` when the gate was busy and the poll was dropped.
pub type FetchFuture = Pin<Box<dyn Future<Output = Option<FetchOutcome>> + Send + 'static>>;
pub type RetryTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollRequest {
    endpoint: String,
}

impl PollRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

impl fmt::Display for PollRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("upstream status {status}; body preview: {preview}")]
    Status {
        status: reqwest::StatusCode,
        preview: String,
    },
}

/// Result of one admitted fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Value),
    RateLimited { retry_after_secs: f64 },
    ParseFailure,
    TransportFailure(TransportError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Receives every successfully decoded payload, including those delivered by retries.
pub trait PayloadHandler: Send + Sync {
    fn handle<'a>(&'a self, request: &'a PollRequest, payload: &'a Value) -> HandlerFuture<'a>;
}

/// Fire-and-forget delayed invocation. Scheduled tasks are never cancelled.
pub trait RetryScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: RetryTask);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRetryScheduler;

impl RetryScheduler for TokioRetryScheduler {
    fn schedule(&self, delay: Duration, task: RetryTask) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }
}

/// Issues gated GETs against the upstream API and interprets its rate-limit headers.
///
/// One fetcher owns one [`FetchGate`]; clones share it, so every clone (and every
/// retry it schedules) is serialized against the same in-flight flag.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    client: reqwest::Client,
    base_url: Arc<str>,
    identity: Arc<ClientIdentity>,
    gate: Arc<FetchGate>,
    handler: Arc<dyn PayloadHandler>,
    scheduler: Arc<dyn RetryScheduler>,
    observability: Arc<ObservabilityCounters>,
}

impl RateLimitedFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        identity: ClientIdentity,
        handler: Arc<dyn PayloadHandler>,
        scheduler: Arc<dyn RetryScheduler>,
        observability: Arc<ObservabilityCounters>,
    ) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            identity: Arc::new(identity),
            gate: Arc::new(FetchGate::new()),
            handler,
            scheduler,
            observability,
        }
    }

    #[cfg(test)]
    pub fn gate(&self) -> &FetchGate {
        &self.gate
    }

    pub fn fetch(&self, request: PollRequest) -> FetchFuture {
        let fetcher = self.clone();
        Box::pin(async move { fetcher.fetch_gated(request).await })
    }

    async fn fetch_gated(&self, request: PollRequest) -> Option<FetchOutcome> {
        let Some(permit) = self.gate.try_acquire() else {
            self.observability.record_skipped_poll();
            debug!(endpoint = %request, "request already in flight; skipping poll");
            return None;
        };

        let outcome = self
            .try_fetch(&request)
            .await
            .unwrap_or_else(FetchOutcome::TransportFailure);
        match &outcome {
            FetchOutcome::Success(payload) => self.handler.handle(&request, payload).await,
            FetchOutcome::TransportFailure(e) => {
                warn!(endpoint = %request, error = %e, "error fetching data");
            }
            FetchOutcome::RateLimited { .. } | FetchOutcome::ParseFailure => {}
        }
        drop(permit);

        self.observability.record_outcome(&outcome);
        if let FetchOutcome::RateLimited { retry_after_secs } = outcome {
            self.schedule_retry(request, retry_after_secs);
        }
        Some(outcome)
    }

    /// The retry is a brand-new fetch: it has to win the gate again when it fires.
    fn schedule_retry(&self, request: PollRequest, retry_after_secs: f64) {
        let delay = retry_delay(retry_after_secs);
        let retry = self.fetch(request);
        self.scheduler.schedule(
            delay,
            Box::pin(async move {
                let _ = retry.await;
            }),
        );
    }

    async fn try_fetch(&self, request: &PollRequest) -> Result<FetchOutcome, TransportError> {
        let resp = self
            .client
            .get(request.url(&self.base_url))
            .header(SUPER_CLIENT_HEADER, self.identity.client.as_str())
            .header(SUPER_CONTACT_HEADER, self.identity.contact.as_str())
            .send()
            .await?;

        let rate_limit = RateLimitInfo::from_headers(resp.headers());
        debug!(
            endpoint = %request,
            limit = ?rate_limit.limit,
            remaining = ?rate_limit.remaining,
            "rate limit headers"
        );

        if rate_limit.is_exhausted() {
            let retry_after_secs = rate_limit.retry_after_or_zero();
            info!(
                endpoint = %request,
                retry_after_secs,
                "rate limit exceeded, retrying after {retry_after_secs} seconds"
            );
            return Ok(FetchOutcome::RateLimited { retry_after_secs });
        }

        let status = resp.status();
        let text = resp.text().await.map_err(TransportError::Body)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                preview: body_preview(&text),
            });
        }
        debug!(endpoint = %request, body = %text, "raw API response");

        match serde_json::from_str::<Value>(&text) {
            Ok(payload) => Ok(FetchOutcome::Success(payload)),
            Err(e) => {
                error!(
                    endpoint = %request,
                    error = %e,
                    body_preview = %body_preview(&text),
                    "failed to parse JSON; response might not be JSON"
                );
                Ok(FetchOutcome::ParseFailure)
            }
        }
    }
}

fn body_preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_CHARS).collect()
}
