use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::{AppState, PreSerializedEvent};

type CurrentEvent = (&'static str, u64, Arc<Bytes>);

pub async fn dashboard_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Subscribe before replaying so nothing published in between is missed.
        let rx = state.event_tx.subscribe();
        let mut stream = BroadcastStream::new(rx);

        for (event_type, seq, data) in current_events(&state).await {
            if let Some(event) = sse_event(event_type, seq, &data) {
                yield Ok(event);
            }
        }

        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let (event_type, seq, data) = match event {
                        PreSerializedEvent::Statistics { seq, json } => ("statistics", seq, json),
                        PreSerializedEvent::Planets { seq, json } => ("planets", seq, json),
                    };
                    if let Some(event) = sse_event(event_type, seq, &data) {
                        yield Ok(event);
                    }
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying current dashboard"
                    );
                    for (event_type, seq, data) in current_events(&state).await {
                        if let Some(event) = sse_event(event_type, seq, &data) {
                            yield Ok(event);
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

/// Latest rendered statistics and planets events, whichever exist yet.
async fn current_events(state: &AppState) -> Vec<CurrentEvent> {
    let dashboard = state.dashboard.read().await;
    let mut events = Vec::with_capacity(2);
    if let Some(json) = dashboard.statistics_event.as_ref() {
        events.push(("statistics", dashboard.statistics.seq, Arc::clone(json)));
    }
    if let Some(json) = dashboard.planets_event.as_ref() {
        events.push(("planets", dashboard.planets.seq, Arc::clone(json)));
    }
    events
}

fn sse_event(event_type: &'static str, seq: u64, data: &Bytes) -> Option<Event> {
    let Ok(payload) = std::str::from_utf8(data.as_ref()) else {
        warn!(seq, event = event_type, "event payload is not valid utf-8; dropping SSE event");
        return None;
    };
    Some(
        Event::default()
            .id(seq.to_string())
            .event(event_type)
            .data(payload),
    )
}
