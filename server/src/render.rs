use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use chrono::Utc;
use helldivers_hub_shared::{
    Coordinate, DashboardEvent, PlanetsView, StatItem, StatisticsView, canvas_points,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::state::{AppState, PreSerializedEvent};

pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Consumer of the filtered war statistics list.
pub trait StatisticsRenderer: Send + Sync {
    fn render_statistics(&self, items: Vec<StatItem>) -> RenderFuture<'_>;
}

/// Consumer of one full planet sweep's coordinates, in request order.
pub trait CoordinateRenderer: Send + Sync {
    fn plot_coordinates(&self, coordinates: Vec<Coordinate>) -> RenderFuture<'_>;
}

impl StatisticsRenderer for AppState {
    fn render_statistics(&self, items: Vec<StatItem>) -> RenderFuture<'_> {
        Box::pin(publish_statistics(self, items))
    }
}

impl CoordinateRenderer for AppState {
    fn plot_coordinates(&self, coordinates: Vec<Coordinate>) -> RenderFuture<'_> {
        Box::pin(publish_planets(self, coordinates))
    }
}

fn next_seq(state: &AppState) -> Option<u64> {
    let previous = state.next_seq.fetch_add(1, Ordering::Relaxed);
    let seq = previous.checked_add(1);
    if seq.is_none() {
        warn!("sequence counter overflow while rendering dashboard event");
    }
    seq
}

fn serialize_json<T: Serialize>(value: &T, context: &str) -> Option<Arc<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(json) => Some(Arc::new(Bytes::from(json))),
        Err(e) => {
            warn!("failed to serialize {context}: {e}");
            None
        }
    }
}

async fn publish_statistics(state: &AppState, items: Vec<StatItem>) {
    let Some(seq) = next_seq(state) else {
        return;
    };
    let timestamp = Utc::now().to_rfc3339();
    let item_count = items.len();

    let Some(event_json) = serialize_json(
        &DashboardEvent::Statistics {
            seq,
            items: items.clone(),
            timestamp: timestamp.clone(),
        },
        "statistics event",
    ) else {
        return;
    };
    let view = StatisticsView {
        seq,
        timestamp: Some(timestamp),
        items,
    };
    let Some(view_json) = serialize_json(&view, "statistics view") else {
        return;
    };

    {
        let mut dashboard = state.dashboard.write().await;
        dashboard.statistics = view;
        dashboard.statistics_json = view_json;
        dashboard.statistics_event = Some(Arc::clone(&event_json));
    }

    let _ = state.event_tx.send(PreSerializedEvent::Statistics {
        seq,
        json: event_json,
    });
    debug!(seq, items = item_count, "rendered war statistics");
}

async fn publish_planets(state: &AppState, coordinates: Vec<Coordinate>) {
    let Some(seq) = next_seq(state) else {
        return;
    };
    let timestamp = Utc::now().to_rfc3339();
    let points = canvas_points(&coordinates);
    let coordinate_count = coordinates.len();

    let Some(event_json) = serialize_json(
        &DashboardEvent::Planets {
            seq,
            coordinates: coordinates.clone(),
            points: points.clone(),
            timestamp: timestamp.clone(),
        },
        "planets event",
    ) else {
        return;
    };
    let view = PlanetsView {
        seq,
        timestamp: Some(timestamp),
        coordinates,
        points,
    };
    let Some(view_json) = serialize_json(&view, "planets view") else {
        return;
    };

    {
        let mut dashboard = state.dashboard.write().await;
        dashboard.planets = view;
        dashboard.planets_json = view_json;
        dashboard.planets_event = Some(Arc::clone(&event_json));
    }

    let _ = state.event_tx.send(PreSerializedEvent::Planets {
        seq,
        json: event_json,
    });
    debug!(seq, coordinates = coordinate_count, "plotted planet coordinates");
}
