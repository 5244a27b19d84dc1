use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const DASHBOARD_CACHE_CONTROL: &str = "public, max-age=5";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (statistics_count, coordinate_count) = {
        let dashboard = state.dashboard.read().await;
        (
            dashboard.statistics.items.len(),
            dashboard.planets.coordinates.len(),
        )
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "statistics": statistics_count,
        "coordinates": coordinate_count,
        "observability": {
            "fetch_success_total": observability.fetch_success_total,
            "fetch_rate_limited_total": observability.fetch_rate_limited_total,
            "fetch_parse_failures_total": observability.fetch_parse_failures_total,
            "fetch_transport_failures_total": observability.fetch_transport_failures_total,
            "skipped_polls_total": observability.skipped_polls_total,
            "planet_sweeps_total": observability.planet_sweeps_total,
            "skipped_sweeps_total": observability.skipped_sweeps_total,
        }
    }))
}

/// Serve the pre-serialized statistics view; nothing is re-serialized per request.
pub async fn get_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (etag, json): (String, Arc<Bytes>) = {
        let dashboard = state.dashboard.read().await;
        (
            statistics_etag(dashboard.statistics.seq),
            Arc::clone(&dashboard.statistics_json),
        )
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(DASHBOARD_CACHE_CONTROL, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), DASHBOARD_CACHE_CONTROL, Some(etag.as_str()))
}

pub async fn get_planets(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (etag, json): (String, Arc<Bytes>) = {
        let dashboard = state.dashboard.read().await;
        (
            planets_etag(dashboard.planets.seq),
            Arc::clone(&dashboard.planets_json),
        )
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(DASHBOARD_CACHE_CONTROL, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), DASHBOARD_CACHE_CONTROL, Some(etag.as_str()))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (statistics_count, coordinate_count) = {
        let dashboard = state.dashboard.read().await;
        (
            dashboard.statistics.items.len(),
            dashboard.planets.coordinates.len(),
        )
    };
    let observability = state.observability.snapshot();

    let body = render_prometheus_metrics(statistics_count, coordinate_count, observability);

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

fn render_prometheus_metrics(
    statistics_count: usize,
    coordinate_count: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "helldivers_hub_statistics",
        "gauge",
        "Number of war statistics in the latest render.",
        statistics_count as u64,
    );
    write_metric(
        &mut body,
        "helldivers_hub_coordinates",
        "gauge",
        "Number of planet coordinates in the latest plot.",
        coordinate_count as u64,
    );
    write_metric(
        &mut body,
        "helldivers_hub_fetch_success_total",
        "counter",
        "Upstream fetches that decoded to JSON.",
        observability.fetch_success_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_fetch_rate_limited_total",
        "counter",
        "Upstream fetches answered with an exhausted quota; each schedules one retry.",
        observability.fetch_rate_limited_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_fetch_parse_failures_total",
        "counter",
        "Upstream responses whose body was not valid JSON.",
        observability.fetch_parse_failures_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_fetch_transport_failures_total",
        "counter",
        "Upstream fetches that failed at the network or status level.",
        observability.fetch_transport_failures_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_skipped_polls_total",
        "counter",
        "Polls dropped because a request was already in flight.",
        observability.skipped_polls_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_planet_sweeps_total",
        "counter",
        "Completed planet coordinate sweeps.",
        observability.planet_sweeps_total,
    );
    write_metric(
        &mut body,
        "helldivers_hub_skipped_sweeps_total",
        "counter",
        "Planet sweeps dropped because the previous sweep was still running.",
        observability.skipped_sweeps_total,
    );
    body
}

fn statistics_etag(seq: u64) -> String {
    format!("\"statistics-{seq}\"")
}

fn planets_etag(seq: u64) -> String {
    format!("\"planets-{seq}\"")
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
