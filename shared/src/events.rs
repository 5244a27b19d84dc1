use serde::{Deserialize, Serialize};

use crate::planet::{CanvasPoint, Coordinate};
use crate::war::StatItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    Statistics {
        #[serde(default)]
        seq: u64,
        items: Vec<StatItem>,
        timestamp: String,
    },
    Planets {
        #[serde(default)]
        seq: u64,
        coordinates: Vec<Coordinate>,
        points: Vec<CanvasPoint>,
        timestamp: String,
    },
}

/// Body of `GET /api/war/statistics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsView {
    pub seq: u64,
    pub timestamp: Option<String>,
    pub items: Vec<StatItem>,
}

/// Body of `GET /api/planets/coordinates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetsView {
    pub seq: u64,
    pub timestamp: Option<String>,
    pub coordinates: Vec<Coordinate>,
    pub points: Vec<CanvasPoint>,
}
