use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Map units -> canvas pixels.
pub const PLOT_SCALE: f64 = 10.0;
pub const POINT_RADIUS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

/// A coordinate projected onto the planet map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Coordinate {
    /// Extract `payload.position` as `{x, y}`. Both fields must be numeric.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let position = payload.get("position")?;
        Some(Self {
            x: position.get("x")?.as_f64()?,
            y: position.get("y")?.as_f64()?,
        })
    }

    pub fn to_canvas(self) -> CanvasPoint {
        CanvasPoint {
            x: self.x * PLOT_SCALE,
            y: self.y * PLOT_SCALE,
            radius: POINT_RADIUS,
        }
    }
}

pub fn canvas_points(coordinates: &[Coordinate]) -> Vec<CanvasPoint> {
    coordinates.iter().map(|c| c.to_canvas()).collect()
}
