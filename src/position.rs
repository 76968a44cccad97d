use chrono::{DateTime, Utc};
use route_model::Waypoint;
use serde::{Deserialize, Serialize};

/// One location sample, from a sensor or from the path simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Degrees clockwise from north.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Meters per second.
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn at(point: Waypoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
            accuracy: None,
            heading: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_heading(mut self, heading: Option<f64>) -> Self {
        self.heading = heading;
        self
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.lat, self.lng)
    }
}
