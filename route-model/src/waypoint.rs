use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// A single latitude/longitude point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the usual latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn to_geo_types(points: &[Waypoint]) -> LineString {
        let coords: Vec<Coord> = points.iter().copied().map(Coord::from).collect();
        LineString::new(coords)
    }
}

impl From<Waypoint> for Coord {
    fn from(w: Waypoint) -> Self {
        Coord { x: w.lng, y: w.lat }
    }
}

impl From<Coord> for Waypoint {
    fn from(c: Coord) -> Self {
        Waypoint { lat: c.y, lng: c.x }
    }
}
