use crate::Waypoint;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Vehicle used by a transit leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitMode {
    /// Used for short- and long-distance bus routes
    #[default]
    Bus,
    /// Tram, Streetcar, Light rail
    Tram,
    /// Any underground rail system within a metropolitan area
    Subway,
    /// Used for intercity or long-distance travel
    Rail,
    /// Used for short- and long-distance boat service
    Ferry,
    /// Anything the directions provider reports that is not listed above
    #[serde(other)]
    Other,
}

impl TransitMode {
    pub fn noun(&self) -> &'static str {
        match self {
            TransitMode::Bus => "bus",
            TransitMode::Tram => "tram",
            TransitMode::Subway => "subway",
            TransitMode::Rail => "train",
            TransitMode::Ferry => "ferry",
            TransitMode::Other => "vehicle",
        }
    }
}

impl Display for TransitMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.noun())
    }
}

/// A walking leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkStep {
    pub start: Waypoint,
    pub end: Waypoint,
    #[serde(default)]
    pub polyline: Vec<Waypoint>,
    #[serde(default)]
    pub distance_text: String,
    #[serde(default)]
    pub duration_text: String,
}

impl WalkStep {
    /// Where the rider should be at the end of the walk, if the data allows it.
    pub fn target(&self) -> Option<Waypoint> {
        Some(self.end).filter(Waypoint::is_valid)
    }
}

/// A named stop at either end of a transit ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStop {
    pub name: String,
    #[serde(default)]
    pub location: Option<Waypoint>,
}

impl TransitStop {
    pub fn new(name: impl Into<String>, location: Waypoint) -> Self {
        Self {
            name: name.into(),
            location: Some(location),
        }
    }

    /// The stop location, when it is present and usable.
    pub fn resolved_location(&self) -> Option<Waypoint> {
        self.location.filter(Waypoint::is_valid)
    }
}

/// A transit ride, from boarding at `departure_stop` to getting off at `arrival_stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitStep {
    pub line_id: String,
    #[serde(default)]
    pub headsign: String,
    #[serde(default)]
    pub vehicle: TransitMode,
    pub departure_stop: TransitStop,
    pub arrival_stop: TransitStop,
    #[serde(default)]
    pub scheduled_departure: String,
    #[serde(default)]
    pub scheduled_arrival: String,
    #[serde(default)]
    pub polyline: Vec<Waypoint>,
}

/// One leg of a [crate::Route].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Step {
    Walk(WalkStep),
    Transit(TransitStep),
}

impl Step {
    pub fn mode_name(&self) -> &'static str {
        match self {
            Step::Walk(_) => "walk",
            Step::Transit(_) => "transit",
        }
    }

    pub fn polyline(&self) -> &[Waypoint] {
        match self {
            Step::Walk(walk) => &walk.polyline,
            Step::Transit(transit) => &transit.polyline,
        }
    }

    /// Whether the step has at least one location the engine can measure progress against.
    pub fn is_resolvable(&self) -> bool {
        match self {
            Step::Walk(walk) => walk.target().is_some(),
            Step::Transit(transit) => {
                transit.departure_stop.resolved_location().is_some()
                    || transit.arrival_stop.resolved_location().is_some()
            }
        }
    }

    /// Geometry to draw for this leg. Falls back to the leg end points
    /// when the provider sent no polyline.
    pub fn geometry(&self) -> Vec<Waypoint> {
        let polyline = self.polyline();
        if polyline.len() >= 2 {
            return polyline.to_vec();
        }
        let ends = match self {
            Step::Walk(walk) => [Some(walk.start), Some(walk.end)],
            Step::Transit(transit) => [
                transit.departure_stop.location,
                transit.arrival_stop.location,
            ],
        };
        ends.into_iter()
            .flatten()
            .filter(Waypoint::is_valid)
            .collect()
    }
}
