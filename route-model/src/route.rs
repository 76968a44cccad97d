use crate::{Error, Step, Waypoint};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A planned multi-leg trip.
///
/// Always has at least one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRoute")]
pub struct Route {
    steps: Vec<Step>,
    overview_polyline: Vec<Waypoint>,
    origin: Waypoint,
    destination: Waypoint,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRoute {
    steps: Vec<Step>,
    #[serde(default)]
    overview_polyline: Vec<Waypoint>,
    origin: Waypoint,
    destination: Waypoint,
}

impl TryFrom<RawRoute> for Route {
    type Error = Error;

    fn try_from(raw: RawRoute) -> Result<Self, Self::Error> {
        Route::new(raw.steps, raw.overview_polyline, raw.origin, raw.destination)
    }
}

impl Route {
    pub fn new(
        steps: Vec<Step>,
        overview_polyline: Vec<Waypoint>,
        origin: Waypoint,
        destination: Waypoint,
    ) -> Result<Self, Error> {
        if steps.is_empty() {
            return Err(Error::EmptyRoute);
        }
        let unresolvable = steps.iter().filter(|s| !s.is_resolvable()).count();
        if unresolvable > 0 {
            log::warn!("{unresolvable} step(s) have no usable target location");
        }
        Ok(Self {
            steps,
            overview_polyline,
            origin,
            destination,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn overview_polyline(&self) -> &[Waypoint] {
        &self.overview_polyline
    }

    pub fn origin(&self) -> Waypoint {
        self.origin
    }

    pub fn destination(&self) -> Waypoint {
        self.destination
    }
}
