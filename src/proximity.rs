use crate::configuration::Configuration;
use crate::geo_math::distance_meters;
use crate::position::Position;
use route_model::{Step, TransitStep, Waypoint};
use serde::Serialize;

/// How close the rider is to the current step's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    Traveling,
    Approaching,
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    WalkEnd,
    DepartureStop,
    ArrivalStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    pub location: Waypoint,
    pub kind: TargetKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub target: Target,
    pub distance_m: f64,
    pub proximity: Proximity,
    /// Boarded hint after this position was taken into account.
    pub boarded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityEvaluator {
    arrived_radius_m: f64,
    approaching_radius_m: f64,
    require_boarding: bool,
}

impl Default for ProximityEvaluator {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl ProximityEvaluator {
    pub fn new(arrived_radius_m: f64, approaching_radius_m: f64) -> Self {
        Self {
            arrived_radius_m,
            approaching_radius_m: approaching_radius_m.max(arrived_radius_m),
            require_boarding: false,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self {
            require_boarding: config.require_boarding,
            ..Self::new(config.arrived_radius_m, config.approaching_radius_m)
        }
    }

    /// Smallest radius wins.
    pub fn classify(&self, distance_m: f64) -> Proximity {
        if distance_m <= self.arrived_radius_m {
            Proximity::Arrived
        } else if distance_m <= self.approaching_radius_m {
            Proximity::Approaching
        } else {
            Proximity::Traveling
        }
    }

    /// Picks the location the rider is heading to and the updated boarded hint.
    ///
    /// A transit rider counts as boarded as soon as the arrival stop is closer than the
    /// departure stop. This is a heuristic: on a short hop between two close stops it can
    /// fire before the vehicle moves. Once set for a step, the hint stays set.
    pub fn resolve_target(
        &self,
        position: &Waypoint,
        step: &Step,
        boarded_hint: bool,
    ) -> Option<(Target, bool)> {
        match step {
            Step::Walk(walk) => walk.target().map(|location| {
                (
                    Target {
                        location,
                        kind: TargetKind::WalkEnd,
                    },
                    false,
                )
            }),
            Step::Transit(transit) => resolve_transit_target(position, transit, boarded_hint),
        }
    }

    pub fn evaluate(&self, position: &Position, step: &Step, boarded_hint: bool) -> Option<Evaluation> {
        let here = position.waypoint();
        let (target, boarded) = self.resolve_target(&here, step, boarded_hint)?;
        let distance_m = distance_meters(&here, &target.location);

        let mut proximity = self.classify(distance_m);
        if self.require_boarding
            && target.kind == TargetKind::DepartureStop
            && proximity == Proximity::Arrived
        {
            proximity = Proximity::Approaching;
        }

        Some(Evaluation {
            target,
            distance_m,
            proximity,
            boarded,
        })
    }
}

fn resolve_transit_target(
    position: &Waypoint,
    transit: &TransitStep,
    boarded_hint: bool,
) -> Option<(Target, bool)> {
    let departure = transit.departure_stop.resolved_location();
    let arrival = transit.arrival_stop.resolved_location();

    let to_arrival = |location| Target {
        location,
        kind: TargetKind::ArrivalStop,
    };
    let to_departure = |location| Target {
        location,
        kind: TargetKind::DepartureStop,
    };

    match (departure, arrival) {
        (_, Some(arrival)) if boarded_hint => Some((to_arrival(arrival), true)),
        (Some(departure), Some(arrival)) => {
            let distance_to_departure = distance_meters(position, &departure);
            let distance_to_arrival = distance_meters(position, &arrival);
            if distance_to_arrival < distance_to_departure {
                Some((to_arrival(arrival), true))
            } else {
                Some((to_departure(departure), false))
            }
        }
        // nothing to compare against, so no boarding inference
        (None, Some(arrival)) => Some((to_arrival(arrival), boarded_hint)),
        (Some(departure), None) => Some((to_departure(departure), boarded_hint)),
        (None, None) => None,
    }
}
