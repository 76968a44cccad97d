//! GeoJSON export of the route, coloured by progress, for a map presenter.

use crate::session::NavigationSnapshot;
use geo_types::LineString;
use geojson::{Feature, FeatureCollection};
use log::debug;
use route_model::{Route, Step, TransitMode, Waypoint};

fn step_state(index: usize, current: Option<usize>) -> &'static str {
    match current {
        Some(current) if index < current => "done",
        Some(current) if index == current => "active",
        _ => "upcoming",
    }
}

fn mode_property(step: &Step) -> &'static str {
    match step {
        Step::Walk(_) => step.mode_name(),
        Step::Transit(transit) => match transit.vehicle {
            TransitMode::Bus => "bus",
            TransitMode::Tram => "tram",
            TransitMode::Subway => "subway",
            TransitMode::Rail => "rail",
            TransitMode::Ferry => "ferry",
            TransitMode::Other => "other",
        },
    }
}

/// Vary line-width based on how advanced the mode is
fn line_width(step: &Step) -> f64 {
    match step {
        Step::Walk(_) => 1.8,
        Step::Transit(transit) => match transit.vehicle {
            TransitMode::Rail => 4.9,
            TransitMode::Subway => 4.3,
            TransitMode::Tram => 3.4,
            _ => 2.6,
        },
    }
}

fn step_feature(index: usize, step: &Step, current: Option<usize>) -> Option<Feature> {
    let points = step.geometry();
    if points.len() < 2 {
        debug!("Step {index} has no drawable geometry");
        return None;
    }
    let line: LineString = Waypoint::to_geo_types(&points);
    let mut feature = Feature::from(geojson::Value::from(&line));
    feature.set_property("step_index", index);
    feature.set_property("mode", mode_property(step));
    feature.set_property("state", step_state(index, current));
    feature.set_property("line_width", line_width(step));
    Some(feature)
}

/// One line per step plus, once a position is known, a point for the rider.
///
/// Without a snapshot every step is "upcoming". Once the trip is complete every step is "done".
pub fn route_highlight(route: &Route, snapshot: Option<&NavigationSnapshot>) -> FeatureCollection {
    let current = snapshot.map(|s| s.current_step_index);
    let mut features: Vec<Feature> = route
        .steps()
        .iter()
        .enumerate()
        .filter_map(|(index, step)| step_feature(index, step, current))
        .collect();

    if let Some(position) = snapshot.and_then(|s| s.current_position.as_ref()) {
        let mut feature = Feature::from(geojson::Value::Point(vec![position.lng, position.lat]));
        feature.set_property("kind", "position");
        if let Some(heading) = snapshot.and_then(|s| s.current_heading) {
            feature.set_property("heading", heading);
        }
        features.push(feature);
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
