//! Synthetic position feed that walks along a route's overview polyline.
//!
//! The simulator owns no timer. Whoever drives it calls [PathSimulator::tick] once per
//! [PathSimulator::period]; this keeps a run fully reproducible for a given polyline,
//! speed sequence and tick count.

use crate::configuration::SimulatorConfig;
use crate::geo_math::bearing_degrees;
use crate::position::Position;
use crate::time::Clock;
use log::{debug, info, warn};
use route_model::{Route, Waypoint};
use std::time::Duration;

const VERTEX_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorState {
    /// Fraction of the polyline covered, within `[0, 1]`.
    pub progress: f64,
    pub speed_multiplier: f64,
    pub last_point: Option<Waypoint>,
}

pub struct PathSimulator {
    config: SimulatorConfig,
    polyline: Vec<Waypoint>,
    state: SimulatorState,
    last_heading: Option<f64>,
    running: bool,
    finished: bool,
    clock: Box<dyn Clock>,
}

impl PathSimulator {
    pub fn new(config: SimulatorConfig, clock: Box<dyn Clock>) -> Self {
        let speed = valid_speed(config.initial_speed).unwrap_or(1.0);
        Self {
            config,
            polyline: Vec::new(),
            state: SimulatorState {
                progress: 0.0,
                speed_multiplier: speed,
                last_point: None,
            },
            last_heading: None,
            running: false,
            finished: false,
            clock,
        }
    }

    pub fn load(&mut self, route: &Route) {
        self.load_polyline(route.overview_polyline().to_vec());
    }

    /// Replaces the path and resets all progress. Keeps the speed multiplier.
    pub fn load_polyline(&mut self, polyline: Vec<Waypoint>) {
        if polyline.len() < 2 {
            warn!(
                "Simulator path has {} point(s); simulation disabled",
                polyline.len()
            );
        }
        self.polyline = polyline;
        self.state.progress = 0.0;
        self.state.last_point = None;
        self.last_heading = None;
        self.running = false;
        self.finished = false;
    }

    /// Stops the timer and forgets the path.
    pub fn dispose(&mut self) {
        self.load_polyline(Vec::new());
    }

    /// A path with fewer than two points never emits.
    pub fn is_noop(&self) -> bool {
        self.polyline.len() < 2
    }

    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn speed(&self) -> f64 {
        self.state.speed_multiplier
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The end of the path was reached. Only [PathSimulator::reset] or a new load clears it.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Time between two ticks at the current speed.
    pub fn period(&self) -> Duration {
        self.config.base_period().div_f64(self.state.speed_multiplier)
    }

    pub fn start(&mut self) {
        if self.is_noop() || self.finished || self.running {
            debug!(
                "Simulator start ignored (noop: {}, finished: {}, running: {})",
                self.is_noop(),
                self.finished,
                self.running
            );
            return;
        }
        info!("Simulator started at {}x", self.state.speed_multiplier);
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.start();
    }

    /// Back to the first point with no bearing history. Returns the relocated position.
    pub fn reset(&mut self) -> Option<Position> {
        self.state.progress = 0.0;
        self.last_heading = None;
        if self.finished {
            self.finished = false;
            self.running = false;
        }
        let first = *self.polyline.first()?;
        if self.is_noop() {
            return None;
        }
        self.state.last_point = Some(first);
        Some(Position::at(first, self.clock.now()))
    }

    /// Jumps to `target` without touching progress. The next tick measures its bearing from `target`.
    pub fn skip_to(&mut self, target: Waypoint) -> Option<Position> {
        if self.is_noop() {
            return None;
        }
        let heading = self.heading_towards(target);
        Some(self.emit(target, heading))
    }

    /// Moves progress forward to the next vertex of the path.
    pub fn skip_to_next_waypoint(&mut self) -> Option<Position> {
        if self.is_noop() || self.finished {
            return None;
        }
        let last_index = self.polyline.len() - 1;
        // progress set by a previous skip can land just below its vertex
        let fractional = self.state.progress * last_index as f64 + VERTEX_EPSILON;
        let next = (fractional.floor() as usize + 1).min(last_index);

        self.state.progress = next as f64 / last_index as f64;
        let point = self.polyline[next];
        let heading = self.heading_towards(point);
        let position = self.emit(point, heading);
        if next == last_index {
            self.finish();
        }
        Some(position)
    }

    /// Changes the rate of future ticks. Returns false for a non-positive or non-finite multiplier.
    pub fn set_speed(&mut self, multiplier: f64) -> bool {
        match valid_speed(multiplier) {
            Some(speed) => {
                debug!("Simulator speed {} -> {}", self.state.speed_multiplier, speed);
                self.state.speed_multiplier = speed;
                true
            }
            None => {
                warn!("Ignoring invalid simulator speed {multiplier}");
                false
            }
        }
    }

    /// One timer period elapsed.
    pub fn tick(&mut self) -> Option<Position> {
        if !self.running || self.is_noop() {
            return None;
        }
        let step = self.config.progress_step * self.state.speed_multiplier;
        self.state.progress = (self.state.progress + step).min(1.0);

        let point = self.point_at(self.state.progress);
        let heading = self.heading_towards(point);
        let position = self.emit(point, heading);

        if self.state.progress >= 1.0 {
            self.finish();
        }
        Some(position)
    }

    fn finish(&mut self) {
        info!("Simulator reached the end of the path");
        self.state.progress = 1.0;
        self.running = false;
        self.finished = true;
    }

    fn emit(&mut self, point: Waypoint, heading: f64) -> Position {
        self.state.last_point = Some(point);
        self.last_heading = Some(heading);
        Position::at(point, self.clock.now()).with_heading(Some(heading))
    }

    fn heading_towards(&self, point: Waypoint) -> f64 {
        match self.state.last_point {
            Some(prev) if prev != point => bearing_degrees(&prev, &point),
            Some(_) => self.last_heading.unwrap_or_else(|| self.initial_heading()),
            None => self.initial_heading(),
        }
    }

    fn initial_heading(&self) -> f64 {
        bearing_degrees(&self.polyline[0], &self.polyline[1])
    }

    fn point_at(&self, progress: f64) -> Waypoint {
        let last_index = self.polyline.len() - 1;
        if progress >= 1.0 {
            return self.polyline[last_index];
        }
        let fractional = progress.max(0.0) * last_index as f64;
        let index = (fractional.floor() as usize).min(last_index - 1);
        let fraction = fractional - index as f64;

        let start = self.polyline[index];
        let end = self.polyline[index + 1];
        Waypoint::new(
            start.lat + (end.lat - start.lat) * fraction,
            start.lng + (end.lng - start.lng) * fraction,
        )
    }
}

fn valid_speed(multiplier: f64) -> Option<f64> {
    (multiplier.is_finite() && multiplier > 0.0).then_some(multiplier)
}
