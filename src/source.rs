//! Position producers: a live sensor subscription and the path simulator.
//!
//! Both push into a [PositionSink]. Only one of them is meant to be active at a time;
//! the selection is done by the caller (see `Navigator`), not by the state machine.

use crate::position::Position;
use crate::simulator::PathSimulator;
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location is not supported on this device")]
    Unsupported,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a location fix")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Live,
    Simulated,
}

/// Options passed to the platform watch call.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    pub maximum_age: Duration,
    pub timeout: Option<Duration>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: None,
        }
    }
}

/// Platform "watch position" capability.
pub trait Sensor {
    fn watch(&mut self, options: &WatchOptions) -> Result<(), SensorError>;
    fn clear_watch(&mut self);
}

/// Consumer side of a feed.
pub trait PositionSink {
    fn push(&mut self, position: Position);
    fn fail(&mut self, error: SensorError);
}

pub trait PositionSource {
    fn kind(&self) -> SourceKind;
    fn start(&mut self) -> Result<(), SensorError>;
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// A sensor whose readings are pushed in from outside (a channel, a pipe, a test).
/// Watching only flips a flag; the readings themselves go through [LiveFeed::deliver].
#[derive(Debug, Default)]
pub struct StreamSensor {
    unavailable: Option<SensorError>,
    watching: bool,
}

impl StreamSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sensor that refuses to start with `error`.
    pub fn failing(error: SensorError) -> Self {
        Self {
            unavailable: Some(error),
            watching: false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }
}

impl Sensor for StreamSensor {
    fn watch(&mut self, _options: &WatchOptions) -> Result<(), SensorError> {
        if let Some(e) = &self.unavailable {
            return Err(e.clone());
        }
        self.watching = true;
        Ok(())
    }

    fn clear_watch(&mut self) {
        self.watching = false;
    }
}

pub struct LiveFeed<S> {
    sensor: S,
    options: WatchOptions,
    active: bool,
}

impl<S: Sensor> LiveFeed<S> {
    pub fn new(sensor: S) -> Self {
        Self::with_options(sensor, WatchOptions::default())
    }

    pub fn with_options(sensor: S, options: WatchOptions) -> Self {
        Self {
            sensor,
            options,
            active: false,
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Called from the platform callback. Readings after [PositionSource::stop] are dropped.
    pub fn deliver(&mut self, reading: Result<Position, SensorError>, sink: &mut dyn PositionSink) {
        if !self.active {
            trace!("Dropping live reading: feed not active");
            return;
        }
        match reading {
            Ok(position) => sink.push(position),
            Err(e) => sink.fail(e),
        }
    }
}

impl<S: Sensor> PositionSource for LiveFeed<S> {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn start(&mut self) -> Result<(), SensorError> {
        if self.active {
            return Ok(());
        }
        self.sensor.watch(&self.options).map_err(|e| {
            warn!("Live location failed to start: {e}");
            e
        })?;
        info!("Live location started");
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.active {
            self.sensor.clear_watch();
            self.active = false;
            info!("Live location stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Drives a [PathSimulator] from elapsed time.
pub struct SimulatedFeed {
    simulator: PathSimulator,
    pending: Duration,
    active: bool,
}

impl SimulatedFeed {
    pub fn new(simulator: PathSimulator) -> Self {
        Self {
            simulator,
            pending: Duration::ZERO,
            active: false,
        }
    }

    pub fn simulator(&self) -> &PathSimulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut PathSimulator {
        &mut self.simulator
    }

    /// Runs every tick that fits into the accumulated time. A speed change applies from the next tick on.
    pub fn advance(&mut self, elapsed: Duration, sink: &mut dyn PositionSink) -> usize {
        if !self.active || !self.simulator.is_running() {
            self.pending = Duration::ZERO;
            return 0;
        }
        self.pending += elapsed;
        let mut ticks = 0;
        loop {
            let period = self.simulator.period();
            if self.pending < period || !self.simulator.is_running() {
                break;
            }
            self.pending -= period;
            if let Some(position) = self.simulator.tick() {
                sink.push(position);
                ticks += 1;
            }
        }
        if !self.simulator.is_running() {
            self.pending = Duration::ZERO;
        }
        ticks
    }

    /// Pushes a position produced outside of a tick (reset, skip) when the feed is active.
    pub fn forward(&mut self, position: Option<Position>, sink: &mut dyn PositionSink) {
        match position {
            Some(position) if self.active => sink.push(position),
            Some(_) => trace!("Dropping simulated position: feed not active"),
            None => {}
        }
    }
}

impl PositionSource for SimulatedFeed {
    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }

    fn start(&mut self) -> Result<(), SensorError> {
        self.active = true;
        self.pending = Duration::ZERO;
        self.simulator.start();
        debug!("Simulated feed active (period {:?})", self.simulator.period());
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
        self.pending = Duration::ZERO;
        self.simulator.pause();
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::SimulatorConfig;
    use crate::time::SystemClock;
    use route_model::Waypoint;

    #[derive(Default)]
    struct Collect {
        positions: Vec<Position>,
        errors: Vec<SensorError>,
    }

    impl PositionSink for Collect {
        fn push(&mut self, position: Position) {
            self.positions.push(position);
        }
        fn fail(&mut self, error: SensorError) {
            self.errors.push(error);
        }
    }

    struct FakeSensor {
        result: Result<(), SensorError>,
        watching: bool,
    }

    impl Sensor for FakeSensor {
        fn watch(&mut self, options: &WatchOptions) -> Result<(), SensorError> {
            assert!(options.high_accuracy);
            assert_eq!(Duration::ZERO, options.maximum_age);
            self.result.clone()?;
            self.watching = true;
            Ok(())
        }
        fn clear_watch(&mut self) {
            self.watching = false;
        }
    }

    fn feed() -> SimulatedFeed {
        let mut simulator = PathSimulator::new(SimulatorConfig::default(), Box::new(SystemClock));
        simulator.load_polyline(vec![Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 1.0)]);
        SimulatedFeed::new(simulator)
    }

    #[test]
    fn live_feed_forwards_only_while_active() {
        let mut live = LiveFeed::new(FakeSensor {
            result: Ok(()),
            watching: false,
        });
        let mut sink = Collect::default();
        let reading = Position::at(Waypoint::new(1.0, 1.0), chrono::Utc::now());

        live.deliver(Ok(reading.clone()), &mut sink);
        assert!(sink.positions.is_empty());

        live.start().unwrap();
        assert!(live.sensor().watching);
        live.deliver(Ok(reading.clone()), &mut sink);
        live.deliver(Err(SensorError::Timeout), &mut sink);
        assert_eq!(1, sink.positions.len());
        assert_eq!(vec![SensorError::Timeout], sink.errors);

        live.stop();
        assert!(!live.sensor().watching);
        live.deliver(Ok(reading), &mut sink);
        assert_eq!(1, sink.positions.len());
    }

    #[test]
    fn live_feed_reports_start_failure() {
        let mut live = LiveFeed::new(FakeSensor {
            result: Err(SensorError::PermissionDenied),
            watching: false,
        });
        assert_eq!(Err(SensorError::PermissionDenied), live.start());
        assert!(!live.is_active());

        let mut stream = LiveFeed::new(StreamSensor::failing(SensorError::Unsupported));
        assert_eq!(Err(SensorError::Unsupported), stream.start());
        assert!(!stream.sensor().is_watching());

        let mut stream = LiveFeed::new(StreamSensor::new());
        stream.start().unwrap();
        assert!(stream.sensor().is_watching());
    }

    #[test]
    fn simulated_feed_ticks_per_period() {
        let mut feed = feed();
        let mut sink = Collect::default();
        assert_eq!(0, feed.advance(Duration::from_secs(5), &mut sink));

        feed.start().unwrap();
        assert_eq!(0, feed.advance(Duration::from_millis(499), &mut sink));
        assert_eq!(1, feed.advance(Duration::from_millis(1), &mut sink));
        assert_eq!(4, feed.advance(Duration::from_millis(2000), &mut sink));

        // 4x speed: 125 ms per tick from now on
        feed.simulator_mut().set_speed(4.0);
        assert_eq!(8, feed.advance(Duration::from_millis(1000), &mut sink));
        assert_eq!(13, sink.positions.len());
    }

    #[test]
    fn stopped_feed_does_not_accumulate_time() {
        let mut feed = feed();
        let mut sink = Collect::default();
        feed.start().unwrap();
        feed.stop();
        assert_eq!(0, feed.advance(Duration::from_secs(10), &mut sink));
        feed.start().unwrap();
        assert_eq!(0, feed.advance(Duration::from_millis(100), &mut sink));
        assert_eq!(1, feed.advance(Duration::from_millis(400), &mut sink));

        let reset = feed.simulator_mut().reset();
        feed.forward(reset, &mut sink);
        assert_eq!(Waypoint::new(0.0, 0.0), sink.positions.last().unwrap().waypoint());
    }

    #[test]
    fn simulated_feed_stops_at_the_end() {
        let mut feed = feed();
        let mut sink = Collect::default();
        feed.start().unwrap();
        feed.simulator_mut().set_speed(100.0);
        let ticks = feed.advance(Duration::from_secs(60), &mut sink);
        assert!((5..=6).contains(&ticks), "{ticks}");
        assert_eq!(Waypoint::new(0.0, 1.0), sink.positions.last().unwrap().waypoint());
        assert_eq!(0, feed.advance(Duration::from_secs(60), &mut sink));
    }
}
