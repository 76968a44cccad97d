//! Owns one trip: the state machine, both position feeds, and the notification sink.
//!
//! At most one feed is active. Selecting one stops the other before it starts.

use crate::configuration::Configuration;
use crate::engine::{NavigationListener, NavigationStateMachine, SubscriptionId};
use crate::notification::{NotificationBackend, NotificationDispatcher, Permission};
use crate::position::Position;
use crate::proximity::ProximityEvaluator;
use crate::session::NavigationSnapshot;
use crate::simulator::PathSimulator;
use crate::source::{
    LiveFeed, PositionSink, PositionSource, SensorError, Sensor, SimulatedFeed, SourceKind,
};
use crate::time::Clock;
use log::{info, warn};
use route_model::Route;
use std::time::Duration;

/// Routes every position of the active feed into the state machine and its events into the
/// dispatcher.
struct EngineSink<'a, B> {
    engine: &'a mut NavigationStateMachine,
    dispatcher: &'a mut NotificationDispatcher<B>,
    banner: &'a mut Option<String>,
}

impl<'a, B: NotificationBackend> PositionSink for EngineSink<'a, B> {
    fn push(&mut self, position: Position) {
        for event in self.engine.handle_position(&position) {
            self.dispatcher.dispatch(&event);
        }
    }

    fn fail(&mut self, error: SensorError) {
        warn!("Live location error: {error}");
        *self.banner = Some(format!("Live location error: {error}"));
    }
}

pub struct Navigator<S, B> {
    engine: NavigationStateMachine,
    dispatcher: NotificationDispatcher<B>,
    live: LiveFeed<S>,
    simulated: SimulatedFeed,
    active: Option<SourceKind>,
    /// Persistent message for the rider, set when the live feed is unavailable.
    banner: Option<String>,
}

impl<S: Sensor, B: NotificationBackend> Navigator<S, B> {
    pub fn new(route: Route, config: &Configuration, sensor: S, backend: B, clock: Box<dyn Clock>) -> Self {
        let mut simulator = PathSimulator::new(config.simulator.clone(), clock);
        simulator.load(&route);
        Self {
            engine: NavigationStateMachine::new(route, ProximityEvaluator::from_config(config)),
            dispatcher: NotificationDispatcher::new(backend),
            live: LiveFeed::new(sensor),
            simulated: SimulatedFeed::new(simulator),
            active: None,
            banner: None,
        }
    }

    pub fn route(&self) -> &Route {
        self.engine.route()
    }

    pub fn engine(&self) -> &NavigationStateMachine {
        &self.engine
    }

    pub fn notifications(&self) -> &NotificationDispatcher<B> {
        &self.dispatcher
    }

    pub fn live(&self) -> &LiveFeed<S> {
        &self.live
    }

    pub fn simulator(&self) -> &PathSimulator {
        self.simulated.simulator()
    }

    pub fn active_source(&self) -> Option<SourceKind> {
        self.active
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.dispatcher.status_message()
    }

    /// Answer to a permission prompt that was left pending.
    pub fn permission_resolved(&mut self, permission: Permission) {
        self.dispatcher.permission_resolved(permission);
    }

    pub fn snapshot(&self) -> Option<NavigationSnapshot> {
        self.engine.snapshot()
    }

    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    /// The simulated feed is selected and reached the end of its path.
    pub fn simulation_finished(&self) -> bool {
        self.active == Some(SourceKind::Simulated) && self.simulated.simulator().is_finished()
    }

    pub fn subscribe(&mut self, listener: Box<dyn NavigationListener>) -> SubscriptionId {
        self.engine.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.engine.unsubscribe(id)
    }

    /// Opens the session and starts `preferred`. Falls back to the simulator when the live
    /// feed cannot start. Returns the feed actually in use.
    pub fn start(&mut self, preferred: SourceKind) -> SourceKind {
        self.engine.start();
        self.dispatcher.request_permission();

        if let Err(e) = self.select_source(preferred) {
            warn!("Falling back to the simulator: {e}");
            self.banner = Some(format!("Live location unavailable ({e}). Using the simulator."));
            if let Err(e) = self.select_source(SourceKind::Simulated) {
                warn!("Simulator failed to start: {e}");
            }
        }
        info!("Navigating with the {:?} feed", self.active);
        self.active.unwrap_or(SourceKind::Simulated)
    }

    /// Stops the current feed, then starts `kind`. On error no feed is active.
    pub fn select_source(&mut self, kind: SourceKind) -> Result<(), SensorError> {
        if self.engine.is_disposed() {
            warn!("Ignoring source selection: navigation stopped");
            return Ok(());
        }
        if self.active == Some(kind) {
            return Ok(());
        }
        self.active = None;
        match kind {
            SourceKind::Live => {
                self.simulated.stop();
                self.live.start()?;
            }
            SourceKind::Simulated => {
                self.live.stop();
                self.simulated.start()?;
            }
        }
        info!("Position source: {kind:?}");
        self.active = Some(kind);
        Ok(())
    }

    /// Halts the active feed and discards the session.
    pub fn stop(&mut self) {
        self.live.stop();
        self.simulated.stop();
        self.simulated.simulator_mut().dispose();
        self.engine.stop();
        self.dispatcher.reset();
        self.active = None;
    }

    pub fn jump_to_step(&mut self, index: usize) -> bool {
        self.engine.jump_to_step(index)
    }

    /// Runs the simulated ticks that fit into `elapsed`. Returns the number of positions produced.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if self.active != Some(SourceKind::Simulated) {
            return 0;
        }
        let mut sink = EngineSink {
            engine: &mut self.engine,
            dispatcher: &mut self.dispatcher,
            banner: &mut self.banner,
        };
        self.simulated.advance(elapsed, &mut sink)
    }

    /// Entry point for the platform sensor callback.
    pub fn deliver_reading(&mut self, reading: Result<Position, SensorError>) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            dispatcher: &mut self.dispatcher,
            banner: &mut self.banner,
        };
        self.live.deliver(reading, &mut sink);
    }

    /// Switches to the simulator if needed, then resumes it.
    pub fn play(&mut self) -> bool {
        if self.active != Some(SourceKind::Simulated) {
            if let Err(e) = self.select_source(SourceKind::Simulated) {
                warn!("Simulator failed to start: {e}");
            }
        } else {
            self.simulated.simulator_mut().resume();
        }
        self.simulated.simulator().is_running()
    }

    pub fn pause(&mut self) {
        self.simulated.simulator_mut().pause();
    }

    pub fn is_running(&self) -> bool {
        self.active == Some(SourceKind::Simulated) && self.simulated.simulator().is_running()
    }

    /// Moves the simulator back to the start of the path and publishes that position.
    pub fn reset(&mut self) -> Option<Position> {
        let position = self.simulated.simulator_mut().reset();
        self.forward(position.clone());
        position
    }

    pub fn skip_to_next_waypoint(&mut self) -> Option<Position> {
        let position = self.simulated.simulator_mut().skip_to_next_waypoint();
        self.forward(position.clone());
        position
    }

    pub fn set_speed(&mut self, multiplier: f64) -> bool {
        self.simulated.simulator_mut().set_speed(multiplier)
    }

    fn forward(&mut self, position: Option<Position>) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            dispatcher: &mut self.dispatcher,
            banner: &mut self.banner,
        };
        self.simulated.forward(position, &mut sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{LogNotifier, NotificationError};
    use crate::session::ArrivalState;
    use crate::source::StreamSensor;
    use crate::tests::{at, walk_step};
    use crate::time::ManualClock;
    use chrono::{TimeZone, Utc};
    use route_model::Waypoint;

    fn single_walk() -> Route {
        Route::new(
            vec![walk_step(Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.001))],
            vec![Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.001)],
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.001),
        )
        .unwrap()
    }

    fn navigator(sensor: StreamSensor) -> Navigator<StreamSensor, LogNotifier> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        Navigator::new(
            single_walk(),
            &Configuration::default(),
            sensor,
            LogNotifier,
            Box::new(clock),
        )
    }

    #[test]
    fn falls_back_to_the_simulator() {
        let mut navigator = navigator(StreamSensor::failing(SensorError::PermissionDenied));
        assert_eq!(SourceKind::Simulated, navigator.start(SourceKind::Live));
        assert!(navigator.banner().unwrap().contains("permission denied"));
        assert!(navigator.is_running());
        assert!(!navigator.live().is_active());
    }

    #[test]
    fn sources_are_mutually_exclusive() {
        let mut navigator = navigator(StreamSensor::new());
        assert_eq!(SourceKind::Simulated, navigator.start(SourceKind::Simulated));

        navigator.select_source(SourceKind::Live).unwrap();
        assert!(navigator.live().sensor().is_watching());
        assert!(!navigator.simulator().is_running());
        assert_eq!(0, navigator.advance(Duration::from_secs(10)));

        navigator.deliver_reading(Ok(at(0.0, 0.0)));
        assert_eq!(
            ArrivalState::Approaching,
            navigator.snapshot().unwrap().arrival_state
        );

        assert!(navigator.play());
        assert_eq!(Some(SourceKind::Simulated), navigator.active_source());
        assert!(!navigator.live().sensor().is_watching());
        // readings that were already in flight are dropped
        navigator.deliver_reading(Ok(at(0.0, 0.001)));
        assert_eq!(0, navigator.snapshot().unwrap().current_step_index);
    }

    #[test]
    fn simulated_trip_completes_and_notifies() {
        let mut navigator = navigator(StreamSensor::new());
        navigator.start(SourceKind::Simulated);
        navigator.set_speed(10.0);
        navigator.advance(Duration::from_secs(60));

        assert!(navigator.is_complete());
        assert!(navigator.simulation_finished());
        assert_eq!(
            Some("You have arrived at your destination"),
            navigator.status_message()
        );
        // approach, arrived, trip-complete
        assert_eq!(3, navigator.notifications().delivered());
    }

    /// Leaves the permission prompt unanswered.
    #[derive(Default)]
    struct Undecided {
        shown: Vec<String>,
    }

    impl NotificationBackend for Undecided {
        fn request_permission(&mut self) -> Permission {
            Permission::Pending
        }

        fn show(&mut self, _title: &str, body: &str) -> Result<(), NotificationError> {
            self.shown.push(body.to_string());
            Ok(())
        }
    }

    #[test]
    fn late_permission_enables_notifications() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let mut navigator = Navigator::new(
            single_walk(),
            &Configuration::default(),
            StreamSensor::new(),
            Undecided::default(),
            Box::new(clock),
        );
        navigator.start(SourceKind::Simulated);
        navigator.set_speed(10.0);

        navigator.advance(Duration::from_secs(1));
        assert_eq!(Some(Permission::Pending), navigator.notifications().permission());
        assert_eq!(Some("Almost there"), navigator.status_message());
        assert_eq!(0, navigator.notifications().delivered());

        navigator.permission_resolved(Permission::Granted);
        navigator.advance(Duration::from_secs(60));
        assert!(navigator.is_complete());
        assert_eq!(
            vec![
                "You reached the end of this walk".to_string(),
                "You have arrived at your destination".to_string()
            ],
            navigator.notifications().backend().shown
        );
        assert_eq!(2, navigator.notifications().delivered());
    }

    #[test]
    fn live_errors_raise_the_banner() {
        let mut navigator = navigator(StreamSensor::new());
        navigator.start(SourceKind::Live);
        assert_eq!(None, navigator.banner());
        navigator.deliver_reading(Err(SensorError::Unavailable("no fix".to_string())));
        assert!(navigator.banner().unwrap().contains("no fix"));
        assert_eq!(ArrivalState::Traveling, navigator.snapshot().unwrap().arrival_state);
    }

    #[test]
    fn simulator_controls() {
        let mut navigator = navigator(StreamSensor::new());
        navigator.start(SourceKind::Simulated);
        navigator.pause();
        assert!(!navigator.is_running());
        assert_eq!(0, navigator.advance(Duration::from_secs(5)));
        assert!(navigator.play());

        assert_eq!(10, navigator.advance(Duration::from_secs(5)));
        let reset = navigator.reset().unwrap();
        assert_eq!(Waypoint::new(0.0, 0.0), reset.waypoint());
        assert_eq!(
            Some(reset),
            navigator.snapshot().unwrap().current_position
        );

        let skipped = navigator.skip_to_next_waypoint().unwrap();
        assert_eq!(Waypoint::new(0.0, 0.001), skipped.waypoint());
        assert!(navigator.is_complete());
        assert!(!navigator.set_speed(0.0));
    }

    #[test]
    fn stop_halts_everything() {
        let mut navigator = navigator(StreamSensor::new());
        navigator.start(SourceKind::Live);
        navigator.stop();
        assert!(!navigator.live().sensor().is_watching());
        assert_eq!(None, navigator.active_source());
        assert_eq!(None, navigator.snapshot());
        navigator.deliver_reading(Ok(at(0.0, 0.001)));
        assert_eq!(0, navigator.advance(Duration::from_secs(5)));
        assert!(navigator.simulator().is_noop());
    }
}
