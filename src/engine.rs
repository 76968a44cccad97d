//! The live navigation state machine.
//!
//! Every position, whichever feed produced it, goes through
//! [NavigationStateMachine::handle_position]. That handler is the only place the
//! [NavigationSession] is mutated. Presenters and notification sinks subscribe and only
//! ever see snapshots and events.

use crate::event::{EventKey, EventKind, NavigationEvent};
use crate::geo_math::bearing_degrees;
use crate::position::Position;
use crate::proximity::{Proximity, ProximityEvaluator};
use crate::session::{ArrivalState, NavigationSession, NavigationSnapshot};
use log::{debug, info, trace, warn};
use route_model::{Route, Step};

/// Observer of a running trip. Both methods default to doing nothing.
pub trait NavigationListener {
    fn on_update(&mut self, _snapshot: &NavigationSnapshot) {}
    fn on_event(&mut self, _event: &NavigationEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct NavigationStateMachine {
    route: Route,
    evaluator: ProximityEvaluator,
    session: Option<NavigationSession>,
    disposed: bool,
    listeners: Vec<(SubscriptionId, Box<dyn NavigationListener>)>,
    next_subscription: u64,
}

impl NavigationStateMachine {
    pub fn new(route: Route, evaluator: ProximityEvaluator) -> Self {
        Self {
            route,
            evaluator,
            session: None,
            disposed: false,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> Option<NavigationSnapshot> {
        self.session.as_ref().map(NavigationSession::snapshot)
    }

    pub fn is_active(&self) -> bool {
        !self.disposed && self.session.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_complete(&self) -> bool {
        self.session
            .as_ref()
            .map(NavigationSession::is_complete)
            .unwrap_or(false)
    }

    pub fn subscribe(&mut self, listener: Box<dyn NavigationListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    /// Opens the session on step 0, Traveling.
    ///
    /// Starting twice, or after [NavigationStateMachine::stop], panics in debug builds
    /// and is ignored in release builds.
    pub fn start(&mut self) {
        debug_assert!(!self.disposed, "navigation session used after stop()");
        debug_assert!(self.session.is_none(), "navigation session started twice");
        if self.disposed || self.session.is_some() {
            warn!("Ignoring start(): session already started or stopped");
            return;
        }
        info!("Navigation started over {} step(s)", self.route.len());
        self.session = Some(NavigationSession::new(self.route.len()));
        self.notify(&[]);
    }

    /// Discards the session. Positions arriving afterwards are dropped.
    pub fn stop(&mut self) {
        if self.disposed {
            return;
        }
        info!("Navigation stopped");
        self.disposed = true;
        self.session = None;
        self.listeners.clear();
    }

    /// Manual step selection. Resets the arrival state but keeps every event already fired.
    pub fn jump_to_step(&mut self, index: usize) -> bool {
        debug_assert!(!self.disposed, "navigation session used after stop()");
        let step_count = self.route.len();
        if self.disposed {
            warn!("Ignoring jump to step {index}: session stopped");
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            warn!("Ignoring jump to step {index}: no active session");
            return false;
        };
        if index >= step_count {
            warn!("Ignoring jump to step {index}: route has {step_count} step(s)");
            return false;
        }
        info!("Jumped to step {index}");
        session.move_to_step(index);
        self.notify(&[]);
        true
    }

    /// Feeds one position through the state machine and returns the events it produced.
    ///
    /// Once the trip is complete, positions are ignored: the snapshot keeps the last position
    /// seen before completion and listeners are not notified.
    pub fn handle_position(&mut self, position: &Position) -> Vec<NavigationEvent> {
        if self.disposed {
            trace!("Dropping in-flight position after stop()");
            return Vec::new();
        }
        let Some(session) = self.session.as_mut() else {
            trace!("Dropping position before start()");
            return Vec::new();
        };

        if session.is_complete() {
            trace!("Dropping position after trip completion");
            return Vec::new();
        }

        let here = position.waypoint();
        let heading = position
            .heading
            .or_else(|| {
                session
                    .last_position
                    .as_ref()
                    .map(Position::waypoint)
                    .filter(|prev| *prev != here)
                    .map(|prev| bearing_degrees(&prev, &here))
            })
            .or(session.last_heading);
        session.last_position = Some(position.clone());
        session.last_heading = heading;

        let mut events = Vec::new();
        let index = session.current_step_index;
        let step = &self.route.steps()[index];
        let Some(eval) = self.evaluator.evaluate(position, step, session.boarded_hint) else {
            debug!("Step {index} has no resolvable target; waiting for a manual step change");
            session.arrival_state = ArrivalState::Traveling;
            session.target = None;
            session.distance_to_target_m = None;
            self.notify(&events);
            return events;
        };

        debug!(
            "Step {index}: {:.0} m to {:?} ({:?})",
            eval.distance_m, eval.target.kind, eval.proximity
        );
        session.target = Some(eval.target);
        session.distance_to_target_m = Some(eval.distance_m);
        session.arrival_state = eval.proximity.into();

        if eval.boarded && !session.boarded_hint {
            session.boarded_hint = true;
            if let Step::Transit(transit) = step {
                fire(session, &mut events, EventKind::Boarded, Some(index), || {
                    NavigationEvent::boarded(index, transit)
                });
            }
        }

        match eval.proximity {
            Proximity::Traveling => {}
            Proximity::Approaching => {
                fire(session, &mut events, EventKind::Approach, Some(index), || {
                    NavigationEvent::approach(index, step)
                });
            }
            Proximity::Arrived => {
                fire(session, &mut events, EventKind::Arrived, Some(index), || {
                    NavigationEvent::arrived(index, step, eval.target.kind)
                });
                let last = self.route.len() - 1;
                if index < last {
                    let next = index + 1;
                    session.move_to_step(next);
                    info!("Advanced to step {next}");
                    let next_step = &self.route.steps()[next];
                    fire(session, &mut events, EventKind::NextStep, Some(next), || {
                        NavigationEvent::next_step(next, next_step)
                    });
                } else {
                    session.complete();
                    info!("Trip complete");
                    fire(session, &mut events, EventKind::TripComplete, None, || {
                        NavigationEvent::trip_complete(index)
                    });
                }
            }
        }

        self.notify(&events);
        events
    }

    fn notify(&mut self, events: &[NavigationEvent]) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        for (_, listener) in self.listeners.iter_mut() {
            for event in events {
                listener.on_event(event);
            }
            listener.on_update(&snapshot);
        }
    }
}

/// Pushes the event unless its key already fired in this session.
fn fire(
    session: &mut NavigationSession,
    events: &mut Vec<NavigationEvent>,
    kind: EventKind,
    step_index: Option<usize>,
    build: impl FnOnce() -> NavigationEvent,
) -> bool {
    let key = EventKey { kind, step_index };
    if !session.mark_fired(key) {
        return false;
    }
    let event = build();
    info!("{key}: {}", event.message);
    events.push(event);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{at, transit_step, walk_step};
    use route_model::Waypoint;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<NavigationSnapshot>,
        events: Vec<NavigationEvent>,
    }

    struct Shared(Rc<RefCell<Recorder>>);

    impl NavigationListener for Shared {
        fn on_update(&mut self, snapshot: &NavigationSnapshot) {
            self.0.borrow_mut().updates.push(snapshot.clone());
        }
        fn on_event(&mut self, event: &NavigationEvent) {
            self.0.borrow_mut().events.push(event.clone());
        }
    }

    fn single_walk() -> Route {
        Route::new(
            vec![walk_step(Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.001))],
            vec![],
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.001),
        )
        .unwrap()
    }

    fn machine(route: Route) -> NavigationStateMachine {
        let mut machine = NavigationStateMachine::new(route, ProximityEvaluator::default());
        machine.start();
        machine
    }

    #[test]
    fn positions_before_start_are_ignored() {
        let mut machine = NavigationStateMachine::new(single_walk(), ProximityEvaluator::default());
        assert!(machine.handle_position(&at(0.0, 0.001)).is_empty());
        assert_eq!(None, machine.snapshot());
    }

    #[test]
    fn start_opens_on_first_step() {
        let machine = machine(single_walk());
        let snapshot = machine.snapshot().unwrap();
        assert_eq!(0, snapshot.current_step_index);
        assert_eq!(ArrivalState::Traveling, snapshot.arrival_state);
        assert!(machine.is_active());
    }

    #[test]
    fn oscillating_at_the_boundary_fires_once() {
        let route = Route::new(
            vec![
                walk_step(Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.01)),
                walk_step(Waypoint::new(0.0, 0.01), Waypoint::new(0.0, 0.02)),
            ],
            vec![],
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.02),
        )
        .unwrap();
        let mut machine = machine(route);
        let mut approaches = 0;
        // ~160 m and ~140 m from the end of the first walk
        for i in 0..50 {
            let lng = if i % 2 == 0 { 0.01 - 0.00144 } else { 0.01 - 0.00126 };
            approaches += machine
                .handle_position(&at(0.0, lng))
                .iter()
                .filter(|e| e.kind == EventKind::Approach)
                .count();
        }
        assert_eq!(1, approaches);
        assert_eq!(0, machine.session().unwrap().current_step_index());
    }

    #[test]
    fn heading_is_inferred_when_missing() {
        let mut machine = machine(single_walk());
        machine.handle_position(&at(0.0, -0.01));
        assert_eq!(None, machine.snapshot().unwrap().current_heading);

        machine.handle_position(&at(0.0, -0.009));
        let heading = machine.snapshot().unwrap().current_heading.unwrap();
        assert!((heading - 90.0).abs() < 1e-6);

        // standing still keeps the previous heading
        machine.handle_position(&at(0.0, -0.009));
        assert!((machine.snapshot().unwrap().current_heading.unwrap() - 90.0).abs() < 1e-6);

        // a reported heading wins
        machine.handle_position(&at(0.0, -0.008).with_heading(Some(12.0)));
        assert_eq!(Some(12.0), machine.snapshot().unwrap().current_heading);
    }

    #[test]
    fn unresolvable_step_stays_traveling_until_jump() {
        let mut broken = transit_step(Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.01));
        if let Step::Transit(transit) = &mut broken {
            transit.departure_stop.location = None;
            transit.arrival_stop.location = None;
        }
        let route = Route::new(
            vec![broken, walk_step(Waypoint::new(0.0, 0.01), Waypoint::new(0.0, 0.011))],
            vec![],
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.011),
        )
        .unwrap();
        let mut machine = machine(route);

        for _ in 0..10 {
            assert!(machine.handle_position(&at(0.0, 0.01)).is_empty());
        }
        let snapshot = machine.snapshot().unwrap();
        assert_eq!(0, snapshot.current_step_index);
        assert_eq!(ArrivalState::Traveling, snapshot.arrival_state);
        assert_eq!(None, snapshot.target);

        assert!(machine.jump_to_step(1));
        let events = machine.handle_position(&at(0.0, 0.011));
        let keys: Vec<String> = events.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(vec!["arrived-1", "trip-complete"], keys);
    }

    #[test]
    fn jump_keeps_fired_events() {
        let route = Route::new(
            vec![
                walk_step(Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 0.01)),
                walk_step(Waypoint::new(0.0, 0.01), Waypoint::new(0.0, 0.02)),
            ],
            vec![],
            Waypoint::new(0.0, 0.0),
            Waypoint::new(0.0, 0.02),
        )
        .unwrap();
        let mut machine = machine(route);
        let first: Vec<String> = machine
            .handle_position(&at(0.0, 0.01))
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        assert_eq!(vec!["arrived-0", "next-step-1"], first);

        assert!(machine.jump_to_step(0));
        assert_eq!(ArrivalState::Traveling, machine.snapshot().unwrap().arrival_state);

        // arriving again still advances, but nothing is announced twice
        assert!(machine.handle_position(&at(0.0, 0.01)).is_empty());
        assert_eq!(1, machine.session().unwrap().current_step_index());
        assert!(!machine.jump_to_step(2));
    }

    #[test]
    fn stop_discards_session_and_drops_late_positions() {
        let mut machine = machine(single_walk());
        machine.stop();
        assert!(!machine.is_active());
        assert!(machine.is_disposed());
        assert_eq!(None, machine.snapshot());
        assert!(machine.handle_position(&at(0.0, 0.001)).is_empty());
        // stopping twice is harmless
        machine.stop();
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "started twice"))]
    fn double_start() {
        let mut machine = machine(single_walk());
        machine.start();
        assert_eq!(0, machine.snapshot().unwrap().current_step_index);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "used after stop"))]
    fn jump_after_stop() {
        let mut machine = machine(single_walk());
        machine.stop();
        assert!(!machine.jump_to_step(0));
    }

    #[test]
    fn positions_after_completion_are_ignored() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut machine = machine(single_walk());
        machine.subscribe(Box::new(Shared(recorder.clone())));
        machine.handle_position(&at(0.0, 0.001));
        assert!(machine.is_complete());
        let completed = machine.snapshot().unwrap();
        let updates = recorder.borrow().updates.len();

        assert!(machine.handle_position(&at(0.0, 0.005)).is_empty());
        assert_eq!(completed, machine.snapshot().unwrap());
        assert_eq!(
            Some(Waypoint::new(0.0, 0.001)),
            machine.snapshot().unwrap().current_position.map(|p| p.waypoint())
        );
        assert_eq!(updates, recorder.borrow().updates.len());
    }

    #[test]
    fn listeners_receive_events_and_snapshots() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut machine = NavigationStateMachine::new(single_walk(), ProximityEvaluator::default());
        let id = machine.subscribe(Box::new(Shared(recorder.clone())));
        machine.start();
        machine.handle_position(&at(0.0, 0.0));
        machine.handle_position(&at(0.0, 0.001));

        {
            let recorded = recorder.borrow();
            assert_eq!(3, recorded.updates.len());
            let kinds: Vec<EventKind> = recorded.events.iter().map(|e| e.kind).collect();
            assert_eq!(
                vec![EventKind::Approach, EventKind::Arrived, EventKind::TripComplete],
                kinds
            );
            assert_eq!(
                ArrivalState::Completed,
                recorded.updates.last().unwrap().arrival_state
            );
        }

        assert!(machine.unsubscribe(id));
        assert!(!machine.unsubscribe(id));
        machine.handle_position(&at(0.0, 0.001));
        assert_eq!(3, recorder.borrow().updates.len());
    }
}
