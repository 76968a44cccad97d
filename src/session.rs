use crate::event::EventKey;
use crate::position::Position;
use crate::proximity::{Proximity, Target};
use rustc_hash::FxHashSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalState {
    Traveling,
    Approaching,
    Arrived,
    Completed,
}

impl From<Proximity> for ArrivalState {
    fn from(p: Proximity) -> Self {
        match p {
            Proximity::Traveling => ArrivalState::Traveling,
            Proximity::Approaching => ArrivalState::Approaching,
            Proximity::Arrived => ArrivalState::Arrived,
        }
    }
}

/// Mutable state of one active trip. Only the state machine writes to it.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    /// `step_count` means Completed.
    pub(crate) current_step_index: usize,
    pub(crate) step_count: usize,
    pub(crate) arrival_state: ArrivalState,
    pub(crate) fired_events: FxHashSet<EventKey>,
    /// Reset whenever the current step changes.
    pub(crate) boarded_hint: bool,
    pub(crate) last_position: Option<Position>,
    pub(crate) last_heading: Option<f64>,
    pub(crate) target: Option<Target>,
    pub(crate) distance_to_target_m: Option<f64>,
}

impl NavigationSession {
    pub(crate) fn new(step_count: usize) -> Self {
        Self {
            current_step_index: 0,
            step_count,
            arrival_state: ArrivalState::Traveling,
            fired_events: FxHashSet::default(),
            boarded_hint: false,
            last_position: None,
            last_heading: None,
            target: None,
            distance_to_target_m: None,
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn arrival_state(&self) -> ArrivalState {
        self.arrival_state
    }

    pub fn boarded_hint(&self) -> bool {
        self.boarded_hint
    }

    pub fn is_complete(&self) -> bool {
        self.current_step_index >= self.step_count
    }

    pub fn has_fired(&self, key: &EventKey) -> bool {
        self.fired_events.contains(key)
    }

    /// Records `key`; false when it was already there.
    pub(crate) fn mark_fired(&mut self, key: EventKey) -> bool {
        self.fired_events.insert(key)
    }

    pub(crate) fn move_to_step(&mut self, index: usize) {
        self.current_step_index = index;
        self.arrival_state = ArrivalState::Traveling;
        self.boarded_hint = false;
        self.target = None;
        self.distance_to_target_m = None;
    }

    pub(crate) fn complete(&mut self) {
        self.current_step_index = self.step_count;
        self.arrival_state = ArrivalState::Completed;
        self.boarded_hint = false;
        self.target = None;
        self.distance_to_target_m = None;
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            current_step_index: self.current_step_index,
            arrival_state: self.arrival_state,
            current_position: self.last_position.clone(),
            current_heading: self.last_heading,
            target: self.target,
            distance_to_target_m: self.distance_to_target_m,
        }
    }
}

/// Read-only view handed to presenters after every update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    pub current_step_index: usize,
    pub arrival_state: ArrivalState,
    pub current_position: Option<Position>,
    pub current_heading: Option<f64>,
    pub target: Option<Target>,
    pub distance_to_target_m: Option<f64>,
}
