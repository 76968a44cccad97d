use crate::formatter::StepInstruction;
use crate::proximity::TargetKind;
use route_model::{Step, TransitStep};
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Approach,
    Arrived,
    NextStep,
    Boarded,
    TripComplete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Approach => "approach",
            EventKind::Arrived => "arrived",
            EventKind::NextStep => "next-step",
            EventKind::Boarded => "boarded",
            EventKind::TripComplete => "trip-complete",
        }
    }
}

/// Deduplication key: event kind plus step index. `trip-complete` is trip-wide and has no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub kind: EventKind,
    pub step_index: Option<usize>,
}

impl Display for EventKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.step_index {
            Some(index) => write!(f, "{}-{}", self.kind.as_str(), index),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// Something the rider should be told about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationEvent {
    pub kind: EventKind,
    pub step_index: usize,
    pub title: String,
    pub message: String,
}

impl NavigationEvent {
    pub fn key(&self) -> EventKey {
        let step_index = match self.kind {
            EventKind::TripComplete => None,
            _ => Some(self.step_index),
        };
        EventKey {
            kind: self.kind,
            step_index,
        }
    }

    /// Transit approaches always name the stop to get off at.
    pub(crate) fn approach(step_index: usize, step: &Step) -> Self {
        let (title, message) = match step {
            Step::Walk(_) => ("Almost there".to_string(), "Almost there".to_string()),
            Step::Transit(transit) => (
                "Approaching stop".to_string(),
                format!("Approaching {}", transit.arrival_stop.name),
            ),
        };
        Self {
            kind: EventKind::Approach,
            step_index,
            title,
            message,
        }
    }

    pub(crate) fn arrived(step_index: usize, step: &Step, target: TargetKind) -> Self {
        let message = match (step, target) {
            (Step::Walk(_), _) => "You reached the end of this walk".to_string(),
            (Step::Transit(transit), TargetKind::DepartureStop) => {
                format!("You are at {}", transit.departure_stop.name)
            }
            (Step::Transit(transit), _) => format!("Get off at {}", transit.arrival_stop.name),
        };
        Self {
            kind: EventKind::Arrived,
            step_index,
            title: "Arrived".to_string(),
            message,
        }
    }

    pub(crate) fn next_step(step_index: usize, step: &Step) -> Self {
        Self {
            kind: EventKind::NextStep,
            step_index,
            title: "Next step".to_string(),
            message: StepInstruction(step).to_string(),
        }
    }

    pub(crate) fn boarded(step_index: usize, transit: &TransitStep) -> Self {
        let mut message = format!("On board the {} {}", transit.vehicle, transit.line_id);
        if !transit.arrival_stop.name.is_empty() {
            message.push_str(&format!(", get off at {}", transit.arrival_stop.name));
        }
        Self {
            kind: EventKind::Boarded,
            step_index,
            title: "On board".to_string(),
            message,
        }
    }

    pub(crate) fn trip_complete(last_step_index: usize) -> Self {
        Self {
            kind: EventKind::TripComplete,
            step_index: last_step_index,
            title: "Trip complete".to_string(),
            message: "You have arrived at your destination".to_string(),
        }
    }
}
