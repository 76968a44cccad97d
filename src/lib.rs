//! Live trip navigation over a planned multi-leg route.
//!
//! Positions from a live sensor or from the path simulator go through one
//! [NavigationStateMachine], which tracks the current step, classifies how close the rider
//! is to that step's target and emits each user-facing event at most once per step.
//! [Navigator] wires the state machine to both feeds and to a notification backend;
//! [driver::run] pumps it from an async runtime.

pub mod configuration;
pub mod driver;
pub mod engine;
pub mod event;
pub mod formatter;
pub mod geo_math;
pub mod highlight;
pub mod navigator;
pub mod notification;
pub mod position;
pub mod proximity;
pub mod session;
pub mod simulator;
pub mod source;
pub mod time;


pub use configuration::{Configuration, SimulatorConfig};
pub use driver::RunOutcome;
pub use engine::{NavigationListener, NavigationStateMachine, SubscriptionId};
pub use event::{EventKey, EventKind, NavigationEvent};
pub use navigator::Navigator;
pub use notification::{NotificationBackend, NotificationDispatcher, NotificationError, Permission};
pub use position::Position;
pub use proximity::{Proximity, ProximityEvaluator, Target, TargetKind};
pub use session::{ArrivalState, NavigationSession, NavigationSnapshot};
pub use simulator::PathSimulator;
pub use source::{PositionSink, PositionSource, Sensor, SensorError, SourceKind};
pub use time::{Clock, ManualClock, SystemClock};

pub use route_model;
