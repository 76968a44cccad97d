use serde::Deserialize;
use std::time::Duration;

pub const ARRIVED_RADIUS_M: f64 = 50.0;
pub const APPROACHING_RADIUS_M: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub arrived_radius_m: f64,
    pub approaching_radius_m: f64,
    /// Only complete a transit step at its arrival stop.
    pub require_boarding: bool,
    pub simulator: SimulatorConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            arrived_radius_m: ARRIVED_RADIUS_M,
            approaching_radius_m: APPROACHING_RADIUS_M,
            require_boarding: false,
            simulator: SimulatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Tick period at 1x, divided by the speed multiplier.
    pub base_period_ms: u64,
    /// Progress added per tick at 1x, multiplied by the speed multiplier.
    pub progress_step: f64,
    pub initial_speed: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_period_ms: 500,
            progress_step: 0.002,
            initial_speed: 1.0,
        }
    }
}

impl SimulatorConfig {
    pub fn base_period(&self) -> Duration {
        Duration::from_millis(self.base_period_ms)
    }
}
