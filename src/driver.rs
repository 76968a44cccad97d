use crate::navigator::Navigator;
use crate::notification::NotificationBackend;
use crate::position::Position;
use crate::source::{Sensor, SensorError, SourceKind};
use futures::{Stream, StreamExt};
use log::{debug, info};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The rider reached the final step's target.
    Completed,
    /// The simulator reached the end of its path without completing the trip.
    SimulationEnded,
    /// The live readings stream ended, or no feed is active.
    FeedClosed,
    Interrupted,
}

/// Pumps live readings and simulator time into `navigator` until the trip ends.
///
/// Readings are handled in arrival order. The simulated feed is advanced by the real time
/// elapsed between two ticks of a `resolution` interval, so a coarse resolution only batches
/// ticks and never changes their count.
pub async fn run<S, B, R, F>(
    navigator: &mut Navigator<S, B>,
    mut readings: R,
    resolution: Duration,
    shutdown: F,
) -> RunOutcome
where
    S: Sensor,
    B: NotificationBackend,
    R: Stream<Item = Result<Position, SensorError>> + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(resolution);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut readings_done = false;

    loop {
        if navigator.is_complete() {
            info!("Trip complete");
            return RunOutcome::Completed;
        }
        let Some(active) = navigator.active_source() else {
            info!("No position source active");
            return RunOutcome::FeedClosed;
        };
        if active == SourceKind::Simulated && navigator.simulator().is_noop() {
            info!("Simulator has no path to follow");
            return RunOutcome::SimulationEnded;
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Navigation interrupted");
                return RunOutcome::Interrupted;
            }
            reading = readings.next(), if !readings_done => match reading {
                Some(reading) => navigator.deliver_reading(reading),
                None => {
                    debug!("Live readings stream ended");
                    readings_done = true;
                    if active == SourceKind::Live {
                        return RunOutcome::FeedClosed;
                    }
                }
            },
            now = interval.tick() => {
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                navigator.advance(elapsed);
                if navigator.simulation_finished() && !navigator.is_complete() {
                    info!("Simulator reached the end of the path before the trip completed");
                    return RunOutcome::SimulationEnded;
                }
            }
        }
    }
}
