use route_model::{Step, TransitStep, WalkStep};
use std::fmt::{Display, Formatter};

/// Rounds to 10 m below a kilometre, one decimal above.
pub struct DistanceFormatter(pub f64);

impl Display for DistanceFormatter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let meters = self.0.max(0.0);
        if meters >= 1000.0 {
            f.write_fmt(format_args!("{:.1} km", meters / 1000.0))
        } else {
            f.write_fmt(format_args!("{} m", (meters / 10.0).round() as u64 * 10))
        }
    }
}

/// What the rider should do for a step, e.g. "Board the tram 505 toward Dundas West at Queen St, 10:42".
pub struct StepInstruction<'a>(pub &'a Step);

impl<'a> StepInstruction<'a> {
    fn format_walk(walk: &WalkStep, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Walk")?;
        if !walk.distance_text.is_empty() {
            f.write_fmt(format_args!(" {}", walk.distance_text))?;
        }
        if !walk.duration_text.is_empty() {
            f.write_fmt(format_args!(" ({})", walk.duration_text))?;
        }
        Ok(())
    }

    fn format_boarding(transit: &TransitStep, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Board the {vehicle} {line} toward {headsign} at {stop}, {time}
        f.write_fmt(format_args!("Board the {} {}", transit.vehicle, transit.line_id))?;
        if !transit.headsign.is_empty() {
            f.write_fmt(format_args!(" toward {}", transit.headsign))?;
        }
        if !transit.departure_stop.name.is_empty() {
            f.write_fmt(format_args!(" at {}", transit.departure_stop.name))?;
        }
        if !transit.scheduled_departure.is_empty() {
            f.write_fmt(format_args!(", {}", transit.scheduled_departure))?;
        }
        Ok(())
    }
}

impl<'a> Display for StepInstruction<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Step::Walk(walk) => StepInstruction::format_walk(walk, f),
            Step::Transit(transit) => StepInstruction::format_boarding(transit, f),
        }
    }
}
