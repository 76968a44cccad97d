/*! Normalized trip data consumed by the live navigation engine.

A [Route] is what a directions provider hands back once a rider has picked an itinerary:
an ordered list of [Step]s (walking legs and transit rides), the overview geometry of the
whole trip, and its two end points.

This crate does not talk to any directions API and does not decode encoded polylines.
It expects geometry to already be a list of [Waypoint]s and only validates the shape of the data.

## Design decisions

### Steps are a sum type

A leg is either a [WalkStep] or a [TransitStep]. The JSON form carries a `mode` tag
(`"walk"` / `"transit"`), and code matches on [Step] exhaustively instead of comparing strings.

### Tolerant geometry

Consecutive steps do not need to touch: the end of a walk and the departure stop of the next
ride may be a few meters apart. A stop may also come without a location at all; such a step
has no resolvable target (see [TransitStop::resolved_location]) and the engine simply never advances it on
its own.

### Validation

The only hard invariant is that a route has at least one step. Deserialization goes through a raw
shape and [Route::new], so an empty [Route] cannot be built.
*/

pub mod error;
mod route;
mod step;
mod waypoint;


pub use error::Error;
pub use route::Route;
pub use step::{Step, TransitMode, TransitStep, TransitStop, WalkStep};
pub use waypoint::Waypoint;
