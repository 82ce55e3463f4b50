//! Musical time on the grid: measures, snapping and the tempo map.

mod grid;
mod measure;
mod tempo;

pub use grid::{MeasureDeletion, TimelineGrid};
pub use measure::{GridLine, LineWeight, Measure};
pub use tempo::{MarkerId, TempoMap, TempoMarker, MAX_BPM, MIN_BPM};
