mod controls;
mod player;
mod step;

pub use controls::PlaybackControls;
pub use player::{PlaybackAction, PlaybackError, PlaybackSettings, PlaybackState, TracePlayer};
pub use step::{RawStep, StepLocation, Trace, TraceStep};
