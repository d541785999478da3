mod engine;
mod forces;
mod settings;

pub use engine::{Body, LayoutEngine, TickReport};
pub use settings::ForceSettings;
