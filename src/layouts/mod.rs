pub mod force_directed;

pub use force_directed::{Body, ForceSettings, LayoutEngine, TickReport};
