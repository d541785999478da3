mod elements;
mod error;
mod graph;
mod graph_view;
mod settings;

pub mod analysis;
pub mod cache;
pub mod draw;
pub mod events;
pub mod input;
pub mod layouts;
pub mod trace;
pub mod viewport;

pub use self::analysis::{
    AnalysisError, AnalysisRequest, AnalysisSession, AnalysisSettings, AnalysisState, Analyzer,
    Generation, RequestTracker, Responder,
};
pub use self::cache::{CacheCategory, CacheKey, CacheSettings, ResponseCache};
pub use self::draw::{GraphRenderer, NodeShape, NodeStyle, Scene};
pub use self::elements::{Link, Node, NodeKind};
pub use self::error::{Error, ErrorKind};
pub use self::graph::Graph;
pub use self::graph_view::{CanvasState, GraphCanvas};
pub use self::layouts::{Body, ForceSettings, LayoutEngine, TickReport};
pub use self::settings::{SettingsInteraction, SettingsNavigation, SettingsStyle};
pub use self::trace::{
    PlaybackControls, PlaybackError, PlaybackSettings, PlaybackState, Trace, TracePlayer,
    TraceStep,
};
pub use self::viewport::{Transform, ViewportController, ZoomBounds};
