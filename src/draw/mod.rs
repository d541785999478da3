mod edge_shape_builder;
mod renderer;
mod shapes;
mod style;
mod text;

pub use self::edge_shape_builder::{control_point, EdgeShapeBuilder, EdgeShapes, TipProps};
pub use self::renderer::{GraphRenderer, Scene, SceneItem, TextItem};
pub use self::shapes::NodeGeometry;
pub use self::style::{NodeShape, NodeStyle};
pub use self::text::{wrap_label, FontsMeasure, MonospaceMeasure, TextMeasure};
