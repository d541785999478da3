mod edge;
mod node;

pub use self::edge::Link;
pub use self::node::{Node, NodeKind};
