use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Validated directed link between two nodes of a [`crate::Graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    source: NodeIndex,
    target: NodeIndex,
    label: Option<String>,
    /// Position among links connecting the same pair of nodes. Used to fan out curves.
    order: usize,
}

impl Link {
    pub(crate) fn new(
        source: NodeIndex,
        target: NodeIndex,
        label: Option<String>,
        order: usize,
    ) -> Self {
        Self {
            source,
            target,
            label: label.filter(|l| !l.trim().is_empty()),
            order,
        }
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn target(&self) -> NodeIndex {
        self.target
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}
