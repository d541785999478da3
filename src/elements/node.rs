use serde::{Deserialize, Serialize};

/// Closed set of node categories the analysis collaborator may emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    #[default]
    Process,
    Condition,
    Loop,
    Function,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Process,
        NodeKind::Condition,
        NodeKind::Loop,
        NodeKind::Function,
    ];

    /// Parses the collaborator's `type` string. Matching ignores case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => Some(NodeKind::Start),
            "end" => Some(NodeKind::End),
            "process" => Some(NodeKind::Process),
            "condition" => Some(NodeKind::Condition),
            "loop" => Some(NodeKind::Loop),
            "function" => Some(NodeKind::Function),
            _ => None,
        }
    }

    /// Like [`NodeKind::parse`] but falls back to [`NodeKind::Process`] for anything unknown.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return NodeKind::default();
        };
        NodeKind::parse(raw).unwrap_or_else(|| {
            log::debug!("unknown node type '{raw}', drawing it as process");
            NodeKind::default()
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Process => "process",
            NodeKind::Condition => "condition",
            NodeKind::Loop => "loop",
            NodeKind::Function => "function",
        }
    }
}

/// Validated node. Geometry lives in the layout engine, see
/// [`crate::LayoutEngine::position`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,
    label: String,
    kind: NodeKind,
    important: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            important: false,
        }
    }

    pub fn with_important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn important(&self) -> bool {
        self.important
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NodeKind::parse(" Condition "), Some(NodeKind::Condition));
    }

    #[test]
    fn test_normalize_unknown_to_process() {
        assert_eq!(NodeKind::normalize(None), NodeKind::Process);
        assert_eq!(NodeKind::normalize(Some("decision")), NodeKind::Process);
        assert_eq!(NodeKind::normalize(Some("")), NodeKind::Process);
        assert_eq!(NodeKind::normalize(Some("LOOP")), NodeKind::Loop);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&NodeKind::Function).unwrap();
        assert_eq!(json, r#""function""#);
    }
}
