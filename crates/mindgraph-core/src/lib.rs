use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod label;
pub mod snapshot;

pub use error::SnapshotError;
pub use label::{DEFAULT_MAX_CAPTION_CHARS, normalize, normalize_with_limit};
pub use snapshot::{RawEdge, RawNode, RawNodeData, RawSnapshot};

/// Stable identifier of a logical node. Two nodes with the same id across
/// polls represent the same entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id for an edge that arrived without one. Re-fetching the
    /// same logical edge always yields the same id, which is what makes edge
    /// dedup across polls possible.
    pub fn derived(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("{}->{}", source.0, target.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topological role of a node, derived from edge direction or from an
/// explicit hint on the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Explanation,
    #[default]
    Default,
}

impl NodeKind {
    /// Maps a raw `data.type` string to a kind hint. The upstream store tags
    /// roots as `root` and keyword leaves as `keyword`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "root" => Some(NodeKind::Root),
            "keyword" | "explanation" => Some(NodeKind::Explanation),
            "default" => Some(NodeKind::Default),
            _ => None,
        }
    }
}

/// Provenance of a graph element. System elements arrive from polling; user
/// elements are created through manual edit actions. Origin decides layout
/// eligibility and survivability across merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    System,
    User,
}

/// Primary hierarchical relation versus a secondary keyword/reference
/// relation. Drives rendering style only; inert to merge logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[default]
    Child,
    Keyword,
}

impl RelationKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "HAS_KEYWORD" => RelationKind::Keyword,
            _ => RelationKind::Child,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Per-concept mastery metrics attached by the learning-profile subsystem.
/// Opaque to merge and layout; carried through to the render model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryProfile {
    /// Understanding dimension, 0..=1
    pub u: f32,
    /// Reasoning dimension, 0..=1
    pub r: f32,
    /// Application dimension, 0..=1
    pub a: f32,
    #[serde(default)]
    pub times: u32,
    #[serde(default)]
    pub last_practice: Option<String>,
}

impl MasteryProfile {
    /// Combined score, the mean of the three dimensions.
    pub fn score(&self) -> f32 {
        (self.u + self.r + self.a) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    /// Normalized display text. Authoritative text is `raw_label`.
    pub caption: String,
    /// Original text as received from the source.
    pub raw_label: String,
    pub kind: NodeKind,
    pub origin: Origin,
    pub position: Vec2,
    pub in_plan: bool,
    pub profile: Option<MasteryProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub relation: RelationKind,
    pub origin: Origin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_edge_id_is_deterministic() {
        let a = NodeId::from("n1");
        let b = NodeId::from("n2");
        assert_eq!(EdgeId::derived(&a, &b), EdgeId::derived(&a, &b));
        assert_eq!(EdgeId::derived(&a, &b).as_str(), "n1->n2");
        assert_ne!(EdgeId::derived(&a, &b), EdgeId::derived(&b, &a));
    }

    #[test]
    fn test_kind_hints() {
        assert_eq!(NodeKind::from_hint("root"), Some(NodeKind::Root));
        assert_eq!(NodeKind::from_hint("keyword"), Some(NodeKind::Explanation));
        assert_eq!(NodeKind::from_hint("explanation"), Some(NodeKind::Explanation));
        assert_eq!(NodeKind::from_hint("default"), Some(NodeKind::Default));
        assert_eq!(NodeKind::from_hint("banana"), None);
    }

    #[test]
    fn test_relation_kind_from_label() {
        assert_eq!(RelationKind::from_label("HAS_KEYWORD"), RelationKind::Keyword);
        assert_eq!(RelationKind::from_label("HAS_CHILD"), RelationKind::Child);
        assert_eq!(RelationKind::from_label(""), RelationKind::Child);
    }

    #[test]
    fn test_mastery_score() {
        let profile = MasteryProfile {
            u: 0.9,
            r: 0.6,
            a: 0.3,
            times: 4,
            last_practice: None,
        };
        assert!((profile.score() - 0.6).abs() < 1e-6);
    }
}
