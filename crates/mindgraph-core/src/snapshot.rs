use crate::{EdgeId, MasteryProfile, NodeId, error::SnapshotError};
use serde::{Deserialize, Serialize};

/// One fetched instance of the conversation-tree graph, in the shape the
/// upstream API returns it. Every field defaults, so a partial or malformed
/// body deserializes to an empty snapshot instead of failing the poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl RawSnapshot {
    pub fn from_json(body: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub data: RawNodeData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNodeData {
    #[serde(default)]
    pub label: String,
    /// Kind hint from the source store, e.g. `root` or `keyword`.
    #[serde(default, rename = "type")]
    pub kind_hint: Option<String>,
    #[serde(default)]
    pub profile: Option<MasteryProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    /// Relation label from the source store, e.g. `HAS_CHILD` or
    /// `HAS_KEYWORD`.
    #[serde(default)]
    pub label: Option<String>,
}

impl RawEdge {
    /// Explicit id when supplied, otherwise derived from the endpoints.
    pub fn edge_id(&self) -> EdgeId {
        match &self.id {
            Some(id) if !id.is_empty() => EdgeId::new(id.clone()),
            _ => EdgeId::derived(
                &NodeId::new(self.source.clone()),
                &NodeId::new(self.target.clone()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arrays_deserialize_to_empty() {
        let snapshot = RawSnapshot::from_json("{}").unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(RawSnapshot::from_json("not json").is_err());
    }

    #[test]
    fn test_full_snapshot_shape() {
        let body = r#"{
            "nodes": [
                {"id": "n1", "data": {"label": "什么是导数", "type": "root"}},
                {"id": "n2", "data": {"label": "导数", "type": "keyword",
                    "profile": {"u": 0.5, "r": 0.5, "a": 0.5, "times": 2}}}
            ],
            "edges": [
                {"id": "e1", "source": "n1", "target": "n2", "label": "HAS_KEYWORD"}
            ]
        }"#;
        let snapshot = RawSnapshot::from_json(body).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.nodes[0].data.kind_hint.as_deref(), Some("root"));
        assert_eq!(snapshot.nodes[1].data.profile.as_ref().unwrap().times, 2);
        assert_eq!(snapshot.edges[0].edge_id().as_str(), "e1");
    }

    #[test]
    fn test_edge_id_falls_back_to_endpoints() {
        let edge = RawEdge {
            id: None,
            source: "a".to_string(),
            target: "b".to_string(),
            label: None,
        };
        assert_eq!(edge.edge_id().as_str(), "a->b");

        let blank = RawEdge {
            id: Some(String::new()),
            ..edge.clone()
        };
        assert_eq!(blank.edge_id().as_str(), "a->b");
    }
}
