use mindgraph_core::{EdgeId, GraphEdge, GraphNode, NodeId, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The held graph: nodes and edges accumulated across merges and edits.
///
/// Insertion order is preserved and iteration is deterministic, which keeps
/// layout and render output stable across runs. Invariants maintained here:
/// node ids are unique, edge ids are unique, and every stored edge references
/// stored nodes (dangling edges are dropped on insert and on node removal).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "GraphStoreData")]
pub struct GraphStore {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    node_map: HashMap<NodeId, usize>,
    #[serde(skip)]
    edge_map: HashMap<EdgeId, usize>,
}

/// Deserialization shape; the id maps are derived state and get rebuilt.
#[derive(Deserialize)]
struct GraphStoreData {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

impl From<GraphStoreData> for GraphStore {
    fn from(data: GraphStoreData) -> Self {
        let mut store = GraphStore {
            nodes: data.nodes,
            edges: data.edges,
            node_map: HashMap::new(),
            edge_map: HashMap::new(),
        };
        store.rebuild_maps();
        store
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, refusing duplicates by id. Returns whether the node
    /// was added.
    pub fn insert_node(&mut self, node: GraphNode) -> bool {
        if self.node_map.contains_key(&node.id) {
            return false;
        }
        self.node_map.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Inserts an edge, refusing duplicates by id and dropping edges whose
    /// endpoints are not held. Returns whether the edge was added.
    pub fn insert_edge(&mut self, edge: GraphEdge) -> bool {
        if self.edge_map.contains_key(&edge.id) {
            return false;
        }
        if !self.node_map.contains_key(&edge.source) {
            tracing::warn!(
                "dropping edge {} because source node {} is not held",
                edge.id,
                edge.source
            );
            return false;
        }
        if !self.node_map.contains_key(&edge.target) {
            tracing::warn!(
                "dropping edge {} because target node {} is not held",
                edge.id,
                edge.target
            );
            return false;
        }
        self.edge_map.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_map.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.node_map.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        self.node_map.get(id).map(|&idx| &mut self.nodes[idx])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.iter_mut()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |edge| &edge.source == id)
    }

    /// All nodes reachable from `id` by following outgoing edges, excluding
    /// `id` itself. A visited set guards against cycles, so a malformed
    /// cyclic graph terminates instead of recursing forever.
    pub fn descendants_of(&self, id: &NodeId) -> Vec<NodeId> {
        let mut visited: HashSet<&NodeId> = HashSet::new();
        visited.insert(id);
        let mut stack: Vec<&NodeId> = vec![id];
        let mut descendants = Vec::new();

        while let Some(current) = stack.pop() {
            for edge in self.outgoing(current) {
                if visited.insert(&edge.target) {
                    descendants.push(edge.target.clone());
                    stack.push(&edge.target);
                }
            }
        }

        descendants
    }

    /// Removes every node in `ids` plus every edge touching one of them.
    /// Returns the removed nodes and edges in held order, so a delete can be
    /// fully captured for undo.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let mut removed_nodes = Vec::new();
        let mut kept_nodes = Vec::new();
        for node in self.nodes.drain(..) {
            if ids.contains(&node.id) {
                removed_nodes.push(node);
            } else {
                kept_nodes.push(node);
            }
        }
        self.nodes = kept_nodes;

        let mut removed_edges = Vec::new();
        let mut kept_edges = Vec::new();
        for edge in self.edges.drain(..) {
            if ids.contains(&edge.source) || ids.contains(&edge.target) {
                removed_edges.push(edge);
            } else {
                kept_edges.push(edge);
            }
        }
        self.edges = kept_edges;

        self.rebuild_maps();
        (removed_nodes, removed_edges)
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<GraphEdge> {
        let idx = self.edge_map.remove(id)?;
        let edge = self.edges.remove(idx);
        self.rebuild_maps();
        Some(edge)
    }

    /// Sets a node's position directly, as a drag handler does. Returns
    /// whether the node exists.
    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    fn rebuild_maps(&mut self) {
        self.node_map = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        self.edge_map = self
            .edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (edge.id.clone(), idx))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindgraph_core::{NodeKind, Origin, RelationKind};

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: NodeId::from(id),
            caption: id.to_string(),
            raw_label: id.to_string(),
            kind: NodeKind::Default,
            origin: Origin::System,
            position: Vec2::default(),
            in_plan: false,
            profile: None,
        }
    }

    fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: EdgeId::derived(&NodeId::from(source), &NodeId::from(target)),
            source: NodeId::from(source),
            target: NodeId::from(target),
            relation: RelationKind::Child,
            origin: Origin::System,
        }
    }

    #[test]
    fn test_insert_node_dedups_by_id() {
        let mut store = GraphStore::new();
        assert!(store.insert_node(node("a")));
        assert!(!store.insert_node(node("a")));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_insert_edge_drops_dangling() {
        let mut store = GraphStore::new();
        store.insert_node(node("a"));
        assert!(!store.insert_edge(edge("a", "missing")));
        assert!(!store.insert_edge(edge("missing", "a")));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_insert_edge_dedups_by_id() {
        let mut store = GraphStore::new();
        store.insert_node(node("a"));
        store.insert_node(node("b"));
        assert!(store.insert_edge(edge("a", "b")));
        assert!(!store.insert_edge(edge("a", "b")));
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_descendants_follow_outgoing_edges() {
        let mut store = GraphStore::new();
        for id in ["root", "a", "b", "c", "other"] {
            store.insert_node(node(id));
        }
        store.insert_edge(edge("root", "a"));
        store.insert_edge(edge("a", "b"));
        store.insert_edge(edge("b", "c"));
        store.insert_edge(edge("root", "other"));

        let mut descendants = store.descendants_of(&NodeId::from("a"));
        descendants.sort();
        assert_eq!(descendants, vec![NodeId::from("b"), NodeId::from("c")]);
    }

    #[test]
    fn test_descendants_terminate_on_cycle() {
        let mut store = GraphStore::new();
        for id in ["a", "b"] {
            store.insert_node(node(id));
        }
        store.insert_edge(edge("a", "b"));
        store.insert_edge(edge("b", "a"));

        assert_eq!(store.descendants_of(&NodeId::from("a")), vec![NodeId::from("b")]);
    }

    #[test]
    fn test_remove_nodes_captures_touching_edges() {
        let mut store = GraphStore::new();
        for id in ["root", "a", "b"] {
            store.insert_node(node(id));
        }
        store.insert_edge(edge("root", "a"));
        store.insert_edge(edge("a", "b"));

        let ids: HashSet<NodeId> = [NodeId::from("a"), NodeId::from("b")].into();
        let (removed_nodes, removed_edges) = store.remove_nodes(&ids);

        assert_eq!(removed_nodes.len(), 2);
        assert_eq!(removed_edges.len(), 2);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
        assert!(store.contains_node(&NodeId::from("root")));
    }

    #[test]
    fn test_maps_stay_consistent_after_removal() {
        let mut store = GraphStore::new();
        for id in ["a", "b", "c"] {
            store.insert_node(node(id));
        }
        store.insert_edge(edge("a", "b"));
        store.insert_edge(edge("b", "c"));

        store.remove_nodes(&[NodeId::from("a")].into());

        assert!(store.node(&NodeId::from("b")).is_some());
        assert!(store.node(&NodeId::from("c")).is_some());
        assert!(store.contains_edge(&EdgeId::new("b->c")));
        assert!(!store.contains_edge(&EdgeId::new("a->b")));
    }

    #[test]
    fn test_serde_round_trip_rebuilds_maps() {
        let mut store = GraphStore::new();
        store.insert_node(node("a"));
        store.insert_node(node("b"));
        store.insert_edge(edge("a", "b"));

        let json = serde_json::to_string(&store).unwrap();
        let back: GraphStore = serde_json::from_str(&json).unwrap();

        assert!(back.contains_node(&NodeId::from("a")));
        assert!(back.contains_edge(&EdgeId::new("a->b")));
        assert_eq!(back.node(&NodeId::from("b")).unwrap().caption, "b");
    }

    #[test]
    fn test_move_node() {
        let mut store = GraphStore::new();
        store.insert_node(node("a"));
        assert!(store.move_node(&NodeId::from("a"), Vec2::new(10.0, 20.0)));
        assert_eq!(store.node(&NodeId::from("a")).unwrap().position, Vec2::new(10.0, 20.0));
        assert!(!store.move_node(&NodeId::from("missing"), Vec2::default()));
    }
}
