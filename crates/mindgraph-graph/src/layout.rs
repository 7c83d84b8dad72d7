use mindgraph_core::{GraphEdge, GraphNode, LayoutDirection, NodeId, NodeKind, Vec2};
use std::collections::{HashMap, HashSet};

pub trait Layouter {
    /// Assigns a top-left-anchored position to every node. Edges are read
    /// for structure and left unchanged.
    fn execute(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> HashMap<NodeId, Vec2>;
}

/// Classifies each node by topology: in-degree 0 is a root; otherwise a node
/// with out-degree 0, or one that already carries an explanation hint, is an
/// explanation leaf.
pub fn classify_kinds(nodes: &[GraphNode], edges: &[GraphEdge]) -> HashMap<NodeId, NodeKind> {
    let mut has_incoming: HashSet<&NodeId> = HashSet::new();
    let mut has_outgoing: HashSet<&NodeId> = HashSet::new();
    for edge in edges {
        has_incoming.insert(&edge.target);
        has_outgoing.insert(&edge.source);
    }

    nodes
        .iter()
        .map(|node| {
            let kind = if !has_incoming.contains(&node.id) {
                NodeKind::Root
            } else if node.kind == NodeKind::Explanation || !has_outgoing.contains(&node.id) {
                NodeKind::Explanation
            } else {
                NodeKind::Default
            };
            (node.id.clone(), kind)
        })
        .collect()
}

/// Directed layered layout: nodes are ranked along the flow direction so
/// edges generally point forward, layers are ordered by barycenter passes,
/// and siblings are separated by a fixed footprint plus spacing.
///
/// Holds no state across calls, so it can be run independently on disjoint
/// subsets of the graph; incremental merge relies on that.
pub struct LayeredLayouter {
    /// Distance between consecutive rank layers, center to center.
    pub layer_spacing: f32,
    /// Spacing between adjacent nodes inside one layer.
    pub node_spacing: f32,
    /// Fixed node footprint used for all spacing math.
    pub node_size: Vec2,
    pub direction: LayoutDirection,
}

impl Default for LayeredLayouter {
    fn default() -> Self {
        Self {
            layer_spacing: 240.0,
            node_spacing: 60.0,
            node_size: Vec2::new(160.0, 40.0),
            direction: LayoutDirection::Horizontal,
        }
    }
}

struct Relations {
    links: Vec<(NodeId, NodeId)>,
    incoming: HashMap<NodeId, Vec<NodeId>>,
    outgoing: HashMap<NodeId, Vec<NodeId>>,
}

impl LayeredLayouter {
    /// Bound on ranking iterations; a cyclic graph never converges, so the
    /// pass stops here and keeps whatever consistent-enough layering it has.
    const MAX_RANKING_ITERATIONS: usize = 1000;

    fn build_relations(nodes: &[GraphNode], edges: &[GraphEdge]) -> Relations {
        let ids: HashSet<&NodeId> = nodes.iter().map(|node| &node.id).collect();
        let mut relations = Relations {
            links: Vec::new(),
            incoming: HashMap::new(),
            outgoing: HashMap::new(),
        };

        for edge in edges {
            if !ids.contains(&edge.source) || !ids.contains(&edge.target) {
                continue;
            }
            relations
                .links
                .push((edge.source.clone(), edge.target.clone()));
            relations
                .incoming
                .entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
            relations
                .outgoing
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }

        relations
    }

    fn assign_ranks(nodes: &[GraphNode], relations: &Relations) -> HashMap<NodeId, i32> {
        let mut ranks: HashMap<NodeId, i32> = nodes
            .iter()
            .map(|node| (node.id.clone(), 0))
            .collect();

        let max_iterations = (nodes.len() + 2).min(Self::MAX_RANKING_ITERATIONS);
        let mut converged = false;
        for _ in 0..max_iterations {
            let mut changed = false;
            for (source, target) in &relations.links {
                if let (Some(&source_rank), Some(&target_rank)) =
                    (ranks.get(source), ranks.get(target))
                    && target_rank <= source_rank
                {
                    ranks.insert(target.clone(), source_rank + 1);
                    changed = true;
                }
            }

            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "rank assignment did not converge after {} iterations, graph is cyclic",
                max_iterations
            );
        }

        Self::compress_ranks(&mut ranks);
        ranks
    }

    fn compress_ranks(ranks: &mut HashMap<NodeId, i32>) {
        if ranks.is_empty() {
            return;
        }

        let mut unique_ranks: Vec<i32> = ranks.values().copied().collect();
        unique_ranks.sort_unstable();
        unique_ranks.dedup();

        let remap: HashMap<i32, i32> = unique_ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| (rank, i as i32))
            .collect();

        for rank in ranks.values_mut() {
            if let Some(new_rank) = remap.get(rank) {
                *rank = *new_rank;
            }
        }
    }

    fn build_layers(
        nodes: &[GraphNode],
        ranks: &HashMap<NodeId, i32>,
    ) -> HashMap<i32, Vec<NodeId>> {
        let captions: HashMap<&NodeId, &str> = nodes
            .iter()
            .map(|node| (&node.id, node.caption.as_str()))
            .collect();

        let mut layers: HashMap<i32, Vec<NodeId>> = HashMap::new();
        for node in nodes {
            if let Some(&rank) = ranks.get(&node.id) {
                layers.entry(rank).or_default().push(node.id.clone());
            }
        }

        // Deterministic starting order within a layer.
        for layer_nodes in layers.values_mut() {
            layer_nodes.sort_by(|a, b| {
                captions
                    .get(a)
                    .cmp(&captions.get(b))
                    .then_with(|| a.cmp(b))
            });
        }

        layers
    }

    fn sorted_ranks(layers: &HashMap<i32, Vec<NodeId>>) -> Vec<i32> {
        let mut sorted_ranks: Vec<i32> = layers.keys().copied().collect();
        sorted_ranks.sort_unstable();
        sorted_ranks
    }

    fn order_layer_by_barycenter(
        layer_nodes: &mut [NodeId],
        slots: &HashMap<NodeId, f32>,
        neighbors: &HashMap<NodeId, Vec<NodeId>>,
    ) {
        let mut barycenters: HashMap<NodeId, f32> = HashMap::new();

        for node_id in layer_nodes.iter() {
            let mut sum = 0.0;
            let mut count = 0;
            if let Some(linked) = neighbors.get(node_id) {
                for neighbor in linked {
                    if let Some(&slot) = slots.get(neighbor) {
                        sum += slot;
                        count += 1;
                    }
                }
            }

            let barycenter = if count > 0 {
                sum / count as f32
            } else {
                slots.get(node_id).copied().unwrap_or(0.0)
            };
            barycenters.insert(node_id.clone(), barycenter);
        }

        layer_nodes.sort_by(|a, b| {
            barycenters
                .get(a)
                .unwrap_or(&0.0)
                .partial_cmp(barycenters.get(b).unwrap_or(&0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
    }

    fn run_barycenter_passes(
        &self,
        layers: &mut HashMap<i32, Vec<NodeId>>,
        sorted_ranks: &[i32],
        relations: &Relations,
    ) {
        let slot_width = self.cross_size() + self.node_spacing;
        let mut slots: HashMap<NodeId, f32> = HashMap::new();
        for rank in sorted_ranks {
            if let Some(layer_nodes) = layers.get(rank) {
                for (slot, node_id) in layer_nodes.iter().enumerate() {
                    slots.insert(node_id.clone(), slot as f32 * slot_width);
                }
            }
        }

        for _ in 0..2 {
            for &rank in sorted_ranks.iter().skip(1) {
                if let Some(layer_nodes) = layers.get_mut(&rank) {
                    Self::order_layer_by_barycenter(layer_nodes, &slots, &relations.incoming);
                    for (slot, node_id) in layer_nodes.iter().enumerate() {
                        slots.insert(node_id.clone(), slot as f32 * slot_width);
                    }
                }
            }

            for i in (0..sorted_ranks.len().saturating_sub(1)).rev() {
                let rank = sorted_ranks[i];
                if let Some(layer_nodes) = layers.get_mut(&rank) {
                    Self::order_layer_by_barycenter(layer_nodes, &slots, &relations.outgoing);
                    for (slot, node_id) in layer_nodes.iter().enumerate() {
                        slots.insert(node_id.clone(), slot as f32 * slot_width);
                    }
                }
            }
        }
    }

    /// Footprint extent perpendicular to the flow direction.
    fn cross_size(&self) -> f32 {
        match self.direction {
            LayoutDirection::Horizontal => self.node_size.y,
            LayoutDirection::Vertical => self.node_size.x,
        }
    }

    fn place_layers(
        &self,
        layers: &HashMap<i32, Vec<NodeId>>,
        sorted_ranks: &[i32],
    ) -> HashMap<NodeId, Vec2> {
        let cross_step = self.cross_size() + self.node_spacing;
        let mut centers: HashMap<NodeId, Vec2> = HashMap::new();

        for rank in sorted_ranks {
            let Some(layer_nodes) = layers.get(rank) else {
                continue;
            };
            let extent =
                layer_nodes.len() as f32 * self.cross_size()
                    + layer_nodes.len().saturating_sub(1) as f32 * self.node_spacing;
            let mut cross = -extent / 2.0 + self.cross_size() / 2.0;
            let along = *rank as f32 * self.layer_spacing;

            for node_id in layer_nodes {
                let center = match self.direction {
                    LayoutDirection::Horizontal => Vec2::new(along, cross),
                    LayoutDirection::Vertical => Vec2::new(cross, along),
                };
                centers.insert(node_id.clone(), center);
                cross += cross_step;
            }
        }

        centers
    }

    /// Converts centers to top-left anchors and shifts the whole batch so its
    /// bounding box starts at the origin. Callers that stack batches can then
    /// offset by extent alone.
    fn anchor_top_left(&self, centers: HashMap<NodeId, Vec2>) -> HashMap<NodeId, Vec2> {
        let mut positions: HashMap<NodeId, Vec2> = centers
            .into_iter()
            .map(|(id, center)| {
                (
                    id,
                    Vec2::new(
                        center.x - self.node_size.x / 2.0,
                        center.y - self.node_size.y / 2.0,
                    ),
                )
            })
            .collect();

        let min_x = positions.values().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = positions.values().map(|p| p.y).fold(f32::INFINITY, f32::min);
        if min_x.is_finite() && min_y.is_finite() {
            for position in positions.values_mut() {
                position.x -= min_x;
                position.y -= min_y;
            }
        }

        positions
    }
}

impl Layouter for LayeredLayouter {
    fn execute(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> HashMap<NodeId, Vec2> {
        if nodes.is_empty() {
            return HashMap::new();
        }

        let relations = Self::build_relations(nodes, edges);
        let ranks = Self::assign_ranks(nodes, &relations);
        let mut layers = Self::build_layers(nodes, &ranks);
        let sorted_ranks = Self::sorted_ranks(&layers);
        self.run_barycenter_passes(&mut layers, &sorted_ranks, &relations);
        let centers = self.place_layers(&layers, &sorted_ranks);
        self.anchor_top_left(centers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindgraph_core::{EdgeId, Origin, RelationKind};
    use proptest::prelude::*;

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
    fn test_classify_root_and_leaf() {
        let nodes = vec![node("n1"), node("n2")];
        let edges = vec![edge("n1", "n2")];
        let kinds = classify_kinds(&nodes, &edges);
        assert_eq!(kinds[&NodeId::from("n1")], NodeKind::Root);
        assert_eq!(kinds[&NodeId::from("n2")], NodeKind::Explanation);
    }

    #[test]
    fn test_classify_internal_node_is_default() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let kinds = classify_kinds(&nodes, &edges);
        assert_eq!(kinds[&NodeId::from("b")], NodeKind::Default);
    }

    #[test]
    fn test_classify_keeps_explanation_hint() {
        let mut hinted = node("b");
        hinted.kind = NodeKind::Explanation;
        let nodes = vec![node("a"), hinted, node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let kinds = classify_kinds(&nodes, &edges);
        assert_eq!(kinds[&NodeId::from("b")], NodeKind::Explanation);
    }

    #[test]
    fn test_chain_ranks_along_flow_axis() {
        let layouter = LayeredLayouter::default();
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let positions = layouter.execute(&nodes, &edges);

        let a = positions[&NodeId::from("a")];
        let b = positions[&NodeId::from("b")];
        let c = positions[&NodeId::from("c")];
        assert!(a.x < b.x && b.x < c.x);
        assert_eq!(b.x - a.x, layouter.layer_spacing);
        assert_eq!(c.x - b.x, layouter.layer_spacing);
    }

    #[test]
    fn test_vertical_direction_ranks_along_y() {
        let layouter = LayeredLayouter {
            direction: LayoutDirection::Vertical,
            ..Default::default()
        };
        let positions = layouter.execute(&[node("a"), node("b")], &[edge("a", "b")]);
        assert!(positions[&NodeId::from("a")].y < positions[&NodeId::from("b")].y);
    }

    #[test]
    fn test_siblings_are_separated() {
        let layouter = LayeredLayouter::default();
        let nodes = vec![node("root"), node("s1"), node("s2")];
        let edges = vec![edge("root", "s1"), edge("root", "s2")];
        let positions = layouter.execute(&nodes, &edges);

        let s1 = positions[&NodeId::from("s1")];
        let s2 = positions[&NodeId::from("s2")];
        assert!(
            (s1.y - s2.y).abs() >= layouter.node_size.y + layouter.node_spacing,
            "siblings overlap: {s1:?} vs {s2:?}"
        );
    }

    #[test]
    fn test_isolated_node_lands_at_origin() {
        let layouter = LayeredLayouter::default();
        let positions = layouter.execute(&[node("only")], &[]);
        assert_eq!(positions[&NodeId::from("only")], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_cycle_is_tolerated() {
        let layouter = LayeredLayouter::default();
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let positions = layouter.execute(&nodes, &edges);
        assert_eq!(positions.len(), 2);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let layouter = LayeredLayouter::default();
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("c", "d")];
        let first = layouter.execute(&nodes, &edges);
        let second = layouter.execute(&nodes, &edges);
        assert_eq!(first, second);
    }

    proptest! {
        /// Every node gets a position and the batch bounding box starts at
        /// the origin, whatever the (possibly dangling) edge set.
        #[test]
        fn prop_all_nodes_placed_with_origin_bbox(
            node_count in 1usize..20,
            raw_edges in proptest::collection::vec((0usize..20, 0usize..20), 0..30)
        ) {
            let nodes: Vec<GraphNode> =
                (0..node_count).map(|i| node(&format!("n{i}"))).collect();
            let edges: Vec<GraphEdge> = raw_edges
                .iter()
                .map(|(s, t)| edge(&format!("n{s}"), &format!("n{t}")))
                .collect();

            let layouter = LayeredLayouter::default();
            let positions = layouter.execute(&nodes, &edges);

            prop_assert_eq!(positions.len(), node_count);
            let min_x = positions.values().map(|p| p.x).fold(f32::INFINITY, f32::min);
            let min_y = positions.values().map(|p| p.y).fold(f32::INFINITY, f32::min);
            prop_assert!(min_x.abs() < 1e-3);
            prop_assert!(min_y.abs() < 1e-3);
        }
    }
}
