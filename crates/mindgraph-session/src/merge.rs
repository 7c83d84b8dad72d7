use crate::annotate::annotate_plan_membership;
use crate::settings::SessionConfig;
use mindgraph_core::{
    GraphEdge, GraphNode, NodeId, NodeKind, Origin, RawSnapshot, RelationKind, Vec2,
    normalize_with_limit,
};
use mindgraph_graph::{GraphStore, LayeredLayouter, Layouter, classify_kinds};
use std::collections::HashSet;

/// What one merge actually changed, for logging and change notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added_nodes: usize,
    pub added_edges: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.added_nodes > 0 || self.added_edges > 0
    }
}

/// Reconciles polled snapshots against held state.
///
/// Only genuinely new nodes are laid out, as one self-contained batch placed
/// past the extent of everything already held. Held nodes keep their data
/// and positions; a held id reappearing in a later snapshot is ignored apart
/// from the plan-membership refresh. Held elements absent from a snapshot
/// are never removed, which is what lets user-authored content coexist with
/// polled content.
pub struct MergeEngine {
    config: SessionConfig,
}

impl MergeEngine {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Applies one snapshot. Idempotent: feeding the same snapshot twice
    /// changes nothing the second time, because novelty is re-derived from
    /// held ids on every call.
    pub fn merge(
        &self,
        store: &mut GraphStore,
        snapshot: &RawSnapshot,
        plan_concepts: &[String],
    ) -> MergeOutcome {
        // A transiently empty poll must not clear held state.
        if snapshot.nodes.is_empty() {
            return MergeOutcome::default();
        }

        let incoming_nodes = self.build_nodes(snapshot);
        let incoming_edges = Self::build_edges(snapshot);

        let truly_new: Vec<GraphNode> = incoming_nodes
            .into_iter()
            .filter(|node| !store.contains_node(&node.id))
            .collect();

        let mut outcome = MergeOutcome::default();

        if !truly_new.is_empty() {
            let new_ids: HashSet<NodeId> =
                truly_new.iter().map(|node| node.id.clone()).collect();

            // Edges internal to the batch shape its layout; edges bridging to
            // held nodes are connective only and must not perturb it.
            let internal_edges: Vec<GraphEdge> = incoming_edges
                .iter()
                .filter(|edge| new_ids.contains(&edge.source) && new_ids.contains(&edge.target))
                .cloned()
                .collect();

            let placed = self.place_batch(store, truly_new, &internal_edges);
            for node in placed {
                if store.insert_node(node) {
                    outcome.added_nodes += 1;
                }
            }
        }

        for edge in incoming_edges {
            if store.insert_edge(edge) {
                outcome.added_edges += 1;
            }
        }

        // Plan membership can change independently of structure, so the full
        // node set is refreshed, not just the batch.
        annotate_plan_membership(store.nodes_mut(), plan_concepts);

        tracing::debug!(
            added_nodes = outcome.added_nodes,
            added_edges = outcome.added_edges,
            held_nodes = store.node_count(),
            held_edges = store.edge_count(),
            "merged snapshot"
        );

        outcome
    }

    /// Normalizes captions and resolves kind hints for every incoming node.
    fn build_nodes(&self, snapshot: &RawSnapshot) -> Vec<GraphNode> {
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        let mut seen: HashSet<&str> = HashSet::new();

        for raw in &snapshot.nodes {
            if raw.id.is_empty() {
                tracing::warn!("skipping snapshot node with empty id");
                continue;
            }
            if !seen.insert(raw.id.as_str()) {
                continue;
            }

            let kind = raw
                .data
                .kind_hint
                .as_deref()
                .and_then(NodeKind::from_hint)
                .unwrap_or_default();

            nodes.push(GraphNode {
                id: NodeId::new(raw.id.clone()),
                caption: normalize_with_limit(&raw.data.label, self.config.max_caption_chars),
                raw_label: raw.data.label.clone(),
                kind,
                origin: Origin::System,
                position: Vec2::default(),
                in_plan: false,
                profile: raw.data.profile.clone(),
            });
        }

        nodes
    }

    fn build_edges(snapshot: &RawSnapshot) -> Vec<GraphEdge> {
        snapshot
            .edges
            .iter()
            .filter(|raw| {
                if raw.source.is_empty() || raw.target.is_empty() {
                    tracing::warn!("skipping snapshot edge with empty endpoint");
                    return false;
                }
                true
            })
            .map(|raw| GraphEdge {
                id: raw.edge_id(),
                source: NodeId::new(raw.source.clone()),
                target: NodeId::new(raw.target.clone()),
                relation: raw
                    .label
                    .as_deref()
                    .map(RelationKind::from_label)
                    .unwrap_or_default(),
                origin: Origin::System,
            })
            .collect()
    }

    /// Lays out the batch on its own, then translates it past the extent of
    /// held content so successive batches never overlap.
    fn place_batch(
        &self,
        store: &GraphStore,
        mut batch: Vec<GraphNode>,
        internal_edges: &[GraphEdge],
    ) -> Vec<GraphNode> {
        let kinds = classify_kinds(&batch, internal_edges);

        let layouter = LayeredLayouter {
            layer_spacing: self.config.layout.layer_spacing,
            node_spacing: self.config.layout.node_spacing,
            node_size: self.config.layout.node_size(),
            direction: self.config.layout.direction,
        };
        let positions = layouter.execute(&batch, internal_edges);

        let offset_y = self.batch_offset(store);
        for node in &mut batch {
            if let Some(&kind) = kinds.get(&node.id) {
                node.kind = kind;
            }
            let mut position = positions.get(&node.id).copied().unwrap_or_default();
            position.y += offset_y;
            node.position = position;
        }

        batch
    }

    /// Extent of held content along the stacking axis plus the configured
    /// gap; zero for the first batch.
    fn batch_offset(&self, store: &GraphStore) -> f32 {
        if store.is_empty() {
            return 0.0;
        }
        let node_height = self.config.layout.node_height;
        let max_extent = store
            .nodes()
            .iter()
            .map(|node| node.position.y + node_height)
            .fold(f32::NEG_INFINITY, f32::max);
        max_extent + self.config.batch_gap
    }
}
