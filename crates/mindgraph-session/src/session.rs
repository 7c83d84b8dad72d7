use crate::annotate::annotate_plan_membership;
use crate::controller::{Camera, EditController};
use crate::merge::{MergeEngine, MergeOutcome};
use crate::settings::SessionConfig;
use mindgraph_core::{
    EdgeId, MasteryProfile, NodeId, NodeKind, RawSnapshot, RelationKind, Vec2,
};
use mindgraph_events::{Event, EventBus};
use mindgraph_graph::GraphStore;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Renderer-ready view of the held graph, handed to the external node-link
/// rendering substrate on every state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub caption: String,
    pub kind: NodeKind,
    pub position: Vec2,
    pub in_plan: bool,
    pub profile: Option<MasteryProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub relation: RelationKind,
}

/// One graph-view session: owns the held state, the merge engine, and the
/// edit controller for the lifetime of a view. Nothing is persisted; the
/// next session re-fetches from the conversation-tree store.
///
/// All mutation goes through this façade, one call at a time, so polling
/// and editing can never interleave a half-applied state.
pub struct GraphSession {
    config: SessionConfig,
    store: GraphStore,
    merge: MergeEngine,
    controller: EditController,
    plan_concepts: Vec<String>,
    bus: EventBus,
}

impl Default for GraphSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl GraphSession {
    pub fn new(config: SessionConfig) -> Self {
        let bus = EventBus::new();
        Self {
            merge: MergeEngine::new(config.clone()),
            controller: EditController::new(config.history_capacity, bus.clone()),
            store: GraphStore::new(),
            plan_concepts: Vec::new(),
            config,
            bus,
        }
    }

    /// Events raised toward the host; subscribe before driving the session.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The single entry point for polled snapshots.
    pub fn on_snapshot(&mut self, snapshot: &RawSnapshot, plan_concepts: &[String]) -> MergeOutcome {
        self.plan_concepts = plan_concepts.to_vec();
        let outcome = self.merge.merge(&mut self.store, snapshot, plan_concepts);
        if outcome.changed() {
            self.publish_graph_changed();
        }
        outcome
    }

    /// Accepts a raw poll body. A malformed body is treated as an empty
    /// snapshot: logged, merged as a no-op, never surfaced as an error.
    pub fn on_snapshot_json(&mut self, body: &str, plan_concepts: &[String]) -> MergeOutcome {
        match RawSnapshot::from_json(body) {
            Ok(snapshot) => self.on_snapshot(&snapshot, plan_concepts),
            Err(err) => {
                tracing::warn!("ignoring malformed snapshot: {err}");
                self.on_snapshot(&RawSnapshot::default(), plan_concepts)
            }
        }
    }

    /// Re-applies plan membership without waiting for the next snapshot.
    pub fn reannotate(&mut self, plan_concepts: &[String]) {
        self.plan_concepts = plan_concepts.to_vec();
        annotate_plan_membership(self.store.nodes_mut(), plan_concepts);
        self.publish_graph_changed();
    }

    pub fn render_model(&self) -> RenderModel {
        let held: HashSet<&NodeId> = self.store.nodes().iter().map(|node| &node.id).collect();
        RenderModel {
            nodes: self
                .store
                .nodes()
                .iter()
                .map(|node| RenderNode {
                    id: node.id.clone(),
                    caption: node.caption.clone(),
                    kind: node.kind,
                    position: node.position,
                    in_plan: node.in_plan,
                    profile: node.profile.clone(),
                })
                .collect(),
            edges: self
                .store
                .edges()
                .iter()
                .filter(|edge| held.contains(&edge.source) && held.contains(&edge.target))
                .map(|edge| RenderEdge {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    relation: edge.relation,
                })
                .collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    /// Direct-drag write-through; positions are owned by the user from then
    /// on and no history entry is recorded.
    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> bool {
        let moved = self.store.move_node(id, position);
        if moved {
            self.publish_graph_changed();
        }
        moved
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.controller.camera
    }

    // ------------------------------------------------------------------
    // User command entry points, wired to context menus and shortcuts.
    // ------------------------------------------------------------------

    pub fn add_node(
        &mut self,
        position: Vec2,
        label: &str,
        source: Option<&NodeId>,
    ) -> Option<NodeId> {
        let id = self.controller.add_node(&mut self.store, position, label, source);
        if id.is_some() {
            annotate_plan_membership(self.store.nodes_mut(), &self.plan_concepts);
            self.publish_graph_changed();
        }
        id
    }

    pub fn delete_node(&mut self, id: &NodeId) -> bool {
        let deleted = self.controller.delete_node(&mut self.store, id);
        if deleted {
            self.publish_graph_changed();
        }
        deleted
    }

    pub fn rename_node(&mut self, id: &NodeId, new_label: &str) -> bool {
        let renamed = self.controller.rename_node(&mut self.store, id, new_label);
        if renamed {
            self.publish_graph_changed();
        }
        renamed
    }

    pub fn start_connection(&mut self, source: &NodeId) -> bool {
        self.controller.start_connection(&self.store, source)
    }

    pub fn complete_connection(&mut self, screen_position: Vec2) -> Option<NodeId> {
        let id = self.controller.complete_connection(&mut self.store, screen_position);
        if id.is_some() {
            self.publish_graph_changed();
        }
        id
    }

    pub fn cancel_connection(&mut self) -> bool {
        self.controller.cancel_connection()
    }

    pub fn is_connecting(&self) -> bool {
        self.controller.is_connecting()
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.controller.undo(&mut self.store);
        if undone {
            self.publish_graph_changed();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.controller.redo(&mut self.store);
        if redone {
            self.publish_graph_changed();
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.controller.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.controller.can_redo()
    }

    fn publish_graph_changed(&self) {
        self.bus.publish(Event::GraphChanged {
            node_count: self.store.node_count(),
            edge_count: self.store.edge_count(),
        });
    }
}

/// Shared handle for hosts where the poller and the UI live on different
/// threads. The mutex serializes "read held state, compute, write held
/// state" so a merge can never interleave with an edit.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<GraphSession>>,
}

impl SessionHandle {
    pub fn new(session: GraphSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, GraphSession> {
        self.inner.lock()
    }
}
