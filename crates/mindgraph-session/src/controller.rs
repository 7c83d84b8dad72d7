use crate::history::{CommandEntry, CommandLog};
use mindgraph_core::{EdgeId, GraphEdge, GraphNode, NodeId, NodeKind, Origin, RelationKind, Vec2};
use mindgraph_events::{Event, EventBus};
use mindgraph_graph::GraphStore;
use std::collections::HashSet;

/// Placeholder caption for a node created by completing a manual connection.
const CONNECTION_NODE_LABEL: &str = "新节点";

/// Viewport transform between screen and graph coordinates, fed by the
/// external pan/zoom renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::default(),
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn screen_to_graph(&self, screen: Vec2) -> Vec2 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Vec2::new((screen.x - self.pan.x) / zoom, (screen.y - self.pan.y) / zoom)
    }
}

/// Translates user intents into graph mutations and history entries.
///
/// Every operation is synchronous and infallible: invalid input (unknown
/// ids, blank labels, out-of-order gesture events) degrades to a no-op that
/// returns `false` and pushes nothing.
pub struct EditController {
    log: CommandLog<CommandEntry>,
    pending_connection: Option<NodeId>,
    pub camera: Camera,
    bus: EventBus,
    next_manual_id: u64,
}

impl EditController {
    pub fn new(history_capacity: usize, bus: EventBus) -> Self {
        Self {
            log: CommandLog::new(history_capacity),
            pending_connection: None,
            camera: Camera::default(),
            bus,
            next_manual_id: 0,
        }
    }

    /// Creates a user-origin node at `position`. The label is kept verbatim:
    /// user-typed names get no prompt stripping and no truncation. With a
    /// `source` given, also connects it to the new node.
    pub fn add_node(
        &mut self,
        store: &mut GraphStore,
        position: Vec2,
        label: &str,
        source: Option<&NodeId>,
    ) -> Option<NodeId> {
        let id = self.fresh_manual_id(store);
        let node = GraphNode {
            id: id.clone(),
            caption: label.to_string(),
            raw_label: label.to_string(),
            kind: NodeKind::Default,
            origin: Origin::User,
            position,
            in_plan: false,
            profile: None,
        };
        store.insert_node(node.clone());

        let edge = source.and_then(|source_id| {
            if !store.contains_node(source_id) {
                tracing::warn!("add_node source {} is not held, node added unconnected", source_id);
                return None;
            }
            let edge = Self::user_edge(source_id, &id);
            store.insert_edge(edge.clone());
            Some(edge)
        });

        self.push(CommandEntry::Add { node, edge });
        Some(id)
    }

    /// Deletes a node together with every descendant reachable through
    /// outgoing edges, capturing the whole subtree for undo.
    pub fn delete_node(&mut self, store: &mut GraphStore, id: &NodeId) -> bool {
        if !store.contains_node(id) {
            return false;
        }

        let mut doomed: HashSet<NodeId> = store.descendants_of(id).into_iter().collect();
        doomed.insert(id.clone());
        let (mut removed_nodes, removed_edges) = store.remove_nodes(&doomed);

        let target_idx = removed_nodes
            .iter()
            .position(|node| &node.id == id)
            .unwrap_or(0);
        let node = removed_nodes.remove(target_idx);

        self.push(CommandEntry::Delete {
            node,
            descendants: removed_nodes,
            edges: removed_edges,
        });
        true
    }

    /// Updates a node's caption. Blank labels and unknown ids are no-ops and
    /// leave the history untouched.
    pub fn rename_node(&mut self, store: &mut GraphStore, id: &NodeId, new_label: &str) -> bool {
        let new_caption = new_label.trim();
        if new_caption.is_empty() {
            return false;
        }
        let Some(node) = store.node_mut(id) else {
            return false;
        };
        if node.caption == new_caption {
            return false;
        }

        let old_caption = std::mem::replace(&mut node.caption, new_caption.to_string());
        self.push(CommandEntry::Update {
            node_id: id.clone(),
            old_caption,
            new_caption: new_caption.to_string(),
        });
        true
    }

    /// First half of the manual edge-draw gesture: remember the source and
    /// enter connecting mode.
    pub fn start_connection(&mut self, store: &GraphStore, source: &NodeId) -> bool {
        if !store.contains_node(source) {
            return false;
        }
        self.pending_connection = Some(source.clone());
        self.bus.publish(Event::ConnectionStarted {
            source: source.clone(),
        });
        true
    }

    /// Second half: drop a placeholder node where the pointer ended and
    /// connect the recorded source to it, as one undoable unit. Returns
    /// `None` when no gesture is in flight.
    pub fn complete_connection(
        &mut self,
        store: &mut GraphStore,
        screen_position: Vec2,
    ) -> Option<NodeId> {
        let source = self.pending_connection.take()?;
        let position = self.camera.screen_to_graph(screen_position);

        let id = self.fresh_manual_id(store);
        let node = GraphNode {
            id: id.clone(),
            caption: CONNECTION_NODE_LABEL.to_string(),
            raw_label: CONNECTION_NODE_LABEL.to_string(),
            kind: NodeKind::Default,
            origin: Origin::User,
            position,
            in_plan: false,
            profile: None,
        };
        let edge = Self::user_edge(&source, &id);

        store.insert_node(node.clone());
        store.insert_edge(edge.clone());
        self.push(CommandEntry::Add {
            node,
            edge: Some(edge),
        });
        self.bus.publish(Event::ConnectionEnded { completed: true });
        Some(id)
    }

    pub fn cancel_connection(&mut self) -> bool {
        let was_connecting = self.pending_connection.take().is_some();
        if was_connecting {
            self.bus.publish(Event::ConnectionEnded { completed: false });
        }
        was_connecting
    }

    pub fn is_connecting(&self) -> bool {
        self.pending_connection.is_some()
    }

    /// Applies the inverse of the most recent entry. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self, store: &mut GraphStore) -> bool {
        let Some(entry) = self.log.undo().cloned() else {
            return false;
        };

        match entry {
            CommandEntry::Add { node, edge } => {
                if let Some(edge) = edge {
                    store.remove_edge(&edge.id);
                }
                store.remove_nodes(&[node.id].into());
            }
            CommandEntry::Delete {
                node,
                descendants,
                edges,
            } => {
                // Re-insert tolerantly: ids added since the delete stay put.
                store.insert_node(node);
                for descendant in descendants {
                    store.insert_node(descendant);
                }
                for edge in edges {
                    store.insert_edge(edge);
                }
            }
            CommandEntry::Update {
                node_id,
                old_caption,
                ..
            } => {
                if let Some(node) = store.node_mut(&node_id) {
                    node.caption = old_caption;
                }
            }
        }

        self.notify_history();
        true
    }

    /// Re-applies the next entry forward. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self, store: &mut GraphStore) -> bool {
        let Some(entry) = self.log.redo().cloned() else {
            return false;
        };

        match entry {
            CommandEntry::Add { node, edge } => {
                store.insert_node(node);
                if let Some(edge) = edge {
                    store.insert_edge(edge);
                }
            }
            CommandEntry::Delete {
                node, descendants, ..
            } => {
                let mut doomed: HashSet<NodeId> =
                    descendants.iter().map(|n| n.id.clone()).collect();
                doomed.insert(node.id);
                store.remove_nodes(&doomed);
            }
            CommandEntry::Update {
                node_id,
                new_caption,
                ..
            } => {
                if let Some(node) = store.node_mut(&node_id) {
                    node.caption = new_caption;
                }
            }
        }

        self.notify_history();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.log.clear();
        self.notify_history();
    }

    fn push(&mut self, entry: CommandEntry) {
        self.log.push(entry);
        self.notify_history();
    }

    fn notify_history(&self) {
        self.bus.publish(Event::UndoStackChanged {
            can_undo: self.log.can_undo(),
            can_redo: self.log.can_redo(),
        });
    }

    fn user_edge(source: &NodeId, target: &NodeId) -> GraphEdge {
        GraphEdge {
            id: EdgeId::derived(source, target),
            source: source.clone(),
            target: target.clone(),
            relation: RelationKind::Child,
            origin: Origin::User,
        }
    }

    /// Ids for manually created nodes; skips any id already held so user
    /// nodes never collide with polled ones.
    fn fresh_manual_id(&mut self, store: &GraphStore) -> NodeId {
        loop {
            self.next_manual_id += 1;
            let id = NodeId::new(format!("manual-{}", self.next_manual_id));
            if !store.contains_node(&id) {
                return id;
            }
        }
    }
}
