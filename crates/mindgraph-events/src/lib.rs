use crossbeam_channel::{Receiver, Sender, unbounded};
use mindgraph_core::NodeId;
use serde::{Deserialize, Serialize};

/// Notifications raised by the session toward the rendering substrate and
/// the host UI. The graph itself is pulled through the render model; events
/// only signal that something changed or that an affordance toggled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Held state changed (merge or edit); the renderer should pull a fresh
    /// render model.
    GraphChanged {
        node_count: usize,
        edge_count: usize,
    },
    /// Undo/redo affordances should be enabled or disabled.
    UndoStackChanged {
        can_undo: bool,
        can_redo: bool,
    },
    /// A manual edge-draw gesture started from this node.
    ConnectionStarted {
        source: NodeId,
    },
    /// The gesture ended, either by completing an edge or by cancelling.
    ConnectionEnded {
        completed: bool,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener, typically once per UI
    /// frame.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Implemented by host components that respond to session events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
