use mindgraph_core::{GraphEdge, GraphNode, NodeId};
use serde::{Deserialize, Serialize};

/// One undoable unit of user edit history. Entries are immutable once
/// pushed; applying them forward or backward is the edit controller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandEntry {
    Add {
        node: GraphNode,
        edge: Option<GraphEdge>,
    },
    Delete {
        node: GraphNode,
        descendants: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
    },
    Update {
        node_id: NodeId,
        old_caption: String,
        new_caption: String,
    },
}

/// Bounded linear command log with a single cursor separating undoable from
/// redoable entries. Knows nothing about what the entries mean.
///
/// `cursor` counts undoable entries: `0..cursor` can be undone (newest
/// last), `cursor..len` can be redone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLog<T> {
    entries: Vec<T>,
    cursor: usize,
    capacity: usize,
}

impl<T> CommandLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Appends an entry. Any redoable branch past the cursor is discarded,
    /// and the oldest entry is evicted once the bound is hit.
    pub fn push(&mut self, entry: T) {
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    /// Steps the cursor back and returns the entry to invert, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Steps the cursor forward and returns the entry to re-apply, or `None`
    /// when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let entry = &self.entries[self.cursor];
        self.cursor += 1;
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
