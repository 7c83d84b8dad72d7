//! Incremental merge, edit, and undo engine for a streamed conversation
//! graph. The poller feeds snapshots in, the renderer pulls the render
//! model out, and user edits go through [`GraphSession`]'s command entry
//! points.

pub mod annotate;
pub mod controller;
pub mod history;
pub mod merge;
pub mod session;
pub mod settings;

pub use annotate::annotate_plan_membership;
pub use controller::{Camera, EditController};
pub use history::{CommandEntry, CommandLog};
pub use merge::{MergeEngine, MergeOutcome};
pub use session::{GraphSession, RenderEdge, RenderModel, RenderNode, SessionHandle};
pub use settings::{LayoutConfig, SessionConfig};
