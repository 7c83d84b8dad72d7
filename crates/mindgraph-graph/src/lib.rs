pub mod graph;
pub mod layout;

pub use graph::GraphStore;
pub use layout::{LayeredLayouter, Layouter, classify_kinds};
