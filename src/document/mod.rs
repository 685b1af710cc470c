//! Document model: the Source Buffer, the Rendered Tree and derived stats.

pub mod buffer;
pub mod stats;
pub mod tree;

pub use buffer::{SourceBuffer, TextPosition};
pub use stats::TextStats;
pub use tree::{Element, Node, NodeId, NodeKind, RenderedTree};
