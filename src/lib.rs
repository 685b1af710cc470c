//! twinmark - synchronization core for a dual-view Markdown editor
//!
//! A plain-text Markdown source and a rendered, directly editable tree are
//! kept consistent in both directions, including in-place structural
//! editing of tables and images that is written back into the source.
//!
//! The crate is toolkit agnostic: a host feeds events into
//! [`SyncCoordinator`] and reads back the source text, the rendered tree
//! (or its HTML), focus and scroll targets and the status line.

pub mod clipboard;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod files;
pub mod markdown;
pub mod preview;
pub mod status;
pub mod string_utils;
pub mod sync;

pub use config::{load_config, Settings};
pub use document::{Node, NodeId, RenderedTree, SourceBuffer, TextPosition, TextStats};
pub use error::{Error, Result};
pub use sync::{EditMode, SyncCoordinator, SyncState};
