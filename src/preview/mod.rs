//! Preview pane behavior: scroll mirroring and split geometry.

pub mod layout;
pub mod sync_scroll;

pub use layout::{PaneLayout, ViewGeometry};
pub use sync_scroll::{ScrollMetrics, ScrollOrigin, SyncScrollState};
