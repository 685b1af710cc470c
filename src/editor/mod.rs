//! Structural editors for the rendered view
//!
//! Tables and images can be manipulated directly in the rendered view.
//! After every render the coordinator wraps each `table` and `img` in
//! editor scaffolding (control bars, resize handles, labels); before the
//! rendered view is serialized the scaffolding is stripped again so only
//! document content reaches Markdown.

pub mod image;
pub mod table;

use crate::document::{Node, RenderedTree};
use std::path::Path;

pub use image::{
    attach_image_resizers, ImageDragSession, IMAGE_WRAPPER_CLASS, MIN_IMAGE_SIZE,
    RESIZE_HANDLE_CLASS, SIZE_LABEL_CLASS,
};
pub use table::{
    attach_table_editors, cell_position, locate_table_span, navigate, CaretEdge, CellPosition,
    ColumnPosition, NavigationOutcome, RowPosition, TableCellData, TableData, TableKey,
    TableMenuAction, TableOp, TABLE_WRAPPER_CLASS,
};

/// Classes of elements that exist only for editing and carry no content.
const SCAFFOLD_ONLY_CLASSES: &[&str] = &[
    table::ROW_CONTROLS_CLASS,
    table::COL_CONTROLS_CLASS,
    table::CONTEXT_MENU_CLASS,
    table::COL_RESIZER_CLASS,
    table::ROW_RESIZER_CLASS,
    image::RESIZE_HANDLE_CLASS,
    image::SIZE_LABEL_CLASS,
];

pub(crate) fn is_scaffold_only(node: &Node) -> bool {
    SCAFFOLD_ONLY_CLASSES.iter().any(|c| node.has_class(c))
}

/// Run every structural post-processor over a freshly rendered tree.
pub fn attach_scaffolding(tree: &mut RenderedTree, source: &str, document_dir: Option<&Path>) {
    attach_table_editors(tree, source);
    attach_image_resizers(tree, source, document_dir);
}

/// Remove editor-only elements below `node` and unwrap table and image
/// wrappers into their bare `table` / `img`.
///
/// A wrapper that lost its structural child keeps whatever content it
/// still has, so nothing typed into it is dropped.
pub fn strip_editor_scaffolding(node: &mut Node) {
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        if is_scaffold_only(&child) {
            continue;
        }

        let wrapped_tag = if child.has_class(TABLE_WRAPPER_CLASS) {
            Some("table")
        } else if child.has_class(IMAGE_WRAPPER_CLASS) {
            Some("img")
        } else {
            None
        };

        match wrapped_tag {
            Some(tag) => match child.find_tag(tag).cloned() {
                Some(mut inner) => {
                    strip_editor_scaffolding(&mut inner);
                    node.children.push(inner);
                }
                None => {
                    strip_editor_scaffolding(&mut child);
                    node.children.append(&mut child.children);
                }
            },
            None => {
                strip_editor_scaffolding(&mut child);
                node.children.push(child);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
