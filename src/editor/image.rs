//! Drag-to-resize for images in the rendered view
//!
//! Each `img` is wrapped in a container carrying the source URL it was
//! rendered from, a corner handle and a size label. A drag is tracked by
//! [`ImageDragSession`], which keeps the aspect ratio and a minimum size;
//! on release the final width is written back to the Markdown source as a
//! `?w=N` suffix.

use crate::document::{Node, NodeId, RenderedTree};
use crate::markdown::image_width::{annotated_width, source_path_of, width_style};
use std::path::Path;

pub const IMAGE_WRAPPER_CLASS: &str = "image-resizer-wrapper";
pub const RESIZE_HANDLE_CLASS: &str = "image-resize-handle";
pub const SIZE_LABEL_CLASS: &str = "image-size-label";
pub const ORIGINAL_SRC_ATTR: &str = "data-original-src";

/// Smallest size (px) either side of an image may be dragged to.
pub const MIN_IMAGE_SIZE: f32 = 50.0;

/// Wrap every not-yet-wrapped `img` in resize scaffolding.
///
/// Images rendered without an explicit width pick up the width annotated
/// in `source`, so a freshly attached image shows at its stored size.
pub fn attach_image_resizers(tree: &mut RenderedTree, source: &str, document_dir: Option<&Path>) {
    let ids: Vec<NodeId> = tree
        .descendants()
        .filter(|n| n.is_tag("img"))
        .map(|n| n.id)
        .collect();

    for (index, id) in ids.into_iter().enumerate() {
        let already_wrapped = tree
            .parent_of(id)
            .and_then(|p| tree.get(p))
            .is_some_and(|p| p.has_class(IMAGE_WRAPPER_CLASS));
        if already_wrapped {
            continue;
        }
        let Some(mut img) = tree.get(id).cloned() else {
            continue;
        };
        let src = img.attr("src").unwrap_or_default().to_string();

        if img.style_width_px().is_none() {
            if let Some(width) = annotated_width(source, &source_path_of(&src, document_dir)) {
                img.set_attr("style", width_style(width));
            }
        }

        let wrapper = Node::element("div")
            .with_class(IMAGE_WRAPPER_CLASS)
            .with_attr("data-image-index", index.to_string())
            .with_attr(ORIGINAL_SRC_ATTR, src)
            .with_attr("style", "display: inline-block; position: relative;")
            .with_child(img)
            .with_child(
                Node::element("div")
                    .with_class(RESIZE_HANDLE_CLASS)
                    .with_attr("title", "Drag to resize"),
            )
            .with_child(
                Node::element("div")
                    .with_class(SIZE_LABEL_CLASS)
                    .with_attr("style", "display: none;"),
            );
        tree.replace(id, wrapper);
    }
}

/// The URL an image wrapper was rendered from.
pub fn original_src(wrapper: &Node) -> Option<&str> {
    wrapper.attr(ORIGINAL_SRC_ATTR)
}

/// The image resize wrapper containing `id` (or `id` itself).
pub fn enclosing_image_wrapper(tree: &RenderedTree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        if tree.get(current)?.has_class(IMAGE_WRAPPER_CLASS) {
            return Some(current);
        }
        current = tree.parent_of(current)?;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drag session
// ─────────────────────────────────────────────────────────────────────────────

/// An in-progress resize drag on one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDragSession {
    pub wrapper: NodeId,
    start_width: f32,
    start_height: f32,
    aspect: f32,
    width: f32,
    height: f32,
}

impl ImageDragSession {
    /// Start a drag from the image's current displayed size.
    ///
    /// Returns `None` for an image that has not been laid out yet.
    pub fn begin(wrapper: NodeId, width: f32, height: f32) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        Some(Self {
            wrapper,
            start_width: width,
            start_height: height,
            aspect: width / height,
            width,
            height,
        })
    }

    /// Update the size from the pointer offset since the drag started.
    ///
    /// Horizontal movement drives the size unless the vertical offset is
    /// larger. The aspect ratio is kept and the smaller side never drops
    /// below [`MIN_IMAGE_SIZE`].
    pub fn update(&mut self, dx: f32, dy: f32) -> (f32, f32) {
        let (mut width, mut height) = if dy.abs() > dx.abs() {
            let height = self.start_height + dy;
            (height * self.aspect, height)
        } else {
            let width = self.start_width + dx;
            (width, width / self.aspect)
        };

        let (min_width, min_height) = if self.aspect >= 1.0 {
            (MIN_IMAGE_SIZE * self.aspect, MIN_IMAGE_SIZE)
        } else {
            (MIN_IMAGE_SIZE, MIN_IMAGE_SIZE / self.aspect)
        };
        if width < min_width {
            width = min_width;
            height = min_height;
        }

        self.width = width;
        self.height = height;
        (width, height)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn size_label(&self) -> String {
        format!("{} × {}", self.width.round(), self.height.round())
    }

    /// Show the current size on the wrapped image and its label.
    pub fn preview(&self, tree: &mut RenderedTree) {
        let label = self.size_label();
        let width = self.width.round() as u32;
        let Some(wrapper) = tree.get_mut(self.wrapper) else {
            return;
        };
        if let Some(img) = wrapper.children.iter_mut().find(|c| c.is_tag("img")) {
            img.set_attr("style", width_style(width));
        }
        if let Some(size_label) = wrapper.find_class_mut(SIZE_LABEL_CLASS) {
            size_label.set_text_content(label);
            size_label.set_attr("style", "display: block;");
        }
        tree.adopt_new_nodes();
    }

    /// End the drag, hiding the label. Returns the final width in pixels.
    pub fn finish(self, tree: &mut RenderedTree) -> u32 {
        if let Some(size_label) = tree
            .get_mut(self.wrapper)
            .and_then(|w| w.find_class_mut(SIZE_LABEL_CLASS))
        {
            size_label.children.clear();
            size_label.set_attr("style", "display: none;");
        }
        self.width.round().max(1.0) as u32
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
