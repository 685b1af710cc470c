//! Rendered Tree: an owned HTML-like node tree
//!
//! The renderer builds it from Markdown, the rich view edits it in place,
//! and the serializer turns it back into Markdown. Every node carries a
//! [`NodeId`] assigned by the owning [`RenderedTree`]; ids stay stable for
//! nodes that a structural edit does not touch, so editors can hold on to
//! them across edits of unrelated parts of the tree.

use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Node types
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a node within one tree.
///
/// `NodeId::UNASSIGNED` marks nodes that have not been adopted by a tree yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub const UNASSIGNED: NodeId = NodeId(0);

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    /// HTML passed through from the Markdown source untouched
    RawHtml(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

/// Tags that never have children or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

impl Node {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            kind: NodeKind::Element(Element {
                tag: tag.into(),
                attrs: Vec::new(),
            }),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            kind: NodeKind::Text(text.into()),
            children: Vec::new(),
        }
    }

    pub fn raw_html(html: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            kind: NodeKind::RawHtml(html.into()),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag().is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.as_element()?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Concatenated text of all descendant text nodes (DOM `textContent`).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::RawHtml(_) => {}
            NodeKind::Element(_) => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Pixel width from an inline `width: Npx` style, if present.
    pub fn style_width_px(&self) -> Option<u32> {
        self.style_px("width")
    }

    /// Pixel value of a `name: Npx` declaration in the inline style.
    pub fn style_px(&self, name: &str) -> Option<u32> {
        let style = self.attr("style")?;
        style.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            if key.trim() != name {
                return None;
            }
            let value = value.trim().strip_suffix("px")?.trim();
            value.parse::<f32>().ok().map(|v| v.round().max(0.0) as u32)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        if let NodeKind::Element(el) = &mut self.kind {
            let value = value.into();
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => el.attrs.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        if let NodeKind::Element(el) = &mut self.kind {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    /// Set or replace one inline style declaration, keeping the others.
    pub fn set_style(&mut self, name: &str, value: &str) {
        let mut decls: Vec<String> = self
            .attr("style")
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .filter(|d| d.split(':').next().map(str::trim) != Some(name))
            .map(str::to_string)
            .collect();
        decls.push(format!("{}: {}", name, value));
        self.set_attr("style", format!("{};", decls.join("; ")));
    }

    /// Replace all children with a single text node (DOM `textContent =`).
    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Node::text(text));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Traversal
    // ─────────────────────────────────────────────────────────────────────────

    /// Pre-order traversal including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.descendants().find(|n| n.id == id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// First descendant (or self) with the given tag.
    pub fn find_tag(&self, tag: &str) -> Option<&Node> {
        self.descendants().find(|n| n.is_tag(tag))
    }

    /// First descendant (or self) with the given class.
    pub fn find_class(&self, class: &str) -> Option<&Node> {
        self.descendants().find(|n| n.has_class(class))
    }

    pub fn find_class_mut(&mut self, class: &str) -> Option<&mut Node> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_class_mut(class))
    }

    /// Id of the node whose children contain `id`.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.descendants()
            .find(|n| n.children.iter().any(|c| c.id == id))
            .map(|n| n.id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTML output
    // ─────────────────────────────────────────────────────────────────────────

    pub fn write_html(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(t) => out.push_str(&escape_html(t)),
            NodeKind::RawHtml(html) => out.push_str(html),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (k, v) in &el.attrs {
                    let _ = write!(out, " {}=\"{}\"", k, escape_attr(v));
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in &self.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_html(value).replace('"', "&quot;")
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderedTree
// ─────────────────────────────────────────────────────────────────────────────

/// A tree of nodes with id allocation and an editability flag.
///
/// Cloning produces an independent copy with the same ids, which is what
/// the rich-view sync serializes from.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTree {
    root: Node,
    next_id: u64,
    /// Whether the rich view may edit the tree directly
    pub editable: bool,
}

impl Default for RenderedTree {
    fn default() -> Self {
        Self::new(Node::element("div").with_class("markdown-body"))
    }
}

impl RenderedTree {
    /// Adopt `root`, assigning ids to every node.
    pub fn new(mut root: Node) -> Self {
        let mut next_id = 1;
        assign_ids(&mut root, &mut next_id);
        Self {
            root,
            next_id,
            editable: false,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable access to the whole tree for direct rich-view editing.
    ///
    /// Nodes added this way keep `NodeId::UNASSIGNED` until
    /// [`RenderedTree::adopt_new_nodes`] runs.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Give ids to any nodes still carrying `NodeId::UNASSIGNED`.
    pub fn adopt_new_nodes(&mut self) {
        assign_ids(&mut self.root, &mut self.next_id);
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.root.parent_of(id)
    }

    pub fn descendants(&self) -> Descendants<'_> {
        self.root.descendants()
    }

    /// Replace the node `id` with `node`, returning the new node's id.
    pub fn replace(&mut self, id: NodeId, mut node: Node) -> Option<NodeId> {
        assign_ids(&mut node, &mut self.next_id);
        let new_id = node.id;
        let slot = self.root.find_mut(id)?;
        *slot = node;
        Some(new_id)
    }

    /// Detach and return the node `id`. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let parent_id = self.parent_of(id)?;
        let parent = self.root.find_mut(parent_id)?;
        let index = parent.children.iter().position(|c| c.id == id)?;
        Some(parent.children.remove(index))
    }

    /// Insert `node` as the `index`-th child of `parent` (clamped).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, mut node: Node) -> Option<NodeId> {
        assign_ids(&mut node, &mut self.next_id);
        let new_id = node.id;
        let parent = self.root.find_mut(parent)?;
        let index = index.min(parent.children.len());
        parent.children.insert(index, node);
        Some(new_id)
    }

    pub fn append_child(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        self.insert_child(parent, usize::MAX, node)
    }

    /// Replace the content of `id` with plain text.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        let Some(node) = self.root.find_mut(id) else {
            return false;
        };
        match &mut node.kind {
            NodeKind::Text(t) => *t = text.into(),
            NodeKind::RawHtml(_) => return false,
            NodeKind::Element(_) => node.set_text_content(text),
        }
        self.adopt_new_nodes();
        true
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.root.children {
            child.write_html(&mut out);
        }
        out
    }
}

fn assign_ids(node: &mut Node, next_id: &mut u64) {
    if node.id == NodeId::UNASSIGNED {
        node.id = NodeId(*next_id);
        *next_id += 1;
    }
    for child in &mut node.children {
        assign_ids(child, next_id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderedTree {
        RenderedTree::new(
            Node::element("div")
                .with_child(Node::element("h1").with_child(Node::text("Title")))
                .with_child(
                    Node::element("p")
                        .with_child(Node::text("Hello "))
                        .with_child(Node::element("strong").with_child(Node::text("world"))),
                ),
        )
    }

    #[test]
    fn test_ids_are_unique_and_assigned() {
        let tree = sample();
        let mut ids: Vec<NodeId> = tree.descendants().map(|n| n.id).collect();
        assert!(ids.iter().all(|id| *id != NodeId::UNASSIGNED));
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }

    #[test]
    fn test_text_content() {
        let tree = sample();
        assert_eq!(tree.root().text_content(), "TitleHello world");
    }

    #[test]
    fn test_replace_keeps_other_ids() {
        let mut tree = sample();
        let h1 = tree.root().find_tag("h1").unwrap().id;
        let p = tree.root().find_tag("p").unwrap().id;
        let new_id = tree
            .replace(h1, Node::element("h2").with_child(Node::text("Sub")))
            .unwrap();
        assert_ne!(new_id, h1);
        assert!(tree.get(p).is_some());
        assert_eq!(tree.get(new_id).unwrap().text_content(), "Sub");
    }

    #[test]
    fn test_remove_and_insert() {
        let mut tree = sample();
        let root = tree.root().id;
        let h1 = tree.root().find_tag("h1").unwrap().id;
        let removed = tree.remove(h1).unwrap();
        assert!(removed.is_tag("h1"));
        assert!(tree.get(h1).is_none());
        assert!(tree.remove(root).is_none());

        let hr = tree.insert_child(root, 0, Node::element("hr")).unwrap();
        assert_eq!(tree.root().children[0].id, hr);
    }

    #[test]
    fn test_set_text_on_element() {
        let mut tree = sample();
        let strong = tree.root().find_tag("strong").unwrap().id;
        assert!(tree.set_text(strong, "there"));
        assert_eq!(tree.get(strong).unwrap().text_content(), "there");
        assert!(tree.get(strong).unwrap().children[0].id != NodeId::UNASSIGNED);
    }

    #[test]
    fn test_style_helpers() {
        let mut img = Node::element("img").with_attr("style", "width: 240px; height: auto;");
        assert_eq!(img.style_width_px(), Some(240));
        img.set_style("width", "120px");
        assert_eq!(img.style_width_px(), Some(120));
        assert_eq!(img.attr("style"), Some("height: auto; width: 120px;"));
    }

    #[test]
    fn test_classes() {
        let mut node = Node::element("div").with_class("a");
        node.add_class("b");
        node.add_class("a");
        assert_eq!(node.attr("class"), Some("a b"));
        assert!(node.has_class("b"));
        assert!(!node.has_class("c"));
    }

    #[test]
    fn test_to_html_escapes() {
        let tree = RenderedTree::new(
            Node::element("div").with_child(
                Node::element("p")
                    .with_attr("title", "a \"q\"")
                    .with_child(Node::text("1 < 2 & 3"))
                    .with_child(Node::element("br")),
            ),
        );
        assert_eq!(
            tree.to_html(),
            "<p title=\"a &quot;q&quot;\">1 &lt; 2 &amp; 3<br></p>"
        );
    }

    #[test]
    fn test_parent_of() {
        let tree = sample();
        let strong = tree.root().find_tag("strong").unwrap().id;
        let p = tree.root().find_tag("p").unwrap().id;
        assert_eq!(tree.parent_of(strong), Some(p));
    }
}
