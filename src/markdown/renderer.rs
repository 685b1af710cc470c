//! Markdown → Rendered Tree, using comrak
//!
//! comrak parses the Markdown; this module walks its AST and builds our own
//! node tree, applying two extensions on the way:
//!
//! - image sources carrying a `?w=N` suffix lose the suffix and gain an
//!   explicit width style, and relative sources are resolved against the
//!   document directory;
//! - fenced code blocks become editable containers (see [`code_block`]).
//!
//! Rendering never fails: anything comrak accepts produces a tree.
//!
//! [`code_block`]: crate::markdown::code_block

use crate::config::Settings;
use crate::document::{Node, RenderedTree};
use crate::markdown::code_block::build_code_block;
use crate::markdown::image_width::{resolve_image_src, split_width_suffix, width_style};
use crate::markdown::syntax::FALLBACK_THEME;
use comrak::nodes::{AstNode, ListType as ComrakListType, NodeValue, TableAlignment as ComrakTableAlignment};
use comrak::{parse_document, Arena, Options};
use log::debug;
use std::path::Path;
use std::time::Instant;

/// Class of the tree root.
pub const ROOT_CLASS: &str = "markdown-body";

/// 1-based source line a rendered table starts on.
pub const SOURCE_LINE_ATTR: &str = "data-source-line";

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Which Markdown extensions comrak should recognize.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// GitHub Flavored Markdown tables
    pub tables: bool,
    /// `~~text~~`
    pub strikethrough: bool,
    /// Bare URLs and emails become links
    pub autolink: bool,
    /// `- [ ]` and `- [x]`
    pub tasklist: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
        }
    }
}

impl MarkdownOptions {
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();
        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub markdown: MarkdownOptions,
    /// Single newlines inside a paragraph render as `<br>`
    pub hard_breaks: bool,
    /// syntect theme for code blocks
    pub code_theme: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            markdown: MarkdownOptions::default(),
            hard_breaks: true,
            code_theme: FALLBACK_THEME.to_string(),
        }
    }
}

impl RenderOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            markdown: MarkdownOptions::default(),
            hard_breaks: settings.hard_breaks,
            code_theme: settings.code_theme.clone(),
        }
    }
}

/// Table cell alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl From<ComrakTableAlignment> for TableAlignment {
    fn from(align: ComrakTableAlignment) -> Self {
        match align {
            ComrakTableAlignment::None => TableAlignment::None,
            ComrakTableAlignment::Left => TableAlignment::Left,
            ComrakTableAlignment::Center => TableAlignment::Center,
            ComrakTableAlignment::Right => TableAlignment::Right,
        }
    }
}

impl TableAlignment {
    /// Value of the `align` attribute on cells.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            TableAlignment::None => None,
            TableAlignment::Left => Some("left"),
            TableAlignment::Center => Some("center"),
            TableAlignment::Right => Some("right"),
        }
    }

    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("left") => TableAlignment::Left,
            Some("center") => TableAlignment::Center,
            Some("right") => TableAlignment::Right,
            _ => TableAlignment::None,
        }
    }

    /// Separator-row cell for this alignment.
    pub fn separator(self) -> &'static str {
        match self {
            TableAlignment::None => "---",
            TableAlignment::Left => ":---",
            TableAlignment::Center => ":---:",
            TableAlignment::Right => "---:",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

struct RenderContext<'p> {
    document_dir: Option<&'p Path>,
    options: &'p RenderOptions,
}

/// Render Markdown into a fresh, read-only tree.
pub fn render_markdown(
    markdown: &str,
    document_dir: Option<&Path>,
    options: &RenderOptions,
) -> RenderedTree {
    let started = Instant::now();
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &options.markdown.to_comrak_options());

    let ctx = RenderContext {
        document_dir,
        options,
    };
    let mut body = Node::element("div").with_class(ROOT_CLASS);
    convert_children(root, &ctx, false, &mut body.children);

    debug!(
        "Rendered {} bytes of Markdown in {:?}",
        markdown.len(),
        started.elapsed()
    );
    RenderedTree::new(body)
}

fn convert_children<'a>(
    node: &'a AstNode<'a>,
    ctx: &RenderContext<'_>,
    tight: bool,
    out: &mut Vec<Node>,
) {
    for child in node.children() {
        convert_node(child, ctx, tight, out);
    }
}

fn element_with_children<'a>(
    tag: &str,
    node: &'a AstNode<'a>,
    ctx: &RenderContext<'_>,
) -> Node {
    let mut el = Node::element(tag);
    convert_children(node, ctx, false, &mut el.children);
    el
}

/// Convert one comrak node, appending the result(s) to `out`.
///
/// `tight` is set for the direct children of a tight list item, whose
/// paragraphs are unwrapped the way HTML renderers do.
fn convert_node<'a>(
    node: &'a AstNode<'a>,
    ctx: &RenderContext<'_>,
    tight: bool,
    out: &mut Vec<Node>,
) {
    let value = node.data.borrow().value.clone();
    match value {
        NodeValue::Paragraph if tight => convert_children(node, ctx, false, out),
        NodeValue::Paragraph => out.push(element_with_children("p", node, ctx)),
        NodeValue::Heading(heading) => {
            let tag = format!("h{}", heading.level.clamp(1, 6));
            out.push(element_with_children(&tag, node, ctx));
        }
        NodeValue::BlockQuote => out.push(element_with_children("blockquote", node, ctx)),
        NodeValue::List(list) => {
            let mut el = match list.list_type {
                ComrakListType::Bullet => Node::element("ul"),
                ComrakListType::Ordered => {
                    let el = Node::element("ol");
                    if list.start != 1 {
                        el.with_attr("start", list.start.to_string())
                    } else {
                        el
                    }
                }
            };
            for item in node.children() {
                let mut li = Node::element("li");
                if let NodeValue::TaskItem(checked) = &item.data.borrow().value {
                    let mut checkbox = Node::element("input")
                        .with_attr("type", "checkbox")
                        .with_attr("disabled", "");
                    if checked.is_some_and(|c| c != ' ') {
                        checkbox.set_attr("checked", "");
                    }
                    li.children.push(checkbox);
                    li.children.push(Node::text(" "));
                }
                convert_children(item, ctx, list.tight, &mut li.children);
                el.children.push(li);
            }
            out.push(el);
        }
        // Items outside a list never occur; keep their content if they do.
        NodeValue::Item(_) | NodeValue::TaskItem(_) => {
            out.push(element_with_children("li", node, ctx))
        }
        NodeValue::CodeBlock(code) => {
            let lang = code.info.split_whitespace().next().unwrap_or("");
            out.push(build_code_block(
                lang,
                &code.literal,
                &ctx.options.code_theme,
            ));
        }
        NodeValue::HtmlBlock(html) => out.push(Node::raw_html(html.literal)),
        NodeValue::ThematicBreak => out.push(Node::element("hr")),
        NodeValue::Table(table) => out.push(convert_table(node, &table.alignments, ctx)),
        NodeValue::Text(text) => out.push(Node::text(text)),
        NodeValue::SoftBreak => {
            if ctx.options.hard_breaks {
                out.push(Node::element("br"));
            } else {
                out.push(Node::text("\n"));
            }
        }
        NodeValue::LineBreak => out.push(Node::element("br")),
        NodeValue::Code(code) => {
            out.push(Node::element("code").with_child(Node::text(code.literal)))
        }
        NodeValue::HtmlInline(html) => out.push(Node::raw_html(html)),
        NodeValue::Emph => out.push(element_with_children("em", node, ctx)),
        NodeValue::Strong => out.push(element_with_children("strong", node, ctx)),
        NodeValue::Strikethrough => out.push(element_with_children("del", node, ctx)),
        NodeValue::Link(link) => {
            let mut a = element_with_children("a", node, ctx).with_attr("href", link.url);
            if !link.title.is_empty() {
                a.set_attr("title", link.title);
            }
            out.push(a);
        }
        NodeValue::Image(link) => {
            let alt = plain_text(node);
            out.push(convert_image(&link.url, &link.title, &alt, ctx));
        }
        _ => convert_children(node, ctx, tight, out),
    }
}

fn convert_table<'a>(
    node: &'a AstNode<'a>,
    alignments: &[ComrakTableAlignment],
    ctx: &RenderContext<'_>,
) -> Node {
    let mut thead = Node::element("thead");
    let mut tbody = Node::element("tbody");

    for row in node.children() {
        let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
        let cell_tag = if header { "th" } else { "td" };
        let mut tr = Node::element("tr");
        for (col, cell) in row.children().enumerate() {
            let mut td = element_with_children(cell_tag, cell, ctx);
            let align = alignments
                .get(col)
                .map(|a| TableAlignment::from(*a))
                .unwrap_or_default();
            if let Some(value) = align.as_attr() {
                td.set_attr("align", value);
            }
            tr.children.push(td);
        }
        if header {
            thead.children.push(tr);
        } else {
            tbody.children.push(tr);
        }
    }

    let line = node.data.borrow().sourcepos.start.line;
    let mut table = Node::element("table")
        .with_attr(SOURCE_LINE_ATTR, line.to_string())
        .with_child(thead);
    if !tbody.children.is_empty() {
        table.children.push(tbody);
    }
    table
}

fn convert_image(url: &str, title: &str, alt: &str, ctx: &RenderContext<'_>) -> Node {
    let (path, width) = split_width_suffix(url);
    let mut img = Node::element("img")
        .with_attr("src", resolve_image_src(path, ctx.document_dir))
        .with_attr("alt", alt);
    if !title.is_empty() {
        img.set_attr("title", title);
    }
    if let Some(w) = width {
        img.set_attr("style", width_style(w));
    }
    img
}

/// Plain text of an inline subtree (used for image alt text).
fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => out.push_str(t),
            NodeValue::Code(c) => out.push_str(&c.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => {}
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
