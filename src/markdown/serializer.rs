//! Rendered Tree → Markdown
//!
//! A Markdown writer for the node vocabulary the renderer emits, plus what
//! a contentEditable surface tends to add (stray `div`s, `b`/`i`, bare
//! text at block level). Conventions: ATX headings, `-` bullets, `*`
//! emphasis, `**` strong, `~~` strikethrough, fenced code, `---` rules,
//! two-space hard breaks and GFM tables.
//!
//! Two rules are specific to this editor:
//!
//! - an `img` with an explicit pixel width is written as `![alt](src?w=N)`;
//! - a code block container is written as a fenced block using its
//!   `data-lang` and the raw text of its `code` element, so highlight
//!   markup never leaks into the source.
//!
//! Serialization never fails. Unexpected structure degrades to its text.

use crate::document::{Node, NodeKind};
use crate::markdown::code_block::{code_block_language, code_block_text, is_code_block};
use crate::markdown::image_width::with_width_query;
use crate::markdown::renderer::TableAlignment;

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol", "li", "pre", "table",
    "thead", "tbody", "tfoot", "tr", "hr", "div", "section", "article", "header", "footer",
];

#[derive(Debug, Clone, Copy, Default)]
struct InlineContext {
    /// Inside a table cell: no line breaks allowed, `|` must be escaped
    in_table: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize the children of `root` (the tree root or any container).
pub fn serialize_tree(root: &Node) -> String {
    serialize_nodes(&root.children)
}

/// Serialize a sequence of sibling nodes as Markdown blocks.
pub fn serialize_nodes(nodes: &[Node]) -> String {
    blocks_of(nodes).join("\n\n")
}

/// Serialize inline content as it would appear inside a table cell.
pub fn serialize_cell(nodes: &[Node]) -> String {
    let ctx = InlineContext { in_table: true };
    clean_cell(&inline_nodes(nodes, ctx))
}

/// One GFM table row: `| a | b |`. Empty cells are written as a single
/// space so the row keeps its shape.
pub fn format_table_row(cells: &[String]) -> String {
    let cells: Vec<&str> = cells
        .iter()
        .map(|c| if c.is_empty() { " " } else { c.as_str() })
        .collect();
    format!("| {} |", cells.join(" | "))
}

/// The separator row under a table header.
pub fn format_separator_row(alignments: &[TableAlignment]) -> String {
    let cells: Vec<String> = alignments.iter().map(|a| a.separator().to_string()).collect();
    format_table_row(&cells)
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────────────

fn is_block(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Element(el) => BLOCK_TAGS.contains(&el.tag.to_ascii_lowercase().as_str()),
        NodeKind::RawHtml(html) => html.ends_with('\n'),
        NodeKind::Text(_) => false,
    }
}

/// Serialize siblings into a list of blocks. Runs of inline siblings at
/// block level form an implicit paragraph.
fn blocks_of(nodes: &[Node]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut run: Vec<&Node> = Vec::new();

    for node in nodes {
        if is_block(node) {
            flush_paragraph(&mut run, &mut blocks);
            let block = block(node);
            if !block.trim().is_empty() {
                blocks.push(block);
            }
        } else {
            run.push(node);
        }
    }
    flush_paragraph(&mut run, &mut blocks);
    blocks
}

fn flush_paragraph(run: &mut Vec<&Node>, blocks: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    let text: String = run
        .drain(..)
        .map(|n| inline_node(n, InlineContext::default()))
        .collect();
    let text = trim_paragraph(&text);
    if !text.is_empty() {
        blocks.push(text);
    }
}

fn block(node: &Node) -> String {
    let tag = match &node.kind {
        NodeKind::RawHtml(html) => return html.trim_end_matches('\n').to_string(),
        NodeKind::Text(t) => return trim_paragraph(&escape_markdown(&collapse_whitespace(t))),
        NodeKind::Element(el) => el.tag.to_ascii_lowercase(),
    };

    if is_code_block(node) {
        return fenced_block(&code_block_language(node), &code_block_text(node));
    }

    match tag.as_str() {
        "p" => trim_paragraph(&inline_nodes(&node.children, InlineContext::default())),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let text = inline_nodes(&node.children, InlineContext::default());
            let text = text.replace("  \n", " ").replace('\n', " ");
            format!("{} {}", "#".repeat(level), text.trim())
        }
        "blockquote" => {
            let inner = blocks_of(&node.children).join("\n\n");
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        "ul" => list(node, false),
        "ol" => list(node, true),
        "li" => list_item("- ", node, false),
        "pre" => {
            let lang = node
                .find_tag("code")
                .and_then(|c| c.attr("class"))
                .or(node.attr("class"))
                .and_then(|classes| {
                    classes
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-"))
                })
                .unwrap_or("")
                .to_string();
            fenced_block(&lang, &node.text_content())
        }
        "table" => table(node),
        "hr" => "---".to_string(),
        // Containers (including table sections found out of place)
        _ => blocks_of(&node.children).join("\n\n"),
    }
}

fn fenced_block(lang: &str, code: &str) -> String {
    let code = code.strip_suffix('\n').unwrap_or(code);
    let longest = longest_run(code, '`');
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}{lang}\n{code}\n{fence}")
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

// ─────────────────────────────────────────────────────────────────────────────
// Lists
// ─────────────────────────────────────────────────────────────────────────────

fn list(node: &Node, ordered: bool) -> String {
    let start = node
        .attr("start")
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1);
    let items: Vec<&Node> = node.children.iter().filter(|c| c.is_tag("li")).collect();
    let loose = items
        .iter()
        .any(|li| li.children.iter().any(|c| c.is_tag("p")));

    let rendered: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, li)| {
            let marker = if ordered {
                format!("{}. ", start + i)
            } else {
                "- ".to_string()
            };
            list_item(&marker, li, loose)
        })
        .collect();

    rendered.join(if loose { "\n\n" } else { "\n" })
}

fn list_item(marker: &str, li: &Node, loose: bool) -> String {
    let checkbox = li
        .children
        .iter()
        .find(|c| c.is_tag("input") && c.attr("type") == Some("checkbox"));
    let task_prefix = match checkbox {
        Some(cb) if cb.attr("checked").is_some() => "[x] ",
        Some(_) => "[ ] ",
        None => "",
    };

    let children: Vec<Node> = li
        .children
        .iter()
        .filter(|c| !(c.is_tag("input") && c.attr("type") == Some("checkbox")))
        .cloned()
        .collect();
    let content = blocks_of(&children).join(if loose { "\n\n" } else { "\n" });

    let indent = " ".repeat(marker.len());
    let mut out = format!("{}{}", marker, task_prefix);
    for (i, line) in content.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out.trim_end().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

fn table_rows(node: &Node) -> Vec<&Node> {
    let mut rows = Vec::new();
    for child in &node.children {
        if child.is_tag("tr") {
            rows.push(child);
        } else if child.is_tag("thead") || child.is_tag("tbody") || child.is_tag("tfoot") {
            rows.extend(child.children.iter().filter(|r| r.is_tag("tr")));
        }
    }
    rows
}

fn cell_alignment(cell: &Node) -> TableAlignment {
    let from_attr = TableAlignment::from_attr(cell.attr("align"));
    if from_attr != TableAlignment::None {
        return from_attr;
    }
    let style_align = cell.attr("style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            (k.trim() == "text-align").then(|| v.trim().to_string())
        })
    });
    TableAlignment::from_attr(style_align.as_deref())
}

fn table(node: &Node) -> String {
    let rows = table_rows(node);
    let Some(header) = rows.first() else {
        return String::new();
    };

    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.children
                .iter()
                .filter(|c| c.is_tag("th") || c.is_tag("td"))
                .map(|c| serialize_cell(&c.children))
                .collect()
        })
        .collect();
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let alignments: Vec<TableAlignment> = {
        let cells: Vec<&Node> = header
            .children
            .iter()
            .filter(|c| c.is_tag("th") || c.is_tag("td"))
            .collect();
        (0..columns)
            .map(|i| cells.get(i).map(|c| cell_alignment(c)).unwrap_or_default())
            .collect()
    };

    let mut lines = Vec::with_capacity(grid.len() + 1);
    for (i, row) in grid.into_iter().enumerate() {
        let mut row = row;
        row.resize(columns, String::new());
        lines.push(format_table_row(&row));
        if i == 0 {
            lines.push(format_separator_row(&alignments));
        }
    }
    lines.join("\n")
}

fn clean_cell(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline content
// ─────────────────────────────────────────────────────────────────────────────

fn inline_nodes(nodes: &[Node], ctx: InlineContext) -> String {
    nodes.iter().map(|n| inline_node(n, ctx)).collect()
}

fn inline_node(node: &Node, ctx: InlineContext) -> String {
    let el = match &node.kind {
        NodeKind::Text(t) => {
            let escaped = escape_markdown(&collapse_whitespace(t));
            return if ctx.in_table {
                escaped.replace('|', "\\|")
            } else {
                escaped
            };
        }
        NodeKind::RawHtml(html) => return html.clone(),
        NodeKind::Element(el) => el,
    };

    if is_code_block(node) {
        // A code block pasted into inline context keeps its text.
        return code_span(&code_block_text(node));
    }

    match el.tag.to_ascii_lowercase().as_str() {
        "em" | "i" => wrap_delimited("*", &inline_nodes(&node.children, ctx)),
        "strong" | "b" => wrap_delimited("**", &inline_nodes(&node.children, ctx)),
        "del" | "s" | "strike" => wrap_delimited("~~", &inline_nodes(&node.children, ctx)),
        "code" => {
            let span = code_span(&node.text_content());
            if ctx.in_table {
                span.replace('|', "\\|")
            } else {
                span
            }
        }
        "br" => {
            if ctx.in_table {
                "<br>".to_string()
            } else {
                "  \n".to_string()
            }
        }
        "a" => link(node, ctx),
        "img" => image(node),
        "input" => String::new(),
        _ => inline_nodes(&node.children, ctx),
    }
}

/// Put delimiters around the non-whitespace core of `inner`, keeping
/// surrounding whitespace outside so the emphasis stays valid.
fn wrap_delimited(delim: &str, inner: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    format!("{lead}{delim}{trimmed}{delim}{trail}")
}

fn code_span(code: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`') + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn link(node: &Node, ctx: InlineContext) -> String {
    let text = inline_nodes(&node.children, ctx);
    let href = node.attr("href").unwrap_or("");
    if href.is_empty() {
        return text;
    }
    format!("[{}]({}{})", text, link_destination(href), title_suffix(node))
}

fn image(node: &Node) -> String {
    let src = node.attr("src").unwrap_or("");
    if src.is_empty() {
        return String::new();
    }
    let alt = node
        .attr("alt")
        .unwrap_or("")
        .replace('\n', " ")
        .replace('[', "\\[")
        .replace(']', "\\]");
    let src = match node.style_width_px() {
        Some(width) if width > 0 => with_width_query(src, width),
        _ => src.to_string(),
    };
    format!("![{}]({}{})", alt, link_destination(&src), title_suffix(node))
}

/// A link or image destination, in angle brackets when it needs them.
pub(crate) fn link_destination(url: &str) -> String {
    if url.contains(' ') || url.contains('(') || url.contains(')') {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

fn title_suffix(node: &Node) -> String {
    match node.attr("title") {
        Some(t) if !t.is_empty() => format!(" \"{}\"", t.replace('"', "\\\"")),
        _ => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Collapse whitespace runs to a single space, like HTML layout does.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Trim a paragraph while keeping hard breaks inside it intact.
fn trim_paragraph(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_start())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Escape characters that would otherwise turn text into Markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '*' | '`' | '[' | ']' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '<' if chars
                .peek()
                .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')) =>
            {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    escape_line_start(&out)
}

/// Escapes that only matter at the start of a text run.
fn escape_line_start(text: &str) -> String {
    let hashes = text.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && text[hashes..].starts_with(' ') {
        return format!("\\{}", text);
    }
    if text.starts_with('-') || text.starts_with("+ ") || text.starts_with('>') {
        return format!("\\{}", text);
    }
    if text.starts_with('=') || text.starts_with("~~~") {
        return format!("\\{}", text);
    }
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && text[digits..].starts_with(". ") {
        return format!("{}\\{}", &text[..digits], &text[digits..]);
    }
    text.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
