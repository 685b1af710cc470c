//! Markdown Formatting Operations
//!
//! Toolbar and shortcut commands for source mode. Each command takes the
//! full text and a selection and returns the new text plus the selection
//! to show afterwards; the caller applies it as one ordinary source edit.
//!
//! Selections are `(start, end)` character indices. `start == end` is a
//! bare cursor.
//!
//! # Supported Formatting Commands
//! - **Inline**: Bold, Italic, Strikethrough, Inline Code
//! - **Line prefixes**: Headings (1-6), Paragraph, Bullet/Numbered/Task
//!   list, Blockquote
//! - **Inserts**: Link, Image, Code Block, Table, Horizontal Rule

use crate::string_utils::{byte_index_to_char_index, char_index_to_byte_index};
use regex::Regex;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Placeholders and templates
// ─────────────────────────────────────────────────────────────────────────────

const TEXT_PLACEHOLDER: &str = "text";
const LINK_TEXT_PLACEHOLDER: &str = "link text";
const LINK_URL_PLACEHOLDER: &str = "url";
const IMAGE_ALT_PLACEHOLDER: &str = "image description";
const IMAGE_URL_PLACEHOLDER: &str = "image-url";
const CODE_PLACEHOLDER: &str = "code";

pub const TABLE_TEMPLATE: &str =
    "\n| Column 1 | Column 2 | Column 3 |\n| --- | --- | --- |\n| Content | Content | Content |\n";
pub const HORIZONTAL_RULE: &str = "\n---\n";

/// Prefixes removed by [`MarkdownFormatCommand::Paragraph`].
fn block_prefix_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6}\s+|- \[[ x]\]\s+|- |\* |\d+\.\s+|> +)").ok())
        .as_ref()
}

fn heading_prefix_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s").ok()).as_ref()
}

// ─────────────────────────────────────────────────────────────────────────────
// Format Command Enum
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown formatting commands that can be applied to source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownFormatCommand {
    /// Bold text (**text**)
    Bold,
    /// Italic text (*text*)
    Italic,
    /// Strikethrough (~~text~~)
    Strikethrough,
    /// Inline code (`code`)
    InlineCode,
    /// Heading level 1-6
    Heading(u8),
    /// Strip heading/list/quote prefixes from the selected lines
    Paragraph,
    BulletList,
    NumberedList,
    TaskList,
    Blockquote,
    /// Link ([text](url))
    Link,
    /// Image (![alt](url))
    Image,
    /// Fenced code block
    CodeBlock,
    /// Three-column table template
    Table,
    HorizontalRule,
}

impl MarkdownFormatCommand {
    /// Keyboard shortcut label, if the command has one.
    pub fn shortcut_label(&self) -> Option<&'static str> {
        match self {
            Self::Bold => Some("Ctrl+B"),
            Self::Italic => Some("Ctrl+I"),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Bold => "Bold".into(),
            Self::Italic => "Italic".into(),
            Self::Strikethrough => "Strikethrough".into(),
            Self::InlineCode => "Inline Code".into(),
            Self::Heading(n) => format!("Heading {}", n),
            Self::Paragraph => "Paragraph".into(),
            Self::BulletList => "Bullet List".into(),
            Self::NumberedList => "Numbered List".into(),
            Self::TaskList => "Task List".into(),
            Self::Blockquote => "Blockquote".into(),
            Self::Link => "Insert Link".into(),
            Self::Image => "Insert Image".into(),
            Self::CodeBlock => "Code Block".into(),
            Self::Table => "Insert Table".into(),
            Self::HorizontalRule => "Horizontal Rule".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Format Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of applying a formatting command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResult {
    /// The new text after formatting
    pub text: String,
    /// Selection to show afterwards, in character indices
    pub selection: (usize, usize),
    /// Whether formatting was added (false when it was toggled off)
    pub applied: bool,
}

impl FormatResult {
    fn with_cursor(text: String, cursor: usize) -> Self {
        Self {
            text,
            selection: (cursor, cursor),
            applied: true,
        }
    }

    fn with_selection(text: String, start: usize, end: usize) -> Self {
        Self {
            text,
            selection: (start, end),
            applied: true,
        }
    }

    fn toggled_off(mut self) -> Self {
        self.applied = false;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Apply `command` to `text` with the given character selection.
pub fn apply_format(
    text: &str,
    selection: (usize, usize),
    command: MarkdownFormatCommand,
) -> FormatResult {
    let sel = ByteSelection::new(text, selection);
    match command {
        MarkdownFormatCommand::Bold => wrap_selection(text, sel, "**", "**"),
        MarkdownFormatCommand::Italic => wrap_selection(text, sel, "*", "*"),
        MarkdownFormatCommand::Strikethrough => wrap_selection(text, sel, "~~", "~~"),
        MarkdownFormatCommand::InlineCode => wrap_selection(text, sel, "`", "`"),
        MarkdownFormatCommand::Heading(level) => {
            let level = level.clamp(1, 6) as usize;
            insert_line_prefix(text, sel, &format!("{} ", "#".repeat(level)))
        }
        MarkdownFormatCommand::Paragraph => remove_line_prefixes(text, sel),
        MarkdownFormatCommand::BulletList => insert_line_prefix(text, sel, "- "),
        MarkdownFormatCommand::NumberedList => {
            let number = previous_list_number(text, sel.start).map_or(1, |n| n + 1);
            insert_line_prefix(text, sel, &format!("{}. ", number))
        }
        MarkdownFormatCommand::TaskList => insert_line_prefix(text, sel, "- [ ] "),
        MarkdownFormatCommand::Blockquote => insert_line_prefix(text, sel, "> "),
        MarkdownFormatCommand::Link => insert_link(text, sel, false),
        MarkdownFormatCommand::Image => insert_link(text, sel, true),
        MarkdownFormatCommand::CodeBlock => insert_code_block(text, sel),
        MarkdownFormatCommand::Table => insert_at_cursor(text, sel, TABLE_TEMPLATE),
        MarkdownFormatCommand::HorizontalRule => insert_at_cursor(text, sel, HORIZONTAL_RULE),
    }
}

/// Ordered selection converted to byte offsets on char boundaries.
#[derive(Debug, Clone, Copy)]
struct ByteSelection {
    start: usize,
    end: usize,
}

impl ByteSelection {
    fn new(text: &str, (a, b): (usize, usize)) -> Self {
        let (a, b) = (a.min(b), a.max(b));
        Self {
            start: char_index_to_byte_index(text, a),
            end: char_index_to_byte_index(text, b),
        }
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn chars(text: &str, byte: usize) -> usize {
    byte_index_to_char_index(text, byte)
}

fn line_start(text: &str, byte: usize) -> usize {
    text[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn line_end(text: &str, byte: usize) -> usize {
    text[byte..]
        .find('\n')
        .map(|i| byte + i)
        .unwrap_or(text.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline formatting
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap the selection in delimiters, or unwrap it when it (or the text
/// right around it) already carries them. A bare cursor inserts a
/// selected placeholder.
fn wrap_selection(text: &str, sel: ByteSelection, prefix: &str, suffix: &str) -> FormatResult {
    let selected = &text[sel.start..sel.end];

    if !sel.is_empty()
        && selected.len() >= prefix.len() + suffix.len()
        && selected.starts_with(prefix)
        && selected.ends_with(suffix)
    {
        let inner = &selected[prefix.len()..selected.len() - suffix.len()];
        let new_text = format!("{}{}{}", &text[..sel.start], inner, &text[sel.end..]);
        let start = chars(&new_text, sel.start);
        return FormatResult::with_selection(new_text, start, start + inner.chars().count())
            .toggled_off();
    }

    if !sel.is_empty()
        && text[..sel.start].ends_with(prefix)
        && text[sel.end..].starts_with(suffix)
    {
        let before = sel.start - prefix.len();
        let after = sel.end + suffix.len();
        let new_text = format!("{}{}{}", &text[..before], selected, &text[after..]);
        let start = chars(&new_text, before);
        return FormatResult::with_selection(
            new_text,
            start,
            start + selected.chars().count(),
        )
        .toggled_off();
    }

    let inner = if sel.is_empty() { TEXT_PLACEHOLDER } else { selected };
    let new_text = format!(
        "{}{}{}{}{}",
        &text[..sel.start],
        prefix,
        inner,
        suffix,
        &text[sel.end..]
    );
    let inner_start = chars(&new_text, sel.start + prefix.len());
    let inner_end = inner_start + inner.chars().count();
    if sel.is_empty() {
        FormatResult::with_selection(new_text, inner_start, inner_end)
    } else {
        let end = inner_end + suffix.chars().count();
        FormatResult::with_cursor(new_text, end)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Line prefixes
// ─────────────────────────────────────────────────────────────────────────────

/// Insert `prefix` at the start of the cursor's line. A heading prefix
/// replaces an existing heading marker instead of stacking on it.
fn insert_line_prefix(text: &str, sel: ByteSelection, prefix: &str) -> FormatResult {
    let start = line_start(text, sel.start);
    let end = line_end(text, start);
    let line = &text[start..end];

    let replaced = if prefix.starts_with('#') {
        heading_prefix_regex()
            .and_then(|re| re.find(line))
            .map_or(0, |m| m.end())
    } else {
        0
    };

    let new_text = format!("{}{}{}", &text[..start], prefix, &text[start + replaced..]);
    let cursor_byte = (sel.start + prefix.len())
        .saturating_sub(replaced)
        .max(start + prefix.len());
    let cursor = chars(&new_text, cursor_byte);
    FormatResult::with_cursor(new_text, cursor)
}

/// Strip heading, list, task and quote prefixes from every selected line.
fn remove_line_prefixes(text: &str, sel: ByteSelection) -> FormatResult {
    let first = line_start(text, sel.start);
    let last = line_end(text, sel.end);
    let Some(re) = block_prefix_regex() else {
        return FormatResult::with_cursor(text.to_string(), chars(text, sel.start));
    };

    let stripped: Vec<&str> = text[first..last]
        .split('\n')
        .map(|line| match re.find(line) {
            Some(m) => &line[m.end()..],
            None => line,
        })
        .collect();
    let block = stripped.join("\n");
    let new_text = format!("{}{}{}", &text[..first], block, &text[last..]);
    let start = chars(&new_text, first);
    FormatResult::with_selection(new_text, start, start + block.chars().count())
}

/// Number of the ordered-list item on the line above the cursor.
fn previous_list_number(text: &str, byte: usize) -> Option<u64> {
    let start = line_start(text, byte);
    if start == 0 {
        return None;
    }
    let prev_start = line_start(text, start - 1);
    let prev = &text[prev_start..start - 1];
    let digits: String = prev.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || !prev[digits.len()..].starts_with(". ") {
        return None;
    }
    digits.parse().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Inserts
// ─────────────────────────────────────────────────────────────────────────────

/// `[text](url)` or `![alt](image-url)`, selecting the URL placeholder.
fn insert_link(text: &str, sel: ByteSelection, is_image: bool) -> FormatResult {
    let selected = &text[sel.start..sel.end];
    let (open, label_placeholder, url) = if is_image {
        ("![", IMAGE_ALT_PLACEHOLDER, IMAGE_URL_PLACEHOLDER)
    } else {
        ("[", LINK_TEXT_PLACEHOLDER, LINK_URL_PLACEHOLDER)
    };
    let label = if selected.is_empty() {
        label_placeholder
    } else {
        selected
    };
    let inserted = format!("{}{}]({})", open, label, url);
    let new_text = format!("{}{}{}", &text[..sel.start], inserted, &text[sel.end..]);

    let url_byte = sel.start + open.len() + label.len() + 2;
    let url_start = chars(&new_text, url_byte);
    FormatResult::with_selection(new_text, url_start, url_start + url.chars().count())
}

fn insert_code_block(text: &str, sel: ByteSelection) -> FormatResult {
    let selected = &text[sel.start..sel.end];
    let code = if selected.is_empty() {
        CODE_PLACEHOLDER
    } else {
        selected
    };
    let inserted = format!("\n```\n{}\n```\n", code);
    let new_text = format!("{}{}{}", &text[..sel.start], inserted, &text[sel.end..]);
    let cursor = chars(&new_text, sel.start + inserted.len());
    FormatResult::with_cursor(new_text, cursor)
}

fn insert_at_cursor(text: &str, sel: ByteSelection, inserted: &str) -> FormatResult {
    let new_text = format!("{}{}{}", &text[..sel.start], inserted, &text[sel.end..]);
    let cursor = chars(&new_text, sel.start + inserted.len());
    FormatResult::with_cursor(new_text, cursor)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use MarkdownFormatCommand::*;

    fn selected(result: &FormatResult) -> String {
        let (a, b) = result.selection;
        result.text.chars().skip(a).take(b - a).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_bold_wraps_selection() {
        let result = apply_format("Hello world", (0, 5), Bold);
        assert_eq!(result.text, "**Hello** world");
        assert_eq!(result.selection, (9, 9));
        assert!(result.applied);
    }

    #[test]
    fn test_bold_without_selection_inserts_placeholder() {
        let result = apply_format("ab", (1, 1), Bold);
        assert_eq!(result.text, "a**text**b");
        assert_eq!(selected(&result), "text");
    }

    #[test]
    fn test_toggle_off_selected_delimiters() {
        let result = apply_format("**Hello** world", (0, 9), Bold);
        assert_eq!(result.text, "Hello world");
        assert!(!result.applied);
        assert_eq!(selected(&result), "Hello");
    }

    #[test]
    fn test_toggle_off_surrounding_delimiters() {
        let result = apply_format("a ~~gone~~ b", (4, 8), Strikethrough);
        assert_eq!(result.text, "a gone b");
        assert_eq!(selected(&result), "gone");
    }

    #[test]
    fn test_inline_code_with_multibyte_text() {
        let result = apply_format("中文 ok", (0, 2), InlineCode);
        assert_eq!(result.text, "`中文` ok");
        assert_eq!(result.selection, (4, 4));
    }

    #[test]
    fn test_reversed_selection_is_normalized() {
        let result = apply_format("Hello", (5, 0), Italic);
        assert_eq!(result.text, "*Hello*");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Line prefixes
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_heading_inserts_prefix() {
        let result = apply_format("one\ntwo", (5, 5), Heading(2));
        assert_eq!(result.text, "one\n## two");
        assert_eq!(result.selection, (8, 8));
    }

    #[test]
    fn test_heading_replaces_existing_heading() {
        let result = apply_format("### Title", (5, 5), Heading(1));
        assert_eq!(result.text, "# Title");
    }

    #[test]
    fn test_heading_level_is_clamped() {
        assert_eq!(apply_format("x", (0, 0), Heading(9)).text, "###### x");
    }

    #[test]
    fn test_list_prefixes() {
        assert_eq!(apply_format("item", (0, 0), BulletList).text, "- item");
        assert_eq!(apply_format("item", (0, 0), TaskList).text, "- [ ] item");
        assert_eq!(apply_format("item", (0, 0), Blockquote).text, "> item");
    }

    #[test]
    fn test_numbered_list_continues_previous_number() {
        let result = apply_format("3. three\nfour", (10, 10), NumberedList);
        assert_eq!(result.text, "3. three\n4. four");
        assert_eq!(apply_format("plain\nx", (6, 6), NumberedList).text, "plain\n1. x");
    }

    #[test]
    fn test_paragraph_strips_prefixes_over_selection() {
        let text = "# Title\n- [x] done\n> quote\n12. item\nplain";
        let result = apply_format(text, (0, text.chars().count()), Paragraph);
        assert_eq!(result.text, "Title\ndone\nquote\nitem\nplain");
    }

    #[test]
    fn test_paragraph_only_touches_selected_lines() {
        let result = apply_format("- a\n- b\n- c", (4, 4), Paragraph);
        assert_eq!(result.text, "- a\nb\n- c");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inserts
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_link_selects_url() {
        let result = apply_format("see docs", (4, 8), Link);
        assert_eq!(result.text, "see [docs](url)");
        assert_eq!(selected(&result), "url");
    }

    #[test]
    fn test_image_placeholder() {
        let result = apply_format("", (0, 0), Image);
        assert_eq!(result.text, "![image description](image-url)");
        assert_eq!(selected(&result), "image-url");
    }

    #[test]
    fn test_code_block_wraps_selection() {
        let result = apply_format("x = 1", (0, 5), CodeBlock);
        assert_eq!(result.text, "\n```\nx = 1\n```\n");
    }

    #[test]
    fn test_table_and_rule_templates() {
        let result = apply_format("a", (1, 1), Table);
        assert_eq!(result.text, format!("a{}", TABLE_TEMPLATE));
        assert_eq!(result.selection.0, result.text.chars().count());
        assert_eq!(apply_format("a", (1, 1), HorizontalRule).text, "a\n---\n");
    }

    #[test]
    fn test_labels() {
        assert_eq!(Heading(3).label(), "Heading 3");
        assert_eq!(Bold.shortcut_label(), Some("Ctrl+B"));
        assert_eq!(Table.shortcut_label(), None);
    }
}
