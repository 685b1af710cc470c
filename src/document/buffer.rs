//! Source Buffer: the canonical Markdown text
//!
//! A `String`-backed buffer with a line/column cursor, an optional
//! selection anchor and snapshot-based undo. Every content change bumps
//! `version`, which lets callers detect whether a write actually happened.

use crate::string_utils::{
    byte_index_to_char_index, char_index_to_byte_index, line_char_len, line_start_offsets,
};
use std::cmp::Ordering;

/// Maximum number of undo snapshots kept per buffer.
const MAX_UNDO: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Positions
// ─────────────────────────────────────────────────────────────────────────────

/// A cursor position. `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl PartialOrd for TextPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TextPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then(self.column.cmp(&other.column))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SourceBuffer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SourceBuffer {
    text: String,
    cursor: TextPosition,
    /// Other end of the selection, if any text is selected
    anchor: Option<TextPosition>,
    version: u64,
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
}

impl SourceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Incremented on every content change, including undo/redo.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of lines; an empty buffer has one empty line.
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.text.split('\n').nth(index)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cursor and selection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn cursor(&self) -> TextPosition {
        self.cursor
    }

    /// Move the cursor, clamping it into the document. Clears the selection.
    pub fn set_cursor(&mut self, pos: TextPosition) {
        self.cursor = self.clamp(pos);
        self.anchor = None;
    }

    /// Select from `anchor` to `cursor`.
    pub fn set_selection(&mut self, anchor: TextPosition, cursor: TextPosition) {
        self.anchor = Some(self.clamp(anchor));
        self.cursor = self.clamp(cursor);
    }

    /// Ordered selection bounds, or `None` when nothing is selected.
    pub fn selection(&self) -> Option<(TextPosition, TextPosition)> {
        let anchor = self.anchor?;
        if anchor == self.cursor {
            return None;
        }
        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    pub fn selected_text(&self) -> Option<&str> {
        let (start, end) = self.selection()?;
        Some(&self.text[self.offset_of(start)..self.offset_of(end)])
    }

    /// Clamp a position to an existing line and column.
    pub fn clamp(&self, pos: TextPosition) -> TextPosition {
        let last_line = self.line_count() - 1;
        let line = pos.line.min(last_line);
        let len = self.line(line).map(line_char_len).unwrap_or(0);
        TextPosition::new(line, pos.column.min(len))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Offset conversion
    // ─────────────────────────────────────────────────────────────────────────

    /// Byte offset of a (clamped) position.
    pub fn offset_of(&self, pos: TextPosition) -> usize {
        let pos = self.clamp(pos);
        let starts = line_start_offsets(&self.text);
        let start = starts[pos.line];
        let line = self.line(pos.line).unwrap_or("");
        start + char_index_to_byte_index(line, pos.column)
    }

    /// Position of a byte offset (rounded down to a char boundary).
    pub fn position_of(&self, offset: usize) -> TextPosition {
        let offset = offset.min(self.text.len());
        let starts = line_start_offsets(&self.text);
        let line = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = byte_index_to_char_index(&self.text[starts[line]..], offset - starts[line]);
        TextPosition::new(line, column)
    }

    /// Character offset of a position from the start of the document.
    pub fn char_offset_of(&self, pos: TextPosition) -> usize {
        byte_index_to_char_index(&self.text, self.offset_of(pos))
    }

    /// Position of a character offset from the start of the document.
    pub fn position_of_char(&self, char_offset: usize) -> TextPosition {
        self.position_of(char_index_to_byte_index(&self.text, char_offset))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the text between two positions. The cursor lands after the
    /// inserted text.
    pub fn replace_range(&mut self, start: TextPosition, end: TextPosition, text: &str) {
        let (start, end) = (start.min(end), start.max(end));
        let from = self.offset_of(start);
        let to = self.offset_of(end);
        if &self.text[from..to] == text {
            return;
        }
        self.push_undo();
        self.text.replace_range(from..to, text);
        self.version += 1;
        self.anchor = None;
        self.cursor = self.position_of(from + text.len());
    }

    /// Insert at the cursor, replacing the selection if there is one.
    pub fn insert_at_cursor(&mut self, text: &str) {
        let (start, end) = self.selection().unwrap_or((self.cursor, self.cursor));
        if text.is_empty() && start == end {
            return;
        }
        self.push_undo();
        let from = self.offset_of(start);
        let to = self.offset_of(end);
        self.text.replace_range(from..to, text);
        self.version += 1;
        self.anchor = None;
        self.cursor = self.position_of(from + text.len());
    }

    /// Replace whole lines `first..last` (exclusive) with `replacement`.
    /// Returns whether the text changed.
    ///
    /// The cursor keeps its line/column where those still exist.
    pub fn replace_lines(&mut self, first: usize, last: usize, replacement: &[String]) -> bool {
        let lines: Vec<&str> = self.text.split('\n').collect();
        if first >= last || last > lines.len() {
            return false;
        }
        let mut rebuilt: Vec<String> = Vec::with_capacity(lines.len());
        rebuilt.extend(lines[..first].iter().map(|l| l.to_string()));
        rebuilt.extend(replacement.iter().cloned());
        rebuilt.extend(lines[last..].iter().map(|l| l.to_string()));
        self.set_text(rebuilt.join("\n"))
    }

    /// Replace the entire content, keeping the cursor where feasible.
    ///
    /// Returns `false` (and leaves the version alone) when the text is
    /// unchanged.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.push_undo();
        self.text = text;
        self.version += 1;
        self.anchor = None;
        self.cursor = self.clamp(self.cursor);
        true
    }

    /// Replace content without recording undo history (opening a file).
    pub fn reset(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.version += 1;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.anchor = None;
        self.cursor = TextPosition::default();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Undo / Redo
    // ─────────────────────────────────────────────────────────────────────────

    fn push_undo(&mut self) {
        self.undo_stack.push(self.text.clone());
        if self.undo_stack.len() > MAX_UNDO {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.text, previous);
                self.redo_stack.push(current);
                self.version += 1;
                self.anchor = None;
                self.cursor = self.clamp(self.cursor);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.text, next);
                self.undo_stack.push(current);
                self.version += 1;
                self.anchor = None;
                self.cursor = self.clamp(self.cursor);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
