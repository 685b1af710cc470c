//! UTF-8 aware index helpers
//!
//! Cursor columns are counted in characters, while `String` is indexed in
//! bytes. Text like `中文` or `🎉` makes the two differ, so every conversion
//! between them goes through here.

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Largest char boundary `<= index`, clamped to the string length.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte offset of the `char_index`-th character, or `s.len()` past the end.
pub fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Number of characters before `byte_index` (rounded down to a boundary).
pub fn byte_index_to_char_index(s: &str, byte_index: usize) -> usize {
    let byte_index = floor_char_boundary(s, byte_index);
    s[..byte_index].chars().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Line Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Byte offsets at which each line starts. Always has at least one entry.
///
/// Lines are separated by `\n` only; a trailing newline opens an empty
/// final line, matching how a text editor counts lines.
pub fn line_start_offsets(s: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(s.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// Length of a line in characters, ignoring a trailing `\r`.
pub fn line_char_len(line: &str) -> usize {
    line.strip_suffix('\r').unwrap_or(line).chars().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
