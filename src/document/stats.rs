//! Document statistics for the status bar
//!
//! Recomputed from scratch after every content change; documents are small
//! enough that a single pass is cheaper than tracking deltas.

// ─────────────────────────────────────────────────────────────────────────────
// TextStats
// ─────────────────────────────────────────────────────────────────────────────

/// Line, word and character counts of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    /// Lines separated by `\n`; an empty document has one line
    pub lines: usize,
    /// Runs of non-whitespace characters
    pub words: usize,
    /// Unicode scalar values, whitespace included
    pub characters: usize,
}

impl Default for TextStats {
    fn default() -> Self {
        Self {
            lines: 1,
            words: 0,
            characters: 0,
        }
    }
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let mut stats = Self::default();
        let mut in_word = false;

        for ch in text.chars() {
            stats.characters += 1;
            if ch == '\n' {
                stats.lines += 1;
            }
            if ch.is_whitespace() {
                in_word = false;
            } else if !in_word {
                in_word = true;
                stats.words += 1;
            }
        }

        stats
    }

    /// Compact form like "150 words | 892 chars | 25 lines".
    pub fn format_compact(&self) -> String {
        format!(
            "{} words | {} chars | {} lines",
            self.words, self.characters, self.lines
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
