//! Syntax highlighting for code blocks
//!
//! Loads syntect's bundled syntaxes and themes once, and turns highlighted
//! ranges into `span` nodes with inline color styles. The concatenated text
//! of the produced spans is always exactly the input code, which is what
//! lets the serializer ignore highlight markup entirely.

use crate::document::Node;
use log::{debug, warn};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Theme used when the configured one is not bundled with syntect
pub const FALLBACK_THEME: &str = "InspiredGitHub";

// ─────────────────────────────────────────────────────────────────────────────
// SyntaxHighlighter
// ─────────────────────────────────────────────────────────────────────────────

pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    /// Load the default syntax and theme sets. Expensive; use
    /// [`get_highlighter`] instead of constructing one per render.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
        }
    }

    /// Theme by name, falling back to [`FALLBACK_THEME`] and then to any
    /// bundled theme.
    pub fn theme(&self, name: &str) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(name)
            .or_else(|| self.theme_set.themes.get(FALLBACK_THEME))
            .or_else(|| self.theme_set.themes.values().next())
    }

    /// Whether `language` maps to a known syntax definition.
    pub fn supports(&self, language: &str) -> bool {
        self.find_syntax_for_language(language).is_some()
    }

    /// Highlight `code` into styled `span` nodes.
    ///
    /// Returns `None` when the language is unknown or highlighting fails
    /// part-way; callers then render the code as plain text.
    pub fn highlight_to_nodes(&self, code: &str, language: &str, theme_name: &str) -> Option<Vec<Node>> {
        let syntax = self.find_syntax_for_language(language)?;
        let theme = self.theme(theme_name)?;
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut nodes = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ranges = match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => ranges,
                Err(e) => {
                    warn!("Failed to highlight {} code: {}", language, e);
                    return None;
                }
            };
            for (style, text) in ranges {
                if text.is_empty() {
                    continue;
                }
                nodes.push(
                    Node::element("span")
                        .with_attr("style", style_to_css(style))
                        .with_child(Node::text(text)),
                );
            }
        }

        Some(nodes)
    }

    /// Find the syntax for a fence language tag.
    ///
    /// Tries common aliases mapped to file extensions, then the syntax
    /// name, then a case-insensitive name match.
    fn find_syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }

        let lang_lower = language.to_lowercase();
        let extension = match lang_lower.as_str() {
            "rust" | "rs" => "rs",
            "python" | "py" => "py",
            "javascript" | "js" => "js",
            "typescript" | "ts" => "ts",
            "c" => "c",
            "cpp" | "c++" | "cxx" => "cpp",
            "csharp" | "c#" | "cs" => "cs",
            "java" => "java",
            "go" | "golang" => "go",
            "ruby" | "rb" => "rb",
            "php" => "php",
            "swift" => "swift",
            "scala" => "scala",
            "html" | "htm" => "html",
            "css" => "css",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            "xml" => "xml",
            "markdown" | "md" => "md",
            "sql" => "sql",
            "shell" | "sh" | "bash" | "zsh" => "sh",
            "lua" => "lua",
            "perl" | "pl" => "pl",
            "r" => "r",
            "haskell" | "hs" => "hs",
            "erlang" | "erl" => "erl",
            "clojure" | "clj" => "clj",
            "diff" | "patch" => "diff",
            "makefile" | "make" => "Makefile",
            other => other,
        };

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }
        if let Some(syntax) = self.syntax_set.find_syntax_by_name(language) {
            return Some(syntax);
        }
        self.syntax_set
            .syntaxes()
            .iter()
            .find(|syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

/// Inline CSS for one highlighted range.
fn style_to_css(style: Style) -> String {
    let c = style.foreground;
    let mut css = format!("color: #{:02x}{:02x}{:02x};", c.r, c.g, c.b);
    if style.font_style.contains(FontStyle::BOLD) {
        css.push_str(" font-weight: bold;");
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        css.push_str(" font-style: italic;");
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        css.push_str(" text-decoration: underline;");
    }
    css
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Highlighter Instance
// ─────────────────────────────────────────────────────────────────────────────

static HIGHLIGHTER: OnceLock<SyntaxHighlighter> = OnceLock::new();

/// Get or create the global syntax highlighter.
pub fn get_highlighter() -> &'static SyntaxHighlighter {
    HIGHLIGHTER.get_or_init(SyntaxHighlighter::new)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
