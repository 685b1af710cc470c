//! The `?w=<pixels>` image width convention
//!
//! Markdown has no syntax for image size, so a width is stored as a query
//! suffix on the image URL: `![alt](pic.png?w=240)`. Tools unaware of the
//! convention simply see a query string. This module owns every place the
//! suffix is parsed, stripped, resolved or rewritten.

use crate::document::Node;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::OnceLock;

const FILE_SCHEME: &str = "file://";

fn width_suffix_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\?w=(\d+)$").ok()).as_ref()
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Split `path?w=N` into `(path, Some(N))`. Anything else is returned whole.
pub fn split_width_suffix(url: &str) -> (&str, Option<u32>) {
    match width_suffix_regex().and_then(|re| re.captures(url)) {
        Some(caps) => {
            let width = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            match (caps.get(1), width) {
                (Some(path), Some(w)) if w > 0 => (path.as_str(), Some(w)),
                _ => (url, None),
            }
        }
        None => (url, None),
    }
}

/// Inline style used for an explicit width.
pub fn width_style(width: u32) -> String {
    format!("width: {}px; height: auto;", width)
}

/// Whether `src` should be resolved against the document directory.
pub fn is_relative_src(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    !(src.is_empty()
        || src.starts_with('/')
        || src.starts_with('#')
        || lower.starts_with("data:")
        || has_scheme(src)
        || is_windows_absolute(src))
}

fn has_scheme(src: &str) -> bool {
    match src.find(':') {
        Some(i) if i > 1 => src[..i]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

fn is_windows_absolute(src: &str) -> bool {
    let bytes = src.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn dir_prefix(dir: &Path) -> String {
    dir.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_string()
}

/// Resolve a relative image source to a `file://` URL rooted at the
/// document directory. Without a directory, `src` is left untouched.
pub fn resolve_image_src(src: &str, document_dir: Option<&Path>) -> String {
    match document_dir {
        Some(dir) if is_relative_src(src) => {
            format!("{}{}/{}", FILE_SCHEME, dir_prefix(dir), src)
        }
        _ => src.to_string(),
    }
}

/// The path an image is written as in Markdown: `file://`, the document
/// directory prefix and any query are stripped.
pub fn source_path_of(src: &str, document_dir: Option<&Path>) -> String {
    let mut path = src.strip_prefix(FILE_SCHEME).unwrap_or(src);
    let prefix;
    if let Some(dir) = document_dir {
        prefix = format!("{}/", dir_prefix(dir));
        path = path.strip_prefix(prefix.as_str()).unwrap_or(path);
    }
    path.split('?').next().unwrap_or(path).to_string()
}

/// Set the width query on an image URL, replacing any existing one.
/// Used by the serializer; `file://` is stripped first.
pub fn with_width_query(src: &str, width: u32) -> String {
    let src = src.strip_prefix(FILE_SCHEME).unwrap_or(src);
    let (base, _) = split_width_suffix(src);
    format!("{}?w={}", base, width)
}

// ─────────────────────────────────────────────────────────────────────────────
// Source rewriting
// ─────────────────────────────────────────────────────────────────────────────

// Destinations with spaces are written in angle brackets: `![a](<my pic.png>)`.
fn occurrence_regex(path: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(
        r"(!\[[^\]]*\]\(<?)({})(?:\?w=\d+)?(>?\))",
        regex::escape(path)
    ))
    .case_insensitive(true)
    .build()
    .ok()
}

/// Replace or insert `?w=<width>` on every `![..](path)` occurrence.
///
/// Returns `None` when `path` does not occur as an image in `markdown`.
pub fn apply_width_annotation(markdown: &str, path: &str, width: u32) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let re = occurrence_regex(path)?;
    if !re.is_match(markdown) {
        return None;
    }
    let replacement = format!("${{1}}${{2}}?w={}${{3}}", width);
    Some(re.replace_all(markdown, replacement.as_str()).into_owned())
}

/// Width annotated on the first `![..](path?w=N)` occurrence, if any.
pub fn annotated_width(markdown: &str, path: &str) -> Option<u32> {
    if path.is_empty() {
        return None;
    }
    let re = RegexBuilder::new(&format!(
        r"!\[[^\]]*\]\(<?{}\?w=(\d+)>?\)",
        regex::escape(path)
    ))
    .case_insensitive(true)
    .build()
    .ok()?;
    re.captures(markdown)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
        .filter(|w| *w > 0)
}

/// Turn `file://<dir>/x` and `<dir>/x` image sources and link targets
/// below `node` back into `x`.
///
/// Inverse of [`resolve_image_src`]. Runs on the cleaned tree before it is
/// serialized, so the Markdown never carries the absolute form.
pub fn relativize_document_urls(node: &mut Node, document_dir: &Path) {
    let prefix = format!("{}/", dir_prefix(document_dir));
    relativize_node(node, &prefix);
}

fn relativize_node(node: &mut Node, prefix: &str) {
    let attr = match node.tag() {
        Some("img") => Some("src"),
        Some("a") => Some("href"),
        _ => None,
    };
    if let Some(name) = attr {
        let relative = node.attr(name).and_then(|url| {
            let path = url.strip_prefix(FILE_SCHEME).unwrap_or(url);
            path.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(str::to_string)
        });
        if let Some(relative) = relative {
            node.set_attr(name, relative);
        }
    }
    for child in &mut node.children {
        relativize_node(child, prefix);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
