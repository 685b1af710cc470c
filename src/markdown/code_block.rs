//! Editable code block containers
//!
//! A fenced code block renders as:
//!
//! ```text
//! div.code-block-wrapper[data-lang]
//! ├── div.code-block-header
//! │   ├── span.code-lang-label      display name, opens the language picker
//! │   └── button.code-copy-btn      copies the raw code
//! └── pre[contenteditable=false]
//!     └── code[contenteditable=true]  highlighted spans or plain text
//! ```
//!
//! The raw code is always the text content of the `code` element, so
//! changing the language only swaps the highlight markup.

use crate::document::Node;
use crate::markdown::syntax::get_highlighter;

pub const WRAPPER_CLASS: &str = "code-block-wrapper";
pub const HEADER_CLASS: &str = "code-block-header";
pub const LABEL_CLASS: &str = "code-lang-label";
pub const COPY_BUTTON_CLASS: &str = "code-copy-btn";

/// Label shown when a block has no language.
pub const NO_LANGUAGE_LABEL: &str = "Select language";

// ─────────────────────────────────────────────────────────────────────────────
// Language list
// ─────────────────────────────────────────────────────────────────────────────

/// Languages offered by the picker, as `(tag, label)` pairs.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("python", "Python"),
    ("java", "Java"),
    ("c", "C"),
    ("cpp", "C++"),
    ("csharp", "C#"),
    ("go", "Go"),
    ("rust", "Rust"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("ruby", "Ruby"),
    ("php", "PHP"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("json", "JSON"),
    ("xml", "XML"),
    ("yaml", "YAML"),
    ("markdown", "Markdown"),
    ("sql", "SQL"),
    ("bash", "Bash"),
    ("shell", "Shell"),
    ("powershell", "PowerShell"),
    ("dockerfile", "Dockerfile"),
    ("plaintext", "Plain Text"),
];

/// Human-readable name for a language tag; unknown tags are shown as-is.
pub fn language_display_name(lang: &str) -> String {
    let name = match lang.to_lowercase().as_str() {
        "" => NO_LANGUAGE_LABEL,
        "js" | "javascript" => "JavaScript",
        "ts" | "typescript" => "TypeScript",
        "py" | "python" => "Python",
        "rb" | "ruby" => "Ruby",
        "java" => "Java",
        "cpp" | "c++" => "C++",
        "c" => "C",
        "cs" | "csharp" | "c#" => "C#",
        "go" | "golang" => "Go",
        "rs" | "rust" => "Rust",
        "swift" => "Swift",
        "kt" | "kotlin" => "Kotlin",
        "php" => "PHP",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "sass" => "Sass",
        "less" => "Less",
        "json" => "JSON",
        "xml" => "XML",
        "yaml" | "yml" => "YAML",
        "md" | "markdown" => "Markdown",
        "sql" => "SQL",
        "sh" | "bash" => "Bash",
        "shell" => "Shell",
        "powershell" | "ps1" => "PowerShell",
        "dockerfile" | "docker" => "Dockerfile",
        "plaintext" | "text" | "txt" => "Plain Text",
        _ => return lang.to_string(),
    };
    name.to_string()
}

/// One entry in the picker list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChoice {
    pub tag: String,
    pub label: String,
    /// Free-form entry typed by the user that is not in the list
    pub custom: bool,
}

/// Filter the picker list by `query`, matching tag or label
/// case-insensitively. A non-empty query that is not itself a listed tag
/// is offered as a trailing custom entry.
pub fn filter_languages(query: &str) -> Vec<LanguageChoice> {
    let needle = query.trim().to_lowercase();
    let mut choices: Vec<LanguageChoice> = SUPPORTED_LANGUAGES
        .iter()
        .filter(|(tag, label)| tag.contains(&needle) || label.to_lowercase().contains(&needle))
        .map(|(tag, label)| LanguageChoice {
            tag: tag.to_string(),
            label: label.to_string(),
            custom: false,
        })
        .collect();

    if !needle.is_empty() && !choices.iter().any(|c| c.tag == needle) {
        choices.push(LanguageChoice {
            tag: needle.clone(),
            label: query.trim().to_string(),
            custom: true,
        });
    }
    choices
}

/// Resolve what the user confirmed in the picker: a listed tag or label, or
/// the lower-cased free text. Empty input resolves to `None`.
pub fn resolve_language_input(input: &str) -> Option<String> {
    let value = input.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(tag, label)| *tag == value || label.to_lowercase() == value)
        .map(|(tag, _)| tag.to_string())
        .or(Some(value))
}

// ─────────────────────────────────────────────────────────────────────────────
// Building and reading containers
// ─────────────────────────────────────────────────────────────────────────────

/// Highlighted body for `code`, or plain text for unknown languages.
fn highlighted_body(code: &str, lang: &str, theme: &str) -> Vec<Node> {
    if lang.is_empty() || code.is_empty() {
        return vec![Node::text(code)];
    }
    get_highlighter()
        .highlight_to_nodes(code, lang, theme)
        .unwrap_or_else(|| vec![Node::text(code)])
}

fn language_class(lang: &str) -> Option<String> {
    (!lang.is_empty()).then(|| format!("language-{}", lang))
}

/// Build the editable container for one fenced code block.
pub fn build_code_block(lang: &str, code: &str, theme: &str) -> Node {
    let mut pre = Node::element("pre").with_attr("contenteditable", "false");
    let mut code_el = Node::element("code")
        .with_attr("contenteditable", "true")
        .with_attr("spellcheck", "false");
    if let Some(class) = language_class(lang) {
        pre.set_attr("class", class.clone());
        code_el.set_attr("class", class);
    }
    code_el.children = highlighted_body(code, lang, theme);
    pre.children.push(code_el);

    let header = Node::element("div")
        .with_class(HEADER_CLASS)
        .with_child(
            Node::element("span")
                .with_class(LABEL_CLASS)
                .with_attr("title", "Choose language")
                .with_child(Node::text(language_display_name(lang))),
        )
        .with_child(
            Node::element("button")
                .with_class(COPY_BUTTON_CLASS)
                .with_attr("title", "Copy code")
                .with_child(Node::text("Copy")),
        );

    Node::element("div")
        .with_class(WRAPPER_CLASS)
        .with_attr("data-lang", lang)
        .with_child(header)
        .with_child(pre)
}

pub fn is_code_block(node: &Node) -> bool {
    node.is_tag("div") && node.has_class(WRAPPER_CLASS)
}

/// Language tag of a container (empty when none).
pub fn code_block_language(node: &Node) -> String {
    node.attr("data-lang").unwrap_or("").to_string()
}

/// Raw code of a container, ignoring highlight markup.
///
/// Falls back to the `pre`, then to the container minus its header, when
/// the expected children are missing.
pub fn code_block_text(node: &Node) -> String {
    if let Some(code) = node.find_tag("code") {
        return code.text_content();
    }
    if let Some(pre) = node.find_tag("pre") {
        return pre.text_content();
    }
    node.children
        .iter()
        .filter(|c| !c.has_class(HEADER_CLASS))
        .map(Node::text_content)
        .collect()
}

/// Reassign the language of a container and re-highlight its code.
///
/// The raw text is read before and written after, so it never changes.
pub fn set_code_block_language(node: &mut Node, lang: &str, theme: &str) {
    let code = code_block_text(node);
    node.set_attr("data-lang", lang);

    if let Some(label) = node.find_class_mut(LABEL_CLASS) {
        label.set_text_content(language_display_name(lang));
    }

    let class = language_class(lang);
    let body = highlighted_body(&code, lang, theme);
    let Some(pre) = node.children.iter_mut().find(|c| c.is_tag("pre")) else {
        // Damaged container: rebuild it wholesale.
        *node = build_code_block(lang, &code, theme);
        return;
    };
    match &class {
        Some(c) => pre.set_attr("class", c.clone()),
        None => pre.remove_attr("class"),
    }
    pre.set_attr("contenteditable", "false");

    match pre.children.iter_mut().find(|c| c.is_tag("code")) {
        Some(code_el) => {
            match &class {
                Some(c) => code_el.set_attr("class", c.clone()),
                None => code_el.remove_attr("class"),
            }
            code_el.set_attr("contenteditable", "true");
            code_el.set_attr("spellcheck", "false");
            code_el.children = body;
        }
        None => {
            let mut code_el = Node::element("code")
                .with_attr("contenteditable", "true")
                .with_attr("spellcheck", "false");
            if let Some(c) = class {
                code_el.set_attr("class", c);
            }
            code_el.children = body;
            pre.children = vec![code_el];
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
