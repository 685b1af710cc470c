//! Markdown rendering, serialization and source formatting
//!
//! Both directions of the document conversion live here:
//!
//! - [`renderer`] turns Markdown into a [`RenderedTree`](crate::document::RenderedTree)
//!   using comrak, with syntect-highlighted code block containers and the
//!   `?w=` image width convention;
//! - [`serializer`] turns a rendered tree back into Markdown.
//!
//! # Example
//! ```ignore
//! use twinmark::markdown::{render_markdown, serialize_tree, RenderOptions};
//!
//! let tree = render_markdown("# Hello\n\n![x](a.png?w=120)", None, &RenderOptions::default());
//! assert_eq!(serialize_tree(tree.root()), "# Hello\n\n![x](a.png?w=120)");
//! ```

pub mod code_block;
pub mod formatting;
pub mod image_width;
pub mod renderer;
pub mod serializer;
pub mod syntax;

pub use code_block::{
    build_code_block, code_block_language, code_block_text, filter_languages, is_code_block,
    language_display_name, resolve_language_input, set_code_block_language, LanguageChoice,
    SUPPORTED_LANGUAGES,
};
pub use formatting::{apply_format, FormatResult, MarkdownFormatCommand};
pub use image_width::{
    annotated_width, apply_width_annotation, relativize_document_urls, source_path_of,
    split_width_suffix, width_style,
};
pub use renderer::{render_markdown, MarkdownOptions, RenderOptions, TableAlignment};
pub use serializer::{format_separator_row, format_table_row, serialize_cell, serialize_tree};
pub use syntax::{get_highlighter, SyntaxHighlighter};
