//! Collaborators at the disk boundary
//!
//! The sync core never touches the filesystem itself. Documents are loaded
//! and saved through a [`DocumentStore`], and pasted images are handed to
//! an [`ImageSink`] that returns the URL to embed in Markdown.

use crate::config::APP_NAME;
use crate::error::{Error, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File extensions treated as Markdown documents.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd", "mkdn"];

pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MARKDOWN_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

pub trait DocumentStore {
    fn open(&self, path: &Path) -> Result<String>;
    fn save(&self, path: &Path, text: &str) -> Result<()>;
}

/// Documents on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentStore;

impl DocumentStore for FsDocumentStore {
    fn open(&self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Opened file: {}", path.display());
        Ok(text)
    }

    fn save(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Saved file: {}", path.display());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Image sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Stores pasted image bytes and returns the URL to reference them by.
///
/// `document_path` is the path of the document being edited, if it has
/// been saved.
pub trait ImageSink {
    fn store(&self, png: &[u8], document_path: Option<&Path>) -> Result<String>;
}

/// Subdirectory of the document's directory that pasted images go to.
pub const IMAGE_DIR: &str = "image";

/// Writes pasted images next to the document.
///
/// Saved documents get `<doc dir>/image/image-<millis>.png`, referenced
/// relatively as `image/image-<millis>.png`. Unsaved documents have no
/// directory to be relative to, so their images go to a fallback
/// directory and are referenced by absolute path.
#[derive(Debug, Clone)]
pub struct LocalImageSink {
    fallback_dir: Option<PathBuf>,
}

impl Default for LocalImageSink {
    fn default() -> Self {
        Self {
            fallback_dir: dirs::document_dir().map(|d| d.join(format!("{}-images", APP_NAME))),
        }
    }
}

impl LocalImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            fallback_dir: Some(dir.into()),
        }
    }

    fn write_unique(dir: &Path, png: &[u8]) -> Result<String> {
        fs::create_dir_all(dir)?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut name = format!("image-{}.png", millis);
        let mut n = 1;
        while dir.join(&name).exists() {
            name = format!("image-{}-{}.png", millis, n);
            n += 1;
        }

        let path = dir.join(&name);
        fs::write(&path, png).map_err(|e| Error::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        debug!("Stored pasted image at {}", path.display());
        Ok(name)
    }
}

impl ImageSink for LocalImageSink {
    fn store(&self, png: &[u8], document_path: Option<&Path>) -> Result<String> {
        match document_path.and_then(Path::parent) {
            Some(doc_dir) => {
                let name = Self::write_unique(&doc_dir.join(IMAGE_DIR), png)?;
                Ok(format!("{}/{}", IMAGE_DIR, name))
            }
            None => {
                let dir = self
                    .fallback_dir
                    .as_deref()
                    .ok_or_else(|| Error::image_store("no directory available for images"))?;
                let name = Self::write_unique(dir, png)?;
                Ok(dir.join(name).to_string_lossy().replace('\\', "/"))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
