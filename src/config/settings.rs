//! Settings snapshot consumed by the editor core
//!
//! The core only reads settings. Persisting them belongs to the host
//! application, so there is no save path here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Image Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Where pasted images are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageStorage {
    /// Next to the document, in an `image/` directory
    #[default]
    Local,
    /// Uploaded to a remote image host supplied by the application
    Remote,
}

/// Which remote image host the application should upload to.
///
/// The core never talks to these services; the value is handed to the
/// host-provided remote sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteHost {
    #[default]
    SmMs,
    Imgur,
    Custom,
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Editor settings.
///
/// All fields have defaults via `Default` and `#[serde(default)]`, so a
/// partial settings file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Image paste
    // ─────────────────────────────────────────────────────────────────────────
    /// Storage used for pasted images
    pub image_storage: ImageStorage,

    /// Remote host used when `image_storage` is `Remote`
    pub remote_host: RemoteHost,

    /// API token for the remote host (empty = not configured)
    pub remote_token: String,

    /// Upload endpoint for `RemoteHost::Custom`
    pub remote_custom_url: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Synchronization timing
    // ─────────────────────────────────────────────────────────────────────────
    /// Quiescence window before rich-view and code-block edits are synced
    pub sync_debounce_ms: u64,

    /// How long a table write-back suppresses the re-render it causes
    pub table_guard_ms: u64,

    /// How long a status message stays before reverting to "Ready"
    pub status_timeout_ms: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────
    /// Render single newlines inside paragraphs as line breaks
    pub hard_breaks: bool,

    /// syntect theme used for code block highlighting
    pub code_theme: String,

    /// Initial source pane width, in percent of the split container
    pub split_ratio: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_storage: ImageStorage::default(),
            remote_host: RemoteHost::default(),
            remote_token: String::new(),
            remote_custom_url: String::new(),

            sync_debounce_ms: 100,
            table_guard_ms: 100,
            status_timeout_ms: 3000,

            hard_breaks: true,
            code_theme: "InspiredGitHub".to_string(),
            split_ratio: 50.0,
        }
    }
}

impl Settings {
    pub const MIN_TIMER_MS: u64 = 10;
    pub const MAX_TIMER_MS: u64 = 2000;
    pub const MIN_STATUS_MS: u64 = 500;
    pub const MAX_STATUS_MS: u64 = 30_000;
    pub const MIN_SPLIT_RATIO: f32 = 20.0;
    pub const MAX_SPLIT_RATIO: f32 = 80.0;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// Settings files are hand-editable, so anything read from disk goes
    /// through here before use.
    pub fn sanitize(&mut self) {
        self.sync_debounce_ms = self
            .sync_debounce_ms
            .clamp(Self::MIN_TIMER_MS, Self::MAX_TIMER_MS);
        self.table_guard_ms = self
            .table_guard_ms
            .clamp(Self::MIN_TIMER_MS, Self::MAX_TIMER_MS);
        self.status_timeout_ms = self
            .status_timeout_ms
            .clamp(Self::MIN_STATUS_MS, Self::MAX_STATUS_MS);

        if self.split_ratio.is_nan() {
            self.split_ratio = 50.0;
        }
        self.split_ratio = self
            .split_ratio
            .clamp(Self::MIN_SPLIT_RATIO, Self::MAX_SPLIT_RATIO);

        self.remote_token = self.remote_token.trim().to_string();
        if self.code_theme.trim().is_empty() {
            self.code_theme = Self::default().code_theme;
        }
    }

    /// Deserialize and then sanitize.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Whether a remote upload can be attempted at all.
    pub fn has_remote_token(&self) -> bool {
        !self.remote_token.is_empty()
    }

    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    pub fn table_guard(&self) -> Duration {
        Duration::from_millis(self.table_guard_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
