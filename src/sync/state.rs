//! Edit mode and synchronization state

/// Which representation the user edits directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Plain Markdown source; the rendered view is a read-only preview
    #[default]
    Source,
    /// The rendered view is edited directly
    Wysiwyg,
}

impl EditMode {
    /// Toggle between Source and Wysiwyg modes.
    pub fn toggle(&self) -> Self {
        match self {
            EditMode::Source => EditMode::Wysiwyg,
            EditMode::Wysiwyg => EditMode::Source,
        }
    }

    /// Get a display label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            EditMode::Source => "Source",
            EditMode::Wysiwyg => "WYSIWYG",
        }
    }
}

/// The propagation currently in flight, if any.
///
/// Exactly one value at a time, so two propagation directions can never be
/// active together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// A render from the Source Buffer is rebuilding the Rendered Tree
    ApplyingFromSource,
    /// Serialized rich-view content is being written into the Source Buffer
    ApplyingFromRichView,
    /// A table write-back was spliced in; released by a scheduled task
    ApplyingTableEdit,
}

impl SyncState {
    pub fn is_idle(self) -> bool {
        self == SyncState::Idle
    }

    /// Whether a source mutation made in this state must not re-render.
    pub fn suppresses_render(self) -> bool {
        !self.is_idle()
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::ApplyingFromSource => "applying from source",
            SyncState::ApplyingFromRichView => "applying from rich view",
            SyncState::ApplyingTableEdit => "applying table edit",
        }
    }
}
