//! Split-pane geometry
//!
//! The split ratio lives only for the session; it starts from the settings
//! value and is never written back.

use crate::config::Settings;

/// Which panes are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaneLayout {
    #[default]
    Both,
    EditorOnly,
    PreviewOnly,
}

impl PaneLayout {
    /// Next layout in the toggle cycle Both → PreviewOnly → EditorOnly.
    pub fn cycle(self) -> Self {
        match self {
            PaneLayout::Both => PaneLayout::PreviewOnly,
            PaneLayout::PreviewOnly => PaneLayout::EditorOnly,
            PaneLayout::EditorOnly => PaneLayout::Both,
        }
    }

    pub fn shows_editor(self) -> bool {
        self != PaneLayout::PreviewOnly
    }

    pub fn shows_preview(self) -> bool {
        self != PaneLayout::EditorOnly
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    /// Source pane width in percent of the split container
    split_ratio: f32,
    pub layout: PaneLayout,
}

impl Default for ViewGeometry {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl ViewGeometry {
    pub fn new(split_ratio: f32) -> Self {
        Self {
            split_ratio: clamp_ratio(split_ratio),
            layout: PaneLayout::Both,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.split_ratio)
    }

    pub fn split_ratio(&self) -> f32 {
        self.split_ratio
    }

    pub fn set_split_ratio(&mut self, ratio: f32) -> f32 {
        self.split_ratio = clamp_ratio(ratio);
        self.split_ratio
    }

    /// Move the divider to `pointer_x` inside a container starting at
    /// `container_left` and `container_width` wide.
    pub fn drag_split(&mut self, pointer_x: f32, container_left: f32, container_width: f32) -> f32 {
        if container_width <= 0.0 {
            return self.split_ratio;
        }
        self.set_split_ratio((pointer_x - container_left) * 100.0 / container_width)
    }

    pub fn cycle_layout(&mut self) -> PaneLayout {
        self.layout = self.layout.cycle();
        self.layout
    }
}

fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        return 50.0;
    }
    ratio.clamp(Settings::MIN_SPLIT_RATIO, Settings::MAX_SPLIT_RATIO)
}
