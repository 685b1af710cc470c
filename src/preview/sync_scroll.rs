//! Proportional sync scrolling between the source and preview panes
//!
//! A scroll in one pane is mirrored to the other at the same fraction of
//! its scrollable range. Mirroring moves the other pane, which fires its
//! own scroll event; the "scroll origin" guard swallows that echo until the
//! next animation frame, when the host calls
//! [`SyncScrollState::on_animation_frame`].
//!
//! # Usage
//!
//! ```ignore
//! let mut sync = SyncScrollState::new();
//!
//! // Source pane scrolled
//! if let Some(top) = sync.on_scroll(ScrollOrigin::Source, source_metrics, preview_metrics, true) {
//!     // Apply `top` to the preview pane
//! }
//! // Next frame
//! sync.on_animation_frame();
//! ```

use log::trace;

// ─────────────────────────────────────────────────────────────────────────────
// Scroll Origin
// ─────────────────────────────────────────────────────────────────────────────

/// Origin of a scroll event, used to prevent feedback loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOrigin {
    /// Scroll originated from the Markdown source pane
    Source,
    /// Scroll originated from the rendered preview pane
    Preview,
}

impl ScrollOrigin {
    pub fn other(self) -> Self {
        match self {
            ScrollOrigin::Source => ScrollOrigin::Preview,
            ScrollOrigin::Preview => ScrollOrigin::Source,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Scroll geometry of one pane, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Current scroll offset from the top
    pub top: f32,
    /// Total content height
    pub height: f32,
    /// Visible height
    pub client: f32,
}

impl ScrollMetrics {
    pub fn new(top: f32, height: f32, client: f32) -> Self {
        Self {
            top,
            height,
            client,
        }
    }

    /// Largest reachable scroll offset.
    pub fn max_top(&self) -> f32 {
        (self.height - self.client).max(0.0)
    }

    /// Position within the scrollable range, 0.0 when nothing scrolls.
    pub fn fraction(&self) -> f32 {
        let range = self.height - self.client;
        if range <= 0.0 {
            return 0.0;
        }
        (self.top / range).clamp(0.0, 1.0)
    }

    /// Scroll offset that puts this pane at `fraction` of its range.
    pub fn top_for_fraction(&self, fraction: f32) -> f32 {
        fraction.clamp(0.0, 1.0) * self.max_top()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync Scroll State
// ─────────────────────────────────────────────────────────────────────────────

/// Guarded mirroring of scroll positions between the two panes.
#[derive(Debug, Clone, Default)]
pub struct SyncScrollState {
    /// Whether sync scrolling is enabled
    pub enabled: bool,
    /// Pane whose scroll is currently being mirrored
    guard: Option<ScrollOrigin>,
}

impl SyncScrollState {
    pub fn new() -> Self {
        Self {
            enabled: true,
            guard: None,
        }
    }

    /// Toggle sync scrolling on/off.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.guard = None;
        }
        self.enabled
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Handle a scroll in `origin`'s pane.
    ///
    /// `active` is whether the dual-pane source layout is showing. Returns
    /// the scroll offset to apply to the other pane, or `None` when the
    /// event is an echo of our own mirroring or syncing is off.
    pub fn on_scroll(
        &mut self,
        origin: ScrollOrigin,
        scrolled: ScrollMetrics,
        other: ScrollMetrics,
        active: bool,
    ) -> Option<f32> {
        if !self.enabled || !active {
            return None;
        }
        if let Some(guard) = self.guard {
            trace!("Ignoring {:?} scroll while mirroring {:?}", origin, guard);
            return None;
        }
        self.guard = Some(origin);
        Some(other.top_for_fraction(scrolled.fraction()))
    }

    /// Release the guard once the mirrored scroll has settled.
    pub fn on_animation_frame(&mut self) {
        self.guard = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
