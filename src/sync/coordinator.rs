//! Sync Coordinator
//!
//! Owns the Source Buffer and the Rendered Tree and decides, for every
//! mutation, which one is authoritative and how the change reaches the
//! other:
//!
//! - source mutations re-render the tree (unless a propagation from the
//!   rich view or a table write-back is in flight);
//! - rich-view edits are serialized back into the source after a debounce,
//!   or immediately when leaving WYSIWYG mode;
//! - table and image editors splice their result into the source and
//!   rebuild only the node they changed.
//!
//! Time never comes from the clock here. Every entry point that can
//! schedule work takes `now`, and the host calls [`SyncCoordinator::run_due_tasks`]
//! when [`SyncCoordinator::next_deadline`] passes.

use crate::clipboard;
use crate::config::{ImageStorage, Settings};
use crate::document::{NodeId, RenderedTree, SourceBuffer, TextStats};
use crate::editor::image::{enclosing_image_wrapper, original_src};
use crate::editor::table::{cell_id_at, enclosing_wrapper, wrapper_index};
use crate::editor::{
    attach_scaffolding, cell_position, locate_table_span, navigate, strip_editor_scaffolding,
    CaretEdge, CellPosition, ImageDragSession, NavigationOutcome, TableData, TableKey,
    TableMenuAction, TableOp,
};
use crate::error::{Error, Result};
use crate::files::{DocumentStore, ImageSink};
use crate::markdown::{
    apply_format, apply_width_annotation, code_block_text, is_code_block,
    relativize_document_urls, render_markdown, resolve_language_input, serialize_tree,
    set_code_block_language, source_path_of, MarkdownFormatCommand, RenderOptions,
};
use crate::markdown::serializer::link_destination;
use crate::preview::{ScrollMetrics, ScrollOrigin, SyncScrollState, ViewGeometry};
use crate::status::StatusLine;
use crate::sync::scheduler::{Scheduler, TaskKind};
use crate::sync::state::{EditMode, SyncState};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a key press inside a table cell resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKeyResult {
    /// Move focus to this cell node
    Focus(NodeId),
    /// Handled; keep focus where it is
    Consumed,
    /// Not a navigation key here; let the cell edit normally
    Ignored,
}

pub struct SyncCoordinator {
    settings: Settings,
    render_options: RenderOptions,
    buffer: SourceBuffer,
    tree: RenderedTree,
    mode: EditMode,
    state: SyncState,
    scheduler: Scheduler,
    /// A source change arrived while the table guard was held
    pending_render: bool,
    document_path: Option<PathBuf>,
    modified: bool,
    stats: TextStats,
    status: StatusLine,
    scroll: SyncScrollState,
    geometry: ViewGeometry,
    drag: Option<ImageDragSession>,
    render_count: u64,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SyncCoordinator {
    pub fn new(settings: Settings) -> Self {
        let mut coordinator = Self {
            render_options: RenderOptions::from_settings(&settings),
            status: StatusLine::new(settings.status_timeout()),
            geometry: ViewGeometry::from_settings(&settings),
            settings,
            buffer: SourceBuffer::new(),
            tree: RenderedTree::default(),
            mode: EditMode::Source,
            state: SyncState::Idle,
            scheduler: Scheduler::new(),
            pending_render: false,
            document_path: None,
            modified: false,
            stats: TextStats::default(),
            scroll: SyncScrollState::new(),
            drag: None,
            render_count: 0,
        };
        coordinator.render();
        coordinator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    pub fn source(&self) -> &str {
        self.buffer.text()
    }

    pub fn tree(&self) -> &RenderedTree {
        &self.tree
    }

    /// Direct access for rich-view editing. Report edits made through it
    /// with [`SyncCoordinator::on_rich_input`].
    pub fn tree_mut(&mut self) -> &mut RenderedTree {
        &mut self.tree
    }

    pub fn html(&self) -> String {
        self.tree.to_html()
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn stats(&self) -> TextStats {
        self.stats
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document_path.as_deref()
    }

    pub fn document_dir(&self) -> Option<&Path> {
        self.document_path.as_deref().and_then(Path::parent)
    }

    /// Window title text: file name (or "Untitled") plus a modified marker.
    pub fn title(&self) -> String {
        let name = self
            .document_path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("Untitled");
        if self.modified {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }

    pub fn geometry(&self) -> &ViewGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut ViewGeometry {
        &mut self.geometry
    }

    /// Number of full renders so far.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status line
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        debug!("Status: {}", message);
        self.status.set(message, now);
    }

    pub fn status_text(&self, now: Instant) -> &str {
        self.status.text(now)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────────────────

    /// Earliest moment the host should call [`SyncCoordinator::run_due_tasks`].
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.status.expires_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run every task due at `now`.
    pub fn run_due_tasks(&mut self, now: Instant) {
        self.status.tick(now);
        for task in self.scheduler.take_due(now) {
            match task.kind {
                TaskKind::RichViewSync => {
                    if self.mode == EditMode::Wysiwyg {
                        self.sync_from_rich_view();
                    }
                }
                TaskKind::CodeBlockSync => {
                    self.sync_from_rich_view();
                }
                TaskKind::ReleaseTableGuard => self.release_table_guard(),
            }
        }
    }

    fn release_table_guard(&mut self) {
        if self.state != SyncState::ApplyingTableEdit {
            return;
        }
        self.state = SyncState::Idle;
        debug!("Table guard released");
        if self.pending_render {
            debug!("Running render deferred by table guard");
            self.render();
        }
    }

    /// Serialize a rich-view edit that is still waiting for its debounce.
    fn flush_pending_rich_sync(&mut self) {
        if self.scheduler.cancel(TaskKind::RichViewSync).is_some() && self.mode == EditMode::Wysiwyg
        {
            self.sync_from_rich_view();
        }
        if self.scheduler.cancel(TaskKind::CodeBlockSync).is_some() {
            self.sync_from_rich_view();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Source → Rendered Tree
    // ─────────────────────────────────────────────────────────────────────────

    fn render(&mut self) {
        let previous = self.state;
        self.state = SyncState::ApplyingFromSource;

        let started = Instant::now();
        let dir = self.document_path.as_deref().and_then(Path::parent);
        let mut tree = render_markdown(self.buffer.text(), dir, &self.render_options);
        attach_scaffolding(&mut tree, self.buffer.text(), dir);
        tree.editable = self.mode == EditMode::Wysiwyg;
        self.tree = tree;

        self.pending_render = false;
        self.render_count += 1;
        self.drag = None;
        self.state = previous;
        debug!(
            "Rendered {} bytes in {:?}",
            self.buffer.text().len(),
            started.elapsed()
        );
    }

    fn note_source_changed(&mut self) {
        self.stats = TextStats::from_text(self.buffer.text());
        self.modified = true;
    }

    /// Propagate a Source Buffer mutation to the Rendered Tree.
    fn on_source_changed(&mut self) {
        self.note_source_changed();
        match self.state {
            SyncState::Idle => self.render(),
            SyncState::ApplyingTableEdit => {
                debug!("Source changed under table guard; render deferred");
                self.pending_render = true;
            }
            state => debug!("Render suppressed while {}", state.label()),
        }
    }

    /// Run a mutation on the Source Buffer and propagate it if the text
    /// changed.
    pub fn edit_source(&mut self, edit: impl FnOnce(&mut SourceBuffer)) -> bool {
        let before = self.buffer.version();
        edit(&mut self.buffer);
        let changed = self.buffer.version() != before;
        if changed {
            self.on_source_changed();
        }
        changed
    }

    pub fn set_source_text(&mut self, text: &str) -> bool {
        self.edit_source(|b| {
            b.set_text(text);
        })
    }

    pub fn insert_source_text(&mut self, text: &str) -> bool {
        self.edit_source(|b| b.insert_at_cursor(text))
    }

    pub fn undo(&mut self) -> bool {
        self.edit_source(|b| {
            b.undo();
        })
    }

    pub fn redo(&mut self) -> bool {
        self.edit_source(|b| {
            b.redo();
        })
    }

    /// Apply a formatting command to the source selection.
    ///
    /// Formatting works on Markdown text, so it only applies in Source mode.
    pub fn format(&mut self, command: MarkdownFormatCommand) -> bool {
        if self.mode != EditMode::Source {
            return false;
        }
        let (start, end) = self
            .buffer
            .selection()
            .unwrap_or((self.buffer.cursor(), self.buffer.cursor()));
        let selection = (
            self.buffer.char_offset_of(start),
            self.buffer.char_offset_of(end),
        );
        let result = apply_format(self.buffer.text(), selection, command);
        debug!("Format {:?} applied={}", command, result.applied);

        self.edit_source(|b| {
            b.set_text(result.text);
            let anchor = b.position_of_char(result.selection.0);
            let cursor = b.position_of_char(result.selection.1);
            if anchor == cursor {
                b.set_cursor(cursor);
            } else {
                b.set_selection(anchor, cursor);
            }
        })
    }

    pub fn insert_table_template(&mut self) -> bool {
        self.format(MarkdownFormatCommand::Table)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendered Tree → Source
    // ─────────────────────────────────────────────────────────────────────────

    /// The rich view was edited; schedule a debounced sync.
    pub fn on_rich_input(&mut self, now: Instant) {
        self.tree.adopt_new_nodes();
        if self.mode != EditMode::Wysiwyg {
            return;
        }
        self.scheduler
            .schedule(TaskKind::RichViewSync, now, self.settings.sync_debounce());
    }

    /// Replace the text of a rich-view node and report it as input.
    pub fn edit_rich_text(&mut self, id: NodeId, text: &str, now: Instant) -> bool {
        if !self.tree.set_text(id, text) {
            return false;
        }
        if self.is_inside_code_block(id) {
            self.on_code_block_input(now);
        } else {
            self.on_rich_input(now);
        }
        true
    }

    /// Typing inside a code block; synced in both modes.
    pub fn on_code_block_input(&mut self, now: Instant) {
        self.tree.adopt_new_nodes();
        self.scheduler
            .schedule(TaskKind::CodeBlockSync, now, self.settings.sync_debounce());
    }

    /// Serialize the Rendered Tree into the Source Buffer.
    ///
    /// Returns whether the source changed.
    pub fn sync_from_rich_view(&mut self) -> bool {
        if matches!(
            self.state,
            SyncState::ApplyingFromRichView | SyncState::ApplyingFromSource
        ) {
            debug!("Rich view sync skipped while {}", self.state.label());
            return false;
        }
        let previous = self.state;
        self.state = SyncState::ApplyingFromRichView;

        let mut root = self.tree.root().clone();
        strip_editor_scaffolding(&mut root);
        if let Some(dir) = self.document_dir() {
            relativize_document_urls(&mut root, dir);
        }
        let markdown = serialize_tree(&root);

        let changed = self.buffer.set_text(markdown);
        if changed {
            self.on_source_changed();
        }

        self.state = previous;
        debug!("Synced rich view into source (changed: {})", changed);
        changed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edit mode
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch edit mode. Returns `false` when already in `mode`.
    pub fn set_mode(&mut self, mode: EditMode) -> bool {
        if mode == self.mode {
            return false;
        }
        match mode {
            EditMode::Source => {
                self.scheduler.cancel(TaskKind::RichViewSync);
                self.sync_from_rich_view();
                self.mode = EditMode::Source;
                self.tree.editable = false;
            }
            EditMode::Wysiwyg => {
                self.mode = EditMode::Wysiwyg;
                self.render();
            }
        }
        info!("Switched to {} mode", self.mode.label());
        true
    }

    pub fn toggle_mode(&mut self) -> EditMode {
        self.set_mode(self.mode.toggle());
        self.mode
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Table editing
    // ─────────────────────────────────────────────────────────────────────────

    fn table_model(&self, wrapper: NodeId) -> Option<(usize, TableData)> {
        let node = self.tree.get(wrapper)?;
        let index = wrapper_index(node)?;
        let data = TableData::from_table_node(node.find_tag("table")?)?;
        Some((index, data))
    }

    /// Splice `data` over the `index`-th table in the source and hold the
    /// table guard so the splice does not re-render.
    fn write_table_back(&mut self, index: usize, data: &TableData, now: Instant) -> bool {
        let Some(span) = locate_table_span(self.buffer.text(), index) else {
            debug!("Table #{} has no source span; write-back skipped", index);
            return false;
        };

        // Tables nested in list items keep their indentation.
        let indent: String = self
            .buffer
            .line(span.start)
            .unwrap_or_default()
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let lines: Vec<String> = data
            .to_markdown_lines()
            .into_iter()
            .map(|line| format!("{}{}", indent, line))
            .collect();

        self.state = SyncState::ApplyingTableEdit;
        if self.buffer.replace_lines(span.start, span.end, &lines) {
            self.note_source_changed();
        }
        self.scheduler
            .schedule(TaskKind::ReleaseTableGuard, now, self.settings.table_guard());
        true
    }

    /// Apply a structural operation to the table in `wrapper`.
    ///
    /// Returns the id of the rebuilt wrapper, or `None` when the operation
    /// was refused or the table could not be found in the source.
    pub fn table_op(&mut self, wrapper: NodeId, op: TableOp, now: Instant) -> Option<NodeId> {
        let (index, mut data) = self.table_model(wrapper)?;
        if !data.apply(op) {
            debug!("Table op {:?} refused", op);
            return None;
        }
        if !self.write_table_back(index, &data, now) {
            return None;
        }
        self.tree.replace(wrapper, data.build_editor(index))
    }

    /// Run a context menu entry on the table containing `cell`.
    pub fn table_menu_action(
        &mut self,
        cell: NodeId,
        action: TableMenuAction,
        now: Instant,
    ) -> Option<NodeId> {
        let wrapper = enclosing_wrapper(&self.tree, cell)?;
        let pos = self
            .tree
            .get(wrapper)?
            .find_tag("table")
            .and_then(|t| cell_position(t, cell))?;
        debug!("Table menu: {} at {:?}", action.label(), pos);
        self.table_op(wrapper, action.op_at(pos), now)
    }

    /// A cell's content was edited in place; write the table back.
    pub fn table_cell_edited(&mut self, cell: NodeId, now: Instant) -> bool {
        let Some(wrapper) = enclosing_wrapper(&self.tree, cell) else {
            return false;
        };
        let Some((index, data)) = self.table_model(wrapper) else {
            return false;
        };
        let written = self.write_table_back(index, &data, now);
        if self.mode == EditMode::Wysiwyg {
            self.on_rich_input(now);
        }
        written
    }

    /// Cell node at `pos` inside the table editor `wrapper`.
    pub fn table_cell_id(&self, wrapper: NodeId, pos: CellPosition) -> Option<NodeId> {
        cell_id_at(self.tree.get(wrapper)?.find_tag("table")?, pos)
    }

    /// Handle a navigation key pressed in `cell`.
    pub fn table_key(
        &mut self,
        cell: NodeId,
        key: TableKey,
        caret: CaretEdge,
        now: Instant,
    ) -> TableKeyResult {
        let Some(wrapper) = enclosing_wrapper(&self.tree, cell) else {
            return TableKeyResult::Ignored;
        };
        let Some((_, data)) = self.table_model(wrapper) else {
            return TableKeyResult::Ignored;
        };
        let Some(from) = self
            .tree
            .get(wrapper)
            .and_then(|w| w.find_tag("table"))
            .and_then(|t| cell_position(t, cell))
        else {
            return TableKeyResult::Ignored;
        };

        match navigate(data.row_count(), data.num_columns, from, key, caret) {
            NavigationOutcome::Focus(pos) => self
                .table_cell_id(wrapper, pos)
                .map_or(TableKeyResult::Consumed, TableKeyResult::Focus),
            NavigationOutcome::AppendRowAndFocus(pos) => self
                .table_op(wrapper, TableOp::AppendRow, now)
                .and_then(|rebuilt| self.table_cell_id(rebuilt, pos))
                .map_or(TableKeyResult::Consumed, TableKeyResult::Focus),
            NavigationOutcome::Consumed => TableKeyResult::Consumed,
            NavigationOutcome::Ignored => TableKeyResult::Ignored,
        }
    }

    /// Visual column resize; not written to the source.
    pub fn resize_table_column(&mut self, wrapper: NodeId, column: usize, width: u32) -> Option<NodeId> {
        let (index, mut data) = self.table_model(wrapper)?;
        data.resize_column(column, width)?;
        self.tree.replace(wrapper, data.build_editor(index))
    }

    /// Visual row resize; not written to the source.
    pub fn resize_table_row(&mut self, wrapper: NodeId, row: usize, height: u32) -> Option<NodeId> {
        let (index, mut data) = self.table_model(wrapper)?;
        data.resize_row(row, height)?;
        self.tree.replace(wrapper, data.build_editor(index))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image resizing
    // ─────────────────────────────────────────────────────────────────────────

    /// Start resizing the image inside `target` at its displayed size.
    pub fn begin_image_drag(&mut self, target: NodeId, width: f32, height: f32) -> bool {
        self.drag = enclosing_image_wrapper(&self.tree, target)
            .and_then(|wrapper| ImageDragSession::begin(wrapper, width, height));
        self.drag.is_some()
    }

    /// Pointer moved by `(dx, dy)` since the drag started. Returns the
    /// size label to show.
    pub fn drag_image(&mut self, dx: f32, dy: f32) -> Option<String> {
        let mut drag = self.drag.take()?;
        drag.update(dx, dy);
        drag.preview(&mut self.tree);
        let label = drag.size_label();
        self.drag = Some(drag);
        Some(label)
    }

    /// Release the drag and persist the width.
    pub fn end_image_drag(&mut self) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let wrapper = drag.wrapper;
        let width = drag.finish(&mut self.tree);
        self.set_image_width(wrapper, width)
    }

    /// Write `width` as the `?w=` annotation of the image in `wrapper`.
    ///
    /// Every occurrence of the image's path in the source is updated.
    pub fn set_image_width(&mut self, wrapper: NodeId, width: u32) -> bool {
        let Some(src) = self.tree.get(wrapper).and_then(original_src).map(str::to_string) else {
            return false;
        };
        let path = source_path_of(&src, self.document_dir());

        self.flush_pending_rich_sync();
        let Some(updated) = apply_width_annotation(self.buffer.text(), &path, width) else {
            debug!("Image '{}' not found in source; width not written", path);
            return false;
        };
        self.set_source_text(&updated)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code blocks
    // ─────────────────────────────────────────────────────────────────────────

    fn is_inside_code_block(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.tree.get(node_id) {
                Some(node) if is_code_block(node) => return true,
                Some(_) => current = self.tree.parent_of(node_id),
                None => return false,
            }
        }
        false
    }

    /// Reassign a code block's language from picker input and sync.
    pub fn set_code_language(&mut self, block: NodeId, input: &str) -> bool {
        let Some(lang) = resolve_language_input(input) else {
            return false;
        };
        let theme = self.render_options.code_theme.clone();
        match self.tree.get_mut(block) {
            Some(node) if is_code_block(node) => set_code_block_language(node, &lang, &theme),
            _ => return false,
        }
        self.tree.adopt_new_nodes();
        self.scheduler.cancel(TaskKind::CodeBlockSync);
        self.sync_from_rich_view();
        true
    }

    /// Raw code of a code block container.
    pub fn code_block_source(&self, block: NodeId) -> Option<String> {
        let node = self.tree.get(block)?;
        is_code_block(node).then(|| code_block_text(node))
    }

    /// Copy a code block's raw code to the system clipboard.
    pub fn copy_code_block(&mut self, block: NodeId, now: Instant) -> Result<()> {
        let code = self
            .code_block_source(block)
            .ok_or_else(|| Error::Application("Not a code block".to_string()))?;
        match clipboard::copy_text(&code) {
            Ok(()) => {
                self.set_status("Code copied", now);
                Ok(())
            }
            Err(e) => {
                warn!("Copy failed: {}", e);
                self.set_status(format!("Copy failed: {}", e), now);
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image paste
    // ─────────────────────────────────────────────────────────────────────────

    /// The sink the settings select, or `None` (with a status message)
    /// when remote storage is not usable.
    fn image_sink<'s>(
        &mut self,
        local: &'s dyn ImageSink,
        remote: Option<&'s dyn ImageSink>,
        now: Instant,
    ) -> Option<&'s dyn ImageSink> {
        match self.settings.image_storage {
            ImageStorage::Local => Some(local),
            ImageStorage::Remote if !self.settings.has_remote_token() => {
                self.set_status("Configure an image host token in settings first", now);
                None
            }
            ImageStorage::Remote => {
                if remote.is_none() {
                    let err = Error::image_store(format!(
                        "no uploader available for {:?}",
                        self.settings.remote_host
                    ));
                    self.report_paste_failure(&err, now);
                }
                remote
            }
        }
    }

    fn report_paste_failure(&mut self, err: &Error, now: Instant) {
        warn!("Image paste failed: {}", err);
        self.set_status(format!("Image paste failed: {}", err), now);
    }

    /// Store pasted PNG bytes through the configured sink and insert a
    /// Markdown image at the cursor. The buffer is untouched on failure.
    pub fn paste_image(
        &mut self,
        png: &[u8],
        local: &dyn ImageSink,
        remote: Option<&dyn ImageSink>,
        now: Instant,
    ) -> bool {
        let Some(sink) = self.image_sink(local, remote, now) else {
            return false;
        };
        self.store_pasted_image(png, sink, now)
    }

    /// Paste the image currently on the system clipboard.
    pub fn paste_clipboard_image(
        &mut self,
        local: &dyn ImageSink,
        remote: Option<&dyn ImageSink>,
        now: Instant,
    ) -> bool {
        let Some(sink) = self.image_sink(local, remote, now) else {
            return false;
        };
        match clipboard::read_image_png() {
            Ok(png) => self.store_pasted_image(&png, sink, now),
            Err(e) => {
                self.report_paste_failure(&e, now);
                false
            }
        }
    }

    fn store_pasted_image(&mut self, png: &[u8], sink: &dyn ImageSink, now: Instant) -> bool {
        match sink.store(png, self.document_path.as_deref()) {
            Ok(url) => {
                self.flush_pending_rich_sync();
                self.insert_source_text(&format!("![image]({})", link_destination(&url)));
                self.set_status("Image inserted", now);
                true
            }
            Err(e) => {
                self.report_paste_failure(&e, now);
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scroll sync
    // ─────────────────────────────────────────────────────────────────────────

    fn scroll_sync_active(&self) -> bool {
        self.mode == EditMode::Source && self.geometry.layout == crate::preview::PaneLayout::Both
    }

    /// The source pane scrolled; returns the preview offset to apply.
    pub fn on_source_scroll(&mut self, source: ScrollMetrics, preview: ScrollMetrics) -> Option<f32> {
        let active = self.scroll_sync_active();
        self.scroll
            .on_scroll(ScrollOrigin::Source, source, preview, active)
    }

    /// The preview pane scrolled; returns the source offset to apply.
    pub fn on_preview_scroll(&mut self, preview: ScrollMetrics, source: ScrollMetrics) -> Option<f32> {
        let active = self.scroll_sync_active();
        self.scroll
            .on_scroll(ScrollOrigin::Preview, preview, source, active)
    }

    pub fn on_animation_frame(&mut self) {
        self.scroll.on_animation_frame();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn load(&mut self, text: String, path: Option<PathBuf>) {
        self.scheduler = Scheduler::new();
        self.state = SyncState::Idle;
        self.document_path = path;
        self.buffer.reset(text);
        self.stats = TextStats::from_text(self.buffer.text());
        self.render();
        self.modified = false;
    }

    pub fn new_document(&mut self, now: Instant) {
        self.load(String::new(), None);
        self.set_status("New document", now);
    }

    pub fn open_document(&mut self, text: String, path: Option<PathBuf>, now: Instant) {
        let name = path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        self.load(text, path);
        self.set_status(format!("Opened {}", name), now);
    }

    /// Record that the document was written to `path`.
    pub fn mark_saved(&mut self, path: PathBuf, now: Instant) {
        let moved = self.document_path.as_ref() != Some(&path);
        self.document_path = Some(path);
        self.modified = false;
        if moved {
            // Image sources resolve against the new directory.
            self.render();
        }
        self.set_status("File saved", now);
    }

    pub fn open_file(&mut self, store: &dyn DocumentStore, path: &Path, now: Instant) -> Result<()> {
        match store.open(path) {
            Ok(text) => {
                self.open_document(text, Some(path.to_path_buf()), now);
                Ok(())
            }
            Err(e) => {
                self.set_status(format!("Open failed: {}", e), now);
                Err(e)
            }
        }
    }

    /// Save to the current path, or to `path` when given ("Save As").
    pub fn save(&mut self, store: &dyn DocumentStore, path: Option<PathBuf>, now: Instant) -> Result<()> {
        let path = path.or_else(|| self.document_path.clone()).ok_or_else(|| {
            Error::Application("No file path set. Use 'Save As' instead.".to_string())
        })?;
        self.flush_pending_rich_sync();
        match store.save(&path, self.buffer.text()) {
            Ok(()) => {
                self.mark_saved(path, now);
                Ok(())
            }
            Err(e) => {
                self.set_status(format!("Save failed: {}", e), now);
                Err(e)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, TextPosition};
    use crate::editor::{IMAGE_WRAPPER_CLASS, TABLE_WRAPPER_CLASS};
    use crate::files::{FsDocumentStore, LocalImageSink};
    use crate::markdown::{is_code_block, render_markdown};
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::TempDir;

    const MS: Duration = Duration::from_millis(1);

    fn coordinator(md: &str) -> SyncCoordinator {
        let mut c = SyncCoordinator::default();
        c.open_document(md.to_string(), None, Instant::now());
        c
    }

    fn first_with_class(c: &SyncCoordinator, class: &str) -> NodeId {
        c.tree().root().find_class(class).unwrap().id
    }

    fn text_node(c: &SyncCoordinator, text: &str) -> NodeId {
        c.tree()
            .descendants()
            .find(|n| matches!(&n.kind, crate::document::NodeKind::Text(t) if t == text))
            .unwrap()
            .id
    }

    fn pipe_lines(source: &str) -> Vec<&str> {
        source
            .lines()
            .filter(|l| l.trim().starts_with('|') && l.trim().ends_with('|'))
            .collect()
    }

    fn structure(md: &str) -> Vec<String> {
        let tree = render_markdown(md, None, &RenderOptions::default());
        tree.descendants()
            .filter_map(|n| n.tag().map(str::to_string))
            .collect()
    }

    struct FakeSink {
        result: std::result::Result<String, String>,
        calls: RefCell<usize>,
    }

    impl ImageSink for FakeSink {
        fn store(&self, _png: &[u8], _document_path: Option<&Path>) -> Result<String> {
            *self.calls.borrow_mut() += 1;
            self.result.clone().map_err(Error::image_store)
        }
    }

    fn sink(result: std::result::Result<&str, &str>) -> FakeSink {
        FakeSink {
            result: result.map(str::to_string).map_err(str::to_string),
            calls: RefCell::new(0),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Source → tree
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_heading_and_bold_render() {
        let c = coordinator("# Title\n\nHello **world**");
        let root = c.tree().root();
        let h1: Vec<&Node> = root.descendants().filter(|n| n.is_tag("h1")).collect();
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].text_content(), "Title");
        let p = root.find_tag("p").unwrap();
        assert_eq!(p.find_tag("strong").unwrap().text_content(), "world");
    }

    #[test]
    fn test_source_edit_rerenders_and_updates_stats() {
        let mut c = coordinator("one");
        let renders = c.render_count();
        assert!(!c.is_modified());

        c.edit_source(|b| b.set_cursor(TextPosition::new(0, 3)));
        assert_eq!(c.render_count(), renders, "cursor moves do not render");

        assert!(c.insert_source_text(" two"));
        assert_eq!(c.render_count(), renders + 1);
        assert!(c.is_modified());
        assert_eq!(c.stats().words, 2);
        assert_eq!(c.title(), "Untitled*");
        assert!(c.html().contains("one two"));
    }

    #[test]
    fn test_format_command_in_source_mode() {
        let mut c = coordinator("word");
        c.edit_source(|b| b.set_selection(TextPosition::new(0, 0), TextPosition::new(0, 4)));
        assert!(c.format(MarkdownFormatCommand::Bold));
        assert_eq!(c.source(), "**word**");
        assert!(c.tree().root().find_tag("strong").is_some());

        c.set_mode(EditMode::Wysiwyg);
        assert!(!c.format(MarkdownFormatCommand::Italic));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rich view → source
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_rich_edit_syncs_after_debounce_without_rerender() {
        let mut c = coordinator("Hello world");
        c.set_mode(EditMode::Wysiwyg);
        let renders = c.render_count();
        let start = Instant::now();

        let id = text_node(&c, "Hello world");
        assert!(c.edit_rich_text(id, "Hello there", start));
        c.run_due_tasks(start + MS * 50);
        assert_eq!(c.source(), "Hello world", "debounce still pending");

        c.run_due_tasks(start + MS * 100);
        assert_eq!(c.source(), "Hello there");
        assert_eq!(c.render_count(), renders, "sync from rich view never renders");
        assert_eq!(c.sync_state(), SyncState::Idle);
        assert!(c.is_modified());
    }

    #[test]
    fn test_rich_input_burst_coalesces() {
        let mut c = coordinator("abc");
        c.set_mode(EditMode::Wysiwyg);
        let start = Instant::now();
        let id = text_node(&c, "abc");

        c.edit_rich_text(id, "abcd", start);
        c.edit_rich_text(id, "abcde", start + MS * 80);
        c.run_due_tasks(start + MS * 120);
        assert_eq!(c.source(), "abc");
        c.run_due_tasks(start + MS * 180);
        assert_eq!(c.source(), "abcde");
    }

    #[test]
    fn test_rich_input_ignored_in_source_mode() {
        let mut c = coordinator("abc");
        let start = Instant::now();
        c.on_rich_input(start);
        assert_eq!(c.next_deadline(), c.status.expires_at());
    }

    #[test]
    fn test_mode_switch_round_trip_keeps_source() {
        let md = "# Title\n\n- one\n- two\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n\n```rust\nfn main() {}\n```\n\n![x](pic.png?w=120)";
        let mut c = coordinator(md);
        assert!(c.set_mode(EditMode::Wysiwyg));
        assert!(c.tree().editable);
        assert!(c.set_mode(EditMode::Source));
        assert!(!c.tree().editable);
        assert_eq!(structure(c.source()), structure(md));
        assert!(c.source().contains("pic.png?w=120"));
        assert!(c.source().contains("```rust"));
    }

    #[test]
    fn test_same_mode_is_noop() {
        let mut c = coordinator("x");
        let renders = c.render_count();
        assert!(!c.set_mode(EditMode::Source));
        assert_eq!(c.render_count(), renders);
        assert_eq!(c.toggle_mode(), EditMode::Wysiwyg);
    }

    #[test]
    fn test_leaving_wysiwyg_flushes_pending_edit() {
        let mut c = coordinator("draft");
        c.set_mode(EditMode::Wysiwyg);
        let id = text_node(&c, "draft");
        c.edit_rich_text(id, "final", Instant::now());
        c.set_mode(EditMode::Source);
        assert_eq!(c.source(), "final");
        assert!(c.scheduler.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tables
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_template_then_append_row() {
        let mut c = coordinator("");
        assert!(c.insert_table_template());
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let now = Instant::now();

        let rebuilt = c.table_op(wrapper, TableOp::for_row_button(1), now).unwrap();
        let lines = pipe_lines(c.source());
        assert_eq!(lines.len(), 4);
        let cells = |l: &str| l.matches('|').count();
        assert!(lines.iter().all(|l| cells(l) == cells(lines[0])));
        assert_eq!(lines[3], "|   |   |   |");

        let table = c.tree().get(rebuilt).unwrap().find_tag("table").unwrap();
        assert_eq!(TableData::from_table_node(table).unwrap().row_count(), 3);
    }

    #[test]
    fn test_table_write_back_is_guarded_and_defers_renders() {
        let md = "intro\n\n| a | b |\n| --- | --- |\n| 1 | 2 |";
        let mut c = coordinator(md);
        let renders = c.render_count();
        let start = Instant::now();
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);

        c.table_op(wrapper, TableOp::DeleteColumn { column: 1 }, start).unwrap();
        assert_eq!(c.source(), "intro\n\n| a |\n| --- |\n| 1 |");
        assert_eq!(c.sync_state(), SyncState::ApplyingTableEdit);
        assert_eq!(c.render_count(), renders, "write-back does not re-render");

        c.edit_source(|b| b.set_cursor(TextPosition::new(0, 5)));
        c.insert_source_text("!");
        assert_eq!(c.render_count(), renders, "render deferred under guard");

        c.run_due_tasks(start + MS * 99);
        assert_eq!(c.sync_state(), SyncState::ApplyingTableEdit);
        c.run_due_tasks(start + MS * 100);
        assert_eq!(c.sync_state(), SyncState::Idle);
        assert_eq!(c.render_count(), renders + 1);
        assert!(c.html().contains("intro!"));
    }

    #[test]
    fn test_guard_release_without_pending_change_does_not_render() {
        let mut c = coordinator("| a | b |\n| --- | --- |\n| 1 | 2 |");
        let renders = c.render_count();
        let start = Instant::now();
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        c.table_op(wrapper, TableOp::AppendRow, start);
        c.run_due_tasks(start + MS * 200);
        assert_eq!(c.render_count(), renders);
    }

    #[test]
    fn test_refused_table_op_leaves_source() {
        let md = "| a |\n| --- |\n| 1 |";
        let mut c = coordinator(md);
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let now = Instant::now();
        assert!(c.table_op(wrapper, TableOp::DeleteRow { row: 1 }, now).is_none());
        assert!(c.table_op(wrapper, TableOp::DeleteColumn { column: 0 }, now).is_none());
        assert_eq!(c.source(), md);
        assert_eq!(c.sync_state(), SyncState::Idle);
    }

    #[test]
    fn test_table_missing_from_source_is_noop() {
        let mut c = coordinator("| a |\n| --- |\n| 1 |");
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        c.buffer.reset("no tables here");
        let now = Instant::now();
        assert!(c.table_op(wrapper, TableOp::AppendRow, now).is_none());
        assert_eq!(c.source(), "no tables here");
        assert_eq!(c.sync_state(), SyncState::Idle);
    }

    #[test]
    fn test_second_table_is_located_by_ordinal() {
        let md = "| a |\n| --- |\n| 1 |\n\n| b |\n| --- |\n| 2 |";
        let mut c = coordinator(md);
        let wrappers: Vec<NodeId> = c
            .tree()
            .descendants()
            .filter(|n| n.has_class(TABLE_WRAPPER_CLASS))
            .map(|n| n.id)
            .collect();
        c.table_op(wrappers[1], TableOp::AppendRow, Instant::now());
        assert_eq!(
            c.source(),
            "| a |\n| --- |\n| 1 |\n\n| b |\n| --- |\n| 2 |\n|   |"
        );
    }

    #[test]
    fn test_cell_edit_writes_back() {
        let mut c = coordinator("| a | b |\n| --- | --- |\n| 1 | 2 |");
        let now = Instant::now();
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let cell = c.table_cell_id(wrapper, CellPosition::new(1, 1)).unwrap();
        c.tree_mut().get_mut(cell).unwrap().children[0] = Node::element("em").with_child(Node::text("x|y"));
        c.tree_mut().adopt_new_nodes();

        assert!(c.table_cell_edited(cell, now));
        assert_eq!(c.source(), "| a | b |\n| --- | --- |\n| 1 | *x\\|y* |");
    }

    fn table_wrappers(c: &SyncCoordinator) -> Vec<NodeId> {
        c.tree()
            .descendants()
            .filter(|n| n.has_class(TABLE_WRAPPER_CLASS))
            .map(|n| n.id)
            .collect()
    }

    #[test]
    fn test_quoted_table_does_not_shift_later_tables() {
        let md = "> | q |\n> | --- |\n> | 0 |\n\n| a |\n| --- |\n| 1 |\n\n| b |\n| --- |\n| 2 |";
        let mut c = coordinator(md);
        let wrappers = table_wrappers(&c);
        assert_eq!(wrappers.len(), 2);

        c.table_op(wrappers[0], TableOp::AppendRow, Instant::now()).unwrap();
        assert_eq!(
            c.source(),
            "> | q |\n> | --- |\n> | 0 |\n\n| a |\n| --- |\n| 1 |\n|   |\n\n| b |\n| --- |\n| 2 |"
        );
    }

    #[test]
    fn test_quoted_table_cell_edit_is_noop() {
        let md = "> | q |\n> | --- |\n> | 0 |\n\n| a |\n| --- |\n| 1 |";
        let mut c = coordinator(md);
        let quoted_cell = text_node(&c, "0");
        assert!(!c.table_cell_edited(quoted_cell, Instant::now()));
        assert_eq!(c.source(), md);
        assert!(!c.is_modified());
    }

    #[test]
    fn test_table_in_list_item_keeps_indentation() {
        let mut c = coordinator("- item\n\n  | a |\n  | --- |\n  | 1 |");
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        c.table_op(wrapper, TableOp::AppendRow, Instant::now()).unwrap();
        assert_eq!(c.source(), "- item\n\n  | a |\n  | --- |\n  | 1 |\n  |   |");
    }

    #[test]
    fn test_unchanged_cell_edit_does_not_mark_modified() {
        let md = "| a | b |\n| --- | --- |\n| 1 | 2 |";
        let mut c = coordinator(md);
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let cell = c.table_cell_id(wrapper, CellPosition::new(1, 0)).unwrap();
        assert!(c.table_cell_edited(cell, Instant::now()));
        assert_eq!(c.source(), md);
        assert!(!c.is_modified());
    }

    #[test]
    fn test_table_menu_action() {
        let mut c = coordinator("| a | b |\n| --- | --- |\n| 1 | 2 |");
        let now = Instant::now();
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let cell = c.table_cell_id(wrapper, CellPosition::new(1, 0)).unwrap();

        let rebuilt = c
            .table_menu_action(cell, TableMenuAction::AddColumnRight, now)
            .unwrap();
        assert_eq!(
            c.source(),
            "| a |   | b |\n| --- | --- | --- |\n| 1 |   | 2 |"
        );

        let header = c.table_cell_id(rebuilt, CellPosition::new(0, 0)).unwrap();
        assert!(c
            .table_menu_action(header, TableMenuAction::DeleteRow, now)
            .is_none());
    }

    #[test]
    fn test_tab_on_last_cell_appends_row() {
        let mut c = coordinator("| a | b |\n| --- | --- |\n| 1 | 2 |");
        let now = Instant::now();
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let last = c.table_cell_id(wrapper, CellPosition::new(1, 1)).unwrap();

        let result = c.table_key(last, TableKey::Tab, CaretEdge::default(), now);
        let TableKeyResult::Focus(focus) = result else {
            panic!("expected focus, got {:?}", result);
        };
        assert_eq!(pipe_lines(c.source()).len(), 4);

        let wrapper = enclosing_wrapper(c.tree(), focus).unwrap();
        let table = c.tree().get(wrapper).unwrap().find_tag("table").unwrap();
        assert_eq!(cell_position(table, focus), Some(CellPosition::new(2, 0)));
    }

    #[test]
    fn test_arrow_in_middle_of_text_is_ignored() {
        let mut c = coordinator("| abc |\n| --- |\n| 1 |");
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let cell = c.table_cell_id(wrapper, CellPosition::new(0, 0)).unwrap();
        let caret = CaretEdge::from_offset(1, 3);
        assert_eq!(
            c.table_key(cell, TableKey::ArrowDown, caret, Instant::now()),
            TableKeyResult::Ignored
        );
    }

    #[test]
    fn test_column_resize_is_visual_only() {
        let md = "| a |\n| --- |\n| 1 |";
        let mut c = coordinator(md);
        let wrapper = first_with_class(&c, TABLE_WRAPPER_CLASS);
        let rebuilt = c.resize_table_column(wrapper, 0, 20).unwrap();
        let th = c.tree().get(rebuilt).unwrap().find_tag("th").unwrap();
        assert_eq!(th.style_width_px(), Some(50));
        assert_eq!(c.source(), md);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Images
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_image_resize_replaces_suffix() {
        let mut c = coordinator("![x](pic.png)");
        let wrapper = first_with_class(&c, IMAGE_WRAPPER_CLASS);
        assert!(c.set_image_width(wrapper, 240));
        assert_eq!(c.source(), "![x](pic.png?w=240)");

        let wrapper = first_with_class(&c, IMAGE_WRAPPER_CLASS);
        assert!(c.set_image_width(wrapper, 100));
        assert_eq!(c.source(), "![x](pic.png?w=100)");

        let img = c.tree().root().find_tag("img").unwrap();
        assert_eq!(img.style_width_px(), Some(100));
    }

    #[test]
    fn test_image_drag_updates_every_occurrence() {
        let mut c = coordinator("![a](pic.png) and ![b](pic.png?w=10)");
        let img = c.tree().root().find_tag("img").unwrap().id;
        assert!(c.begin_image_drag(img, 200.0, 100.0));
        assert_eq!(c.drag_image(40.0, 0.0).as_deref(), Some("240 × 120"));
        assert!(c.end_image_drag());
        assert_eq!(c.source(), "![a](pic.png?w=240) and ![b](pic.png?w=240)");
    }

    #[test]
    fn test_image_in_document_directory() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("notes.md");
        let mut c = SyncCoordinator::default();
        c.open_document("![x](image/a.png)".to_string(), Some(doc), Instant::now());

        let img = c.tree().root().find_tag("img").unwrap();
        assert!(img.attr("src").unwrap().starts_with("file://"));
        let wrapper = first_with_class(&c, IMAGE_WRAPPER_CLASS);
        assert!(c.set_image_width(wrapper, 64));
        assert_eq!(c.source(), "![x](image/a.png?w=64)");
    }

    #[test]
    fn test_round_trip_in_directory_with_spaces() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("My Notes");
        std::fs::create_dir(&notes).unwrap();
        let md = "![x](pic.png)\n\n![y](<my pic.png>)";
        let mut c = SyncCoordinator::default();
        c.open_document(md.to_string(), Some(notes.join("notes.md")), Instant::now());

        c.set_mode(EditMode::Wysiwyg);
        c.set_mode(EditMode::Source);
        assert_eq!(c.source(), md);

        let wrappers: Vec<NodeId> = c
            .tree()
            .descendants()
            .filter(|n| n.has_class(IMAGE_WRAPPER_CLASS))
            .map(|n| n.id)
            .collect();
        assert!(c.set_image_width(wrappers[1], 64));
        assert_eq!(c.source(), "![x](pic.png)\n\n![y](<my pic.png?w=64>)");

        c.set_mode(EditMode::Wysiwyg);
        c.set_mode(EditMode::Source);
        assert_eq!(c.source(), "![x](pic.png)\n\n![y](<my pic.png?w=64>)");
    }

    #[test]
    fn test_image_removed_from_source_is_noop() {
        let mut c = coordinator("![x](pic.png)");
        let wrapper = first_with_class(&c, IMAGE_WRAPPER_CLASS);
        c.buffer.reset("text only");
        assert!(!c.set_image_width(wrapper, 80));
        assert_eq!(c.source(), "text only");
    }

    #[test]
    fn test_image_resize_in_wysiwyg_flushes_pending_edit() {
        let mut c = coordinator("caption\n\n![x](pic.png)");
        c.set_mode(EditMode::Wysiwyg);
        let id = text_node(&c, "caption");
        c.edit_rich_text(id, "edited", Instant::now());

        let wrapper = first_with_class(&c, IMAGE_WRAPPER_CLASS);
        assert!(c.set_image_width(wrapper, 90));
        assert_eq!(c.source(), "edited\n\n![x](pic.png?w=90)");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code blocks
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_code_language_change_syncs_in_source_mode() {
        let mut c = coordinator("```\nlet x = 1;\n```");
        let block = c.tree().descendants().find(|n| is_code_block(n)).unwrap().id;
        assert!(c.set_code_language(block, "Rust"));
        assert_eq!(c.source(), "```rust\nlet x = 1;\n```");
        assert_eq!(c.code_block_source(block).as_deref(), Some("let x = 1;\n"));
    }

    #[test]
    fn test_code_block_typing_syncs_in_source_mode() {
        let mut c = coordinator("```js\na\n```");
        let start = Instant::now();
        let block = c.tree().descendants().find(|n| is_code_block(n)).unwrap().id;
        let code = c.tree().get(block).unwrap().find_tag("code").unwrap().id;

        assert!(c.edit_rich_text(code, "b\n", start));
        c.run_due_tasks(start + MS * 100);
        assert_eq!(c.source(), "```js\nb\n```");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image paste
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_paste_with_local_sink() {
        let mut c = coordinator("");
        let now = Instant::now();
        let local = sink(Ok("image/image-1.png"));
        assert!(c.paste_image(b"png", &local, None, now));
        assert_eq!(c.source(), "![image](image/image-1.png)");
        assert_eq!(c.status_text(now), "Image inserted");
        assert!(c.tree().root().find_tag("img").is_some());
        assert!(c.is_modified());
    }

    #[test]
    fn test_pasted_path_with_spaces_is_bracketed() {
        let mut c = coordinator("");
        let local = sink(Ok("/home/me/My Pictures/image-1.png"));
        assert!(c.paste_image(b"png", &local, None, Instant::now()));
        assert_eq!(c.source(), "![image](</home/me/My Pictures/image-1.png>)");
        assert!(c.tree().root().find_tag("img").is_some());
    }

    #[test]
    fn test_paste_failure_leaves_buffer() {
        let mut c = coordinator("keep");
        let now = Instant::now();
        let local = sink(Err("disk full"));
        assert!(!c.paste_image(b"png", &local, None, now));
        assert_eq!(c.source(), "keep");
        assert!(c.status_text(now).starts_with("Image paste failed:"));
        assert!(c.status_text(now).contains("disk full"));
    }

    #[test]
    fn test_remote_paste_requires_token() {
        let settings = Settings {
            image_storage: ImageStorage::Remote,
            ..Settings::default()
        };
        let mut c = SyncCoordinator::new(settings);
        let now = Instant::now();
        let local = sink(Ok("local.png"));
        let remote = sink(Ok("https://img.test/a.png"));

        assert!(!c.paste_image(b"png", &local, Some(&remote), now));
        assert_eq!(
            c.status_text(now),
            "Configure an image host token in settings first"
        );
        assert_eq!(*remote.calls.borrow(), 0);
        assert_eq!(*local.calls.borrow(), 0);
        assert_eq!(c.source(), "");
    }

    #[test]
    fn test_remote_paste_with_token() {
        let settings = Settings {
            image_storage: ImageStorage::Remote,
            remote_token: "secret".to_string(),
            ..Settings::default()
        };
        let mut c = SyncCoordinator::new(settings);
        let now = Instant::now();
        let local = sink(Ok("local.png"));
        let remote = sink(Ok("https://img.test/a.png"));
        assert!(c.paste_image(b"png", &local, Some(&remote), now));
        assert_eq!(c.source(), "![image](https://img.test/a.png)");
    }

    #[test]
    fn test_paste_into_real_directory() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("notes.md");
        let mut c = SyncCoordinator::default();
        let now = Instant::now();
        c.open_document(String::new(), Some(doc), now);
        assert!(c.paste_image(b"png", &LocalImageSink::new(), None, now));
        assert!(c.source().starts_with("![image](image/image-"));
        let img = c.tree().root().find_tag("img").unwrap();
        assert!(img.attr("src").unwrap().starts_with("file://"));
    }

    #[test]
    fn test_clipboard_paste_checks_remote_token_first() {
        let settings = Settings {
            image_storage: ImageStorage::Remote,
            ..Settings::default()
        };
        let mut c = SyncCoordinator::new(settings);
        let now = Instant::now();
        let local = sink(Ok("local.png"));
        assert!(!c.paste_clipboard_image(&local, None, now));
        assert_eq!(
            c.status_text(now),
            "Configure an image host token in settings first"
        );
        assert_eq!(*local.calls.borrow(), 0);
    }

    #[test]
    fn test_clipboard_paste_outcome_is_reported() {
        let mut c = coordinator("keep");
        let now = Instant::now();
        let local = sink(Ok("image/image-1.png"));
        // Headless machines have no clipboard; either branch must be consistent.
        if c.paste_clipboard_image(&local, None, now) {
            assert!(c.source().contains("![image](image/image-1.png)"));
            assert_eq!(c.status_text(now), "Image inserted");
        } else {
            assert_eq!(c.source(), "keep");
            assert!(c.status_text(now).starts_with("Image paste failed:"));
            assert_eq!(*local.calls.borrow(), 0);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scroll, status and lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_scroll_sync_only_in_source_both_layout() {
        let mut c = coordinator("x");
        let source = ScrollMetrics::new(100.0, 300.0, 100.0);
        let preview = ScrollMetrics::new(0.0, 500.0, 100.0);

        assert_eq!(c.on_source_scroll(source, preview), Some(200.0));
        assert_eq!(c.on_preview_scroll(preview, source), None);
        c.on_animation_frame();

        c.geometry_mut().cycle_layout();
        assert_eq!(c.on_source_scroll(source, preview), None);
        c.geometry_mut().layout = crate::preview::PaneLayout::Both;
        c.set_mode(EditMode::Wysiwyg);
        assert_eq!(c.on_source_scroll(source, preview), None);
    }

    #[test]
    fn test_status_reverts() {
        let mut c = coordinator("x");
        let start = Instant::now();
        c.set_status("Hello", start);
        assert_eq!(c.next_deadline(), Some(start + Duration::from_millis(3000)));
        c.run_due_tasks(start + Duration::from_millis(3000));
        assert_eq!(c.status_text(start + Duration::from_millis(3000)), "Ready");
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        let store = FsDocumentStore;
        let now = Instant::now();

        let mut c = SyncCoordinator::default();
        c.new_document(now);
        c.insert_source_text("# Saved");
        assert!(c.save(&store, None, now).is_err(), "no path yet");
        c.save(&store, Some(path.clone()), now).unwrap();
        assert!(!c.is_modified());
        assert_eq!(c.title(), "doc.md");
        assert_eq!(c.status_text(now), "File saved");

        let mut other = SyncCoordinator::default();
        other.open_file(&store, &path, now).unwrap();
        assert_eq!(other.source(), "# Saved");
        assert_eq!(other.status_text(now), "Opened doc.md");
        assert!(other.open_file(&store, &dir.path().join("nope.md"), now).is_err());
    }
}
