//! Table structural editor
//!
//! A rendered `table` is lifted into a [`TableData`] model, edited there
//! (row/column insert and delete, cell content, visual resizing) and then
//! written two ways: back into the Markdown source as a rebuilt GFM table,
//! and back into the rendered tree as a fresh editor wrapper that replaces
//! only the affected node.
//!
//! Logical `(row, col)` coordinates are never stored on the nodes; they
//! are recomputed from tree position with [`cell_position`] whenever they
//! are needed. Row 0 is always the header.

use crate::document::{Node, NodeId, RenderedTree};
use crate::editor::is_scaffold_only;
use crate::markdown::renderer::{TableAlignment, SOURCE_LINE_ATTR};
use crate::markdown::serializer::{format_separator_row, format_table_row, serialize_cell};
use log::debug;
use std::ops::Range;

// ─────────────────────────────────────────────────────────────────────────────
// Scaffolding vocabulary
// ─────────────────────────────────────────────────────────────────────────────

pub const TABLE_WRAPPER_CLASS: &str = "table-editor-wrapper";
pub const ROW_CONTROLS_CLASS: &str = "table-row-controls";
pub const COL_CONTROLS_CLASS: &str = "table-col-controls";
pub const CONTEXT_MENU_CLASS: &str = "table-context-menu";
pub const ADD_BUTTON_CLASS: &str = "table-add-btn";
pub const COL_RESIZER_CLASS: &str = "col-resizer";
pub const ROW_RESIZER_CLASS: &str = "row-resizer";
pub const TABLE_INDEX_ATTR: &str = "data-table-index";

pub const MIN_COLUMN_WIDTH: u32 = 50;
pub const MIN_ROW_HEIGHT: u32 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPosition {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPosition {
    Left,
    Right,
}

/// A structural table edit. Row and column indices are model indices
/// (row 0 is the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    InsertRow { row: usize, position: RowPosition },
    InsertColumn { column: usize, position: ColumnPosition },
    DeleteRow { row: usize },
    DeleteColumn { column: usize },
    AppendRow,
}

impl TableOp {
    /// Operation behind the `index`-th button of the row control bar.
    /// Button 0 sits above the first body row, button `i` below body row `i`.
    pub fn for_row_button(index: usize) -> Self {
        if index == 0 {
            TableOp::InsertRow {
                row: 1,
                position: RowPosition::Above,
            }
        } else {
            TableOp::InsertRow {
                row: index,
                position: RowPosition::Below,
            }
        }
    }

    /// Operation behind the `index`-th button of the column control bar.
    pub fn for_column_button(index: usize) -> Self {
        if index == 0 {
            TableOp::InsertColumn {
                column: 0,
                position: ColumnPosition::Left,
            }
        } else {
            TableOp::InsertColumn {
                column: index - 1,
                position: ColumnPosition::Right,
            }
        }
    }
}

/// Entries of the table context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMenuAction {
    AddRowAbove,
    AddRowBelow,
    AddColumnLeft,
    AddColumnRight,
    DeleteRow,
    DeleteColumn,
}

impl TableMenuAction {
    pub const ALL: [TableMenuAction; 6] = [
        TableMenuAction::AddRowAbove,
        TableMenuAction::AddRowBelow,
        TableMenuAction::AddColumnLeft,
        TableMenuAction::AddColumnRight,
        TableMenuAction::DeleteRow,
        TableMenuAction::DeleteColumn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TableMenuAction::AddRowAbove => "Insert row above",
            TableMenuAction::AddRowBelow => "Insert row below",
            TableMenuAction::AddColumnLeft => "Insert column left",
            TableMenuAction::AddColumnRight => "Insert column right",
            TableMenuAction::DeleteRow => "Delete row",
            TableMenuAction::DeleteColumn => "Delete column",
        }
    }

    pub fn is_destructive(self) -> bool {
        matches!(self, TableMenuAction::DeleteRow | TableMenuAction::DeleteColumn)
    }

    /// The operation this entry performs on the focused cell.
    pub fn op_at(self, pos: CellPosition) -> TableOp {
        match self {
            TableMenuAction::AddRowAbove => TableOp::InsertRow {
                row: pos.row,
                position: RowPosition::Above,
            },
            TableMenuAction::AddRowBelow => TableOp::InsertRow {
                row: pos.row,
                position: RowPosition::Below,
            },
            TableMenuAction::AddColumnLeft => TableOp::InsertColumn {
                column: pos.col,
                position: ColumnPosition::Left,
            },
            TableMenuAction::AddColumnRight => TableOp::InsertColumn {
                column: pos.col,
                position: ColumnPosition::Right,
            },
            TableMenuAction::DeleteRow => TableOp::DeleteRow { row: pos.row },
            TableMenuAction::DeleteColumn => TableOp::DeleteColumn { column: pos.col },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table model
// ─────────────────────────────────────────────────────────────────────────────

/// Content of one cell, kept as inline nodes so formatting survives edits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCellData {
    pub content: Vec<Node>,
}

impl TableCellData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The cell as it is written inside a Markdown table row.
    pub fn markdown(&self) -> String {
        serialize_cell(&self.content)
    }

    pub fn text(&self) -> String {
        self.content.iter().map(Node::text_content).collect()
    }
}

/// Editable table model (first row is the header).
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub rows: Vec<Vec<TableCellData>>,
    pub alignments: Vec<TableAlignment>,
    pub num_columns: usize,
    /// Visual column widths; not representable in Markdown
    pub column_widths: Vec<Option<u32>>,
    /// Visual row heights; not representable in Markdown
    pub row_heights: Vec<Option<u32>>,
}

impl TableData {
    /// Create an empty table with the given dimensions (header included).
    pub fn new(num_columns: usize, num_rows: usize) -> Self {
        let num_columns = num_columns.max(1);
        let num_rows = num_rows.max(1);
        Self {
            rows: (0..num_rows)
                .map(|_| vec![TableCellData::empty(); num_columns])
                .collect(),
            alignments: vec![TableAlignment::None; num_columns],
            num_columns,
            column_widths: vec![None; num_columns],
            row_heights: vec![None; num_rows],
        }
    }

    /// Lift a rendered `table` element into a model.
    ///
    /// Editor scaffolding inside cells is ignored. Short rows are padded
    /// with empty cells so every row has the header's width.
    pub fn from_table_node(table: &Node) -> Option<Self> {
        let row_nodes = table_rows(table);
        if row_nodes.is_empty() {
            return None;
        }

        let mut rows: Vec<Vec<TableCellData>> = row_nodes
            .iter()
            .map(|row| {
                row_cells(row)
                    .map(|cell| TableCellData {
                        content: cell
                            .children
                            .iter()
                            .filter(|c| !is_scaffold_only(c))
                            .cloned()
                            .collect(),
                    })
                    .collect()
            })
            .collect();

        let num_columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut rows {
            row.resize(num_columns, TableCellData::empty());
        }

        let header: Vec<&Node> = row_cells(row_nodes[0]).collect();
        let alignments = (0..num_columns)
            .map(|c| {
                header
                    .get(c)
                    .map(|cell| TableAlignment::from_attr(cell.attr("align")))
                    .unwrap_or_default()
            })
            .collect();
        let column_widths = (0..num_columns)
            .map(|c| header.get(c).and_then(|cell| cell.style_width_px()))
            .collect();
        let row_heights = row_nodes.iter().map(|row| row.style_px("height")).collect();

        Some(Self {
            rows,
            alignments,
            num_columns,
            column_widths,
            row_heights,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn body_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    fn empty_row(&self) -> Vec<TableCellData> {
        vec![TableCellData::empty(); self.num_columns]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structural edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `op`. Returns `false` when the operation is refused.
    pub fn apply(&mut self, op: TableOp) -> bool {
        match op {
            TableOp::InsertRow { row, position } => self.insert_row(row, position),
            TableOp::InsertColumn { column, position } => self.insert_column(column, position),
            TableOp::DeleteRow { row } => self.delete_row(row),
            TableOp::DeleteColumn { column } => self.delete_column(column),
            TableOp::AppendRow => {
                self.append_row();
                true
            }
        }
    }

    /// Insert an empty body row next to `row`. Inserting next to the
    /// header creates the first body row.
    pub fn insert_row(&mut self, row: usize, position: RowPosition) -> bool {
        if row >= self.rows.len() {
            return false;
        }
        let index = match position {
            RowPosition::Above => row,
            RowPosition::Below => row + 1,
        }
        .max(1);
        let new_row = self.empty_row();
        self.rows.insert(index, new_row);
        self.row_heights.insert(index.min(self.row_heights.len()), None);
        true
    }

    pub fn append_row(&mut self) {
        let new_row = self.empty_row();
        self.rows.push(new_row);
        self.row_heights.push(None);
    }

    pub fn insert_column(&mut self, column: usize, position: ColumnPosition) -> bool {
        if column >= self.num_columns {
            return false;
        }
        let index = match position {
            ColumnPosition::Left => column,
            ColumnPosition::Right => column + 1,
        };
        for row in &mut self.rows {
            row.insert(index, TableCellData::empty());
        }
        self.alignments.insert(index, TableAlignment::None);
        self.column_widths.insert(index, None);
        self.num_columns += 1;
        true
    }

    /// Delete a body row. The header and the last body row are kept.
    pub fn delete_row(&mut self, row: usize) -> bool {
        if row == 0 || row >= self.rows.len() || self.rows.len() <= 2 {
            return false;
        }
        self.rows.remove(row);
        if row < self.row_heights.len() {
            self.row_heights.remove(row);
        }
        true
    }

    /// Delete a column unless it is the only one.
    pub fn delete_column(&mut self, column: usize) -> bool {
        if self.num_columns <= 1 || column >= self.num_columns {
            return false;
        }
        for row in &mut self.rows {
            if column < row.len() {
                row.remove(column);
            }
        }
        self.alignments.remove(column);
        self.column_widths.remove(column);
        self.num_columns -= 1;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Visual edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a column width, clamped to [`MIN_COLUMN_WIDTH`].
    pub fn resize_column(&mut self, column: usize, width: u32) -> Option<u32> {
        let slot = self.column_widths.get_mut(column)?;
        let width = width.max(MIN_COLUMN_WIDTH);
        *slot = Some(width);
        Some(width)
    }

    /// Set a body row height, clamped to [`MIN_ROW_HEIGHT`].
    pub fn resize_row(&mut self, row: usize, height: u32) -> Option<u32> {
        if row == 0 {
            return None;
        }
        let slot = self.row_heights.get_mut(row)?;
        let height = height.max(MIN_ROW_HEIGHT);
        *slot = Some(height);
        Some(height)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────

    /// The table as GFM source lines: header, separator, body rows.
    pub fn to_markdown_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (i, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(TableCellData::markdown).collect();
            lines.push(format_table_row(&cells));
            if i == 0 {
                lines.push(format_separator_row(&self.alignments));
            }
        }
        lines
    }

    pub fn to_markdown(&self) -> String {
        self.to_markdown_lines().join("\n")
    }

    fn build_cell(&self, row: usize, col: usize) -> Node {
        let tag = if row == 0 { "th" } else { "td" };
        let mut cell = Node::element(tag).with_attr("contenteditable", "true");
        if let Some(align) = self.alignments.get(col).and_then(|a| a.as_attr()) {
            cell.set_attr("align", align);
        }
        if let Some(width) = self.column_widths.get(col).copied().flatten() {
            cell.set_style("width", &format!("{}px", width));
            cell.set_style("min-width", &format!("{}px", width));
        }
        if let Some(height) = self.row_heights.get(row).copied().flatten() {
            cell.set_style("height", &format!("{}px", height));
        }
        cell.children = self.rows[row][col].content.clone();

        if row == 0 {
            cell.children.push(
                Node::element("div")
                    .with_class(COL_RESIZER_CLASS)
                    .with_attr("data-col-index", col.to_string()),
            );
        } else if col == 0 {
            cell.children.push(
                Node::element("div")
                    .with_class(ROW_RESIZER_CLASS)
                    .with_attr("data-row-index", row.to_string()),
            );
        }
        cell
    }

    fn build_row(&self, row: usize) -> Node {
        let mut tr = Node::element("tr");
        if let Some(height) = self.row_heights.get(row).copied().flatten() {
            tr.set_style("height", &format!("{}px", height));
        }
        tr.with_children((0..self.num_columns).map(|col| self.build_cell(row, col)))
    }

    /// The bare `table` element with editable cells and resize handles.
    pub fn build_table_node(&self) -> Node {
        let mut table = Node::element("table")
            .with_child(Node::element("thead").with_child(self.build_row(0)));
        if self.rows.len() > 1 {
            table.children.push(
                Node::element("tbody")
                    .with_children((1..self.rows.len()).map(|row| self.build_row(row))),
            );
        }
        table
    }

    /// The full editor wrapper: table plus row and column control bars.
    pub fn build_editor(&self, index: usize) -> Node {
        let row_controls = Node::element("div")
            .with_class(ROW_CONTROLS_CLASS)
            .with_children((0..=self.body_row_count()).map(|i| {
                Node::element("button")
                    .with_attr("class", format!("{} row-add-btn", ADD_BUTTON_CLASS))
                    .with_attr("title", "Insert row")
                    .with_attr("data-row-index", i.to_string())
                    .with_child(Node::text("+"))
            }));
        let col_controls = Node::element("div")
            .with_class(COL_CONTROLS_CLASS)
            .with_children((0..=self.num_columns).map(|i| {
                Node::element("button")
                    .with_attr("class", format!("{} col-add-btn", ADD_BUTTON_CLASS))
                    .with_attr("title", "Insert column")
                    .with_attr("data-col-index", i.to_string())
                    .with_child(Node::text("+"))
            }));

        Node::element("div")
            .with_class(TABLE_WRAPPER_CLASS)
            .with_attr(TABLE_INDEX_ATTR, index.to_string())
            .with_child(self.build_table_node())
            .with_child(row_controls)
            .with_child(col_controls)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree helpers
// ─────────────────────────────────────────────────────────────────────────────

fn table_rows(table: &Node) -> Vec<&Node> {
    let mut rows = Vec::new();
    for child in &table.children {
        if child.is_tag("tr") {
            rows.push(child);
        } else if child.is_tag("thead") || child.is_tag("tbody") || child.is_tag("tfoot") {
            rows.extend(child.children.iter().filter(|r| r.is_tag("tr")));
        }
    }
    rows
}

fn row_cells(row: &Node) -> impl Iterator<Item = &Node> {
    row.children
        .iter()
        .filter(|c| c.is_tag("th") || c.is_tag("td"))
}

/// Wrap every not-yet-wrapped table in `tree` with editor scaffolding.
///
/// A table is numbered by the pipe run in `source` that starts on its
/// first line, the same ordinal [`locate_table_span`] resolves. Tables
/// that start no run (inside a blockquote, or written without leading
/// pipes) cannot be written back and are left without an editor.
pub fn attach_table_editors(tree: &mut RenderedTree, source: &str) {
    let runs = table_runs(source);
    let tables: Vec<(NodeId, Option<usize>)> = tree
        .descendants()
        .filter(|n| n.is_tag("table"))
        .map(|n| {
            let line = n.attr(SOURCE_LINE_ATTR).and_then(|l| l.parse::<usize>().ok());
            (n.id, line)
        })
        .collect();

    for (id, line) in tables {
        let index = line
            .and_then(|l| l.checked_sub(1))
            .and_then(|l| runs.iter().position(|run| run.start == l));
        let Some(index) = index else {
            debug!("Table at source line {:?} starts no pipe run; no editor", line);
            continue;
        };
        let already_wrapped = tree
            .parent_of(id)
            .and_then(|p| tree.get(p))
            .is_some_and(|p| p.has_class(TABLE_WRAPPER_CLASS));
        if already_wrapped {
            continue;
        }
        let Some(model) = tree.get(id).and_then(TableData::from_table_node) else {
            continue;
        };
        tree.replace(id, model.build_editor(index));
    }
}

/// The table editor wrapper containing `id` (or `id` itself).
pub fn enclosing_wrapper(tree: &RenderedTree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        if tree.get(current)?.has_class(TABLE_WRAPPER_CLASS) {
            return Some(current);
        }
        current = tree.parent_of(current)?;
    }
}

/// Ordinal of a table editor wrapper among the document's tables.
pub fn wrapper_index(wrapper: &Node) -> Option<usize> {
    wrapper.attr(TABLE_INDEX_ATTR)?.parse().ok()
}

/// Logical coordinates of the cell that is, or contains, node `id`.
pub fn cell_position(table: &Node, id: NodeId) -> Option<CellPosition> {
    table_rows(table)
        .into_iter()
        .enumerate()
        .find_map(|(row, tr)| {
            row_cells(tr)
                .position(|cell| cell.id == id || cell.find(id).is_some())
                .map(|col| CellPosition { row, col })
        })
}

/// Node id of the cell at `pos`.
pub fn cell_id_at(table: &Node, pos: CellPosition) -> Option<NodeId> {
    let rows = table_rows(table);
    let cell = row_cells(rows.get(pos.row)?).nth(pos.col)?;
    Some(cell.id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboard navigation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey {
    Tab,
    ShiftTab,
    Enter,
    ShiftEnter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

/// Where the caret sits inside the focused cell's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaretEdge {
    pub at_start: bool,
    pub at_end: bool,
}

impl CaretEdge {
    pub fn from_offset(offset: usize, cell_len: usize) -> Self {
        Self {
            at_start: offset == 0,
            at_end: offset >= cell_len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Move focus to this cell
    Focus(CellPosition),
    /// Append a body row, then focus this cell (first cell of the new row)
    AppendRowAndFocus(CellPosition),
    /// Key handled, focus stays
    Consumed,
    /// Key not handled; normal in-cell editing applies
    Ignored,
}

/// Decide what a key press in cell `from` of a `rows` x `cols` table does.
pub fn navigate(
    rows: usize,
    cols: usize,
    from: CellPosition,
    key: TableKey,
    caret: CaretEdge,
) -> NavigationOutcome {
    if rows == 0 || cols == 0 {
        return NavigationOutcome::Ignored;
    }
    let total = rows * cols;
    let index = from.row * cols + from.col;
    let at = |i: usize| CellPosition::new(i / cols, i % cols);

    match key {
        TableKey::Tab => {
            if index + 1 < total {
                NavigationOutcome::Focus(at(index + 1))
            } else {
                NavigationOutcome::AppendRowAndFocus(CellPosition::new(rows, 0))
            }
        }
        TableKey::ShiftTab => match index.checked_sub(1) {
            Some(prev) => NavigationOutcome::Focus(at(prev)),
            None => NavigationOutcome::Consumed,
        },
        TableKey::Enter => {
            if index + cols < total {
                NavigationOutcome::Focus(at(index + cols))
            } else {
                NavigationOutcome::Consumed
            }
        }
        TableKey::ShiftEnter => NavigationOutcome::Ignored,
        TableKey::ArrowUp if caret.at_start && index >= cols => {
            NavigationOutcome::Focus(at(index - cols))
        }
        TableKey::ArrowDown if caret.at_end && index + cols < total => {
            NavigationOutcome::Focus(at(index + cols))
        }
        TableKey::ArrowLeft if caret.at_start && index > 0 => {
            NavigationOutcome::Focus(at(index - 1))
        }
        TableKey::ArrowRight if caret.at_end && index + 1 < total => {
            NavigationOutcome::Focus(at(index + 1))
        }
        _ => NavigationOutcome::Ignored,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Source span location
// ─────────────────────────────────────────────────────────────────────────────

/// A line that belongs to a pipe table: trimmed, it starts and ends with `|`.
pub fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let count = rest.chars().take_while(|c| *c == ch).count();
    (count >= 3).then_some((ch, count))
}

/// Line ranges (end exclusive) of the pipe tables in `source`, in order.
///
/// Tables are found as maximal runs of consecutive table lines; runs
/// inside fenced code blocks are skipped. Two tables with no blank line
/// between them form one run.
pub fn table_runs(source: &str) -> Vec<Range<usize>> {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut fence: Option<(char, usize)> = None;
    let mut run_start: Option<usize> = None;
    let mut runs = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some((open_ch, open_len)) = fence {
            if let Some((ch, len)) = fence_marker(line) {
                let closes = ch == open_ch
                    && len >= open_len
                    && line.trim().chars().all(|c| c == ch);
                if closes {
                    fence = None;
                }
            }
            continue;
        }

        let is_fence = fence_marker(line);
        if !is_table_line(line) || is_fence.is_some() {
            if let Some(start) = run_start.take() {
                runs.push(start..i);
            }
            fence = is_fence;
            continue;
        }

        if run_start.is_none() {
            run_start = Some(i);
        }
    }

    if let Some(start) = run_start {
        runs.push(start..lines.len());
    }
    runs
}

/// Line range (end exclusive) of the `ordinal`-th pipe table in `source`.
pub fn locate_table_span(source: &str, ordinal: usize) -> Option<Range<usize>> {
    let runs = table_runs(source);
    let span = runs.get(ordinal).cloned();
    if span.is_none() {
        debug!("Table #{} not found in source ({} tables seen)", ordinal, runs.len());
    }
    span
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{render_markdown, RenderOptions};

    fn model(md: &str) -> TableData {
        let tree = render_markdown(md, None, &RenderOptions::default());
        let table = tree.root().find_tag("table").unwrap().clone();
        TableData::from_table_node(&table).unwrap()
    }

    fn assert_rectangular(data: &TableData) {
        assert!(data.rows.iter().all(|r| r.len() == data.num_columns));
        assert_eq!(data.alignments.len(), data.num_columns);
        assert_eq!(data.column_widths.len(), data.num_columns);
    }

    const SIMPLE: &str = "| a | b |\n| --- | --- |\n| 1 | 2 |";

    // ─────────────────────────────────────────────────────────────────────────
    // Model
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_from_table_node() {
        let data = model("| a | **b** |\n| :-- | --: |\n| 1 | 2 |\n| 3 |");
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.num_columns, 2);
        assert_eq!(data.alignments, vec![TableAlignment::Left, TableAlignment::Right]);
        assert_eq!(data.rows[0][1].markdown(), "**b**");
        assert_eq!(data.rows[2][1].text(), "");
        assert_rectangular(&data);
    }

    #[test]
    fn test_to_markdown_lines() {
        let data = model("| a | b |\n| --- | :-: |\n| 1 |  |");
        assert_eq!(
            data.to_markdown_lines(),
            vec!["| a | b |", "| --- | :---: |", "| 1 |   |"]
        );
    }

    #[test]
    fn test_insert_row_below_last() {
        let mut data = model(SIMPLE);
        assert!(data.apply(TableOp::InsertRow {
            row: 1,
            position: RowPosition::Below
        }));
        assert_eq!(data.row_count(), 3);
        assert_eq!(
            data.to_markdown(),
            "| a | b |\n| --- | --- |\n| 1 | 2 |\n|   |   |"
        );
    }

    #[test]
    fn test_insert_row_next_to_header_creates_first_body_row() {
        for position in [RowPosition::Above, RowPosition::Below] {
            let mut data = model(SIMPLE);
            assert!(data.insert_row(0, position));
            assert_eq!(data.rows[0][0].text(), "a");
            assert_eq!(data.rows[1][0].text(), "");
            assert_eq!(data.rows[2][0].text(), "1");
        }
    }

    #[test]
    fn test_insert_columns() {
        let mut data = model(SIMPLE);
        assert!(data.insert_column(0, ColumnPosition::Left));
        assert!(data.insert_column(2, ColumnPosition::Right));
        assert_eq!(data.num_columns, 4);
        assert_eq!(data.rows[0][1].text(), "a");
        assert_eq!(data.rows[0][2].text(), "b");
        assert_rectangular(&data);
        assert!(!data.insert_column(9, ColumnPosition::Left));
    }

    #[test]
    fn test_delete_row_rules() {
        let mut data = model(SIMPLE);
        assert!(!data.delete_row(1), "header + one row is the minimum");
        data.append_row();
        assert!(!data.delete_row(0), "header cannot be deleted");
        assert!(data.delete_row(1));
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.rows[1][0].text(), "");
    }

    #[test]
    fn test_delete_column_rules() {
        let mut data = model(SIMPLE);
        assert!(data.delete_column(0));
        assert_eq!(data.num_columns, 1);
        assert!(!data.delete_column(0), "last column is kept");
        assert_rectangular(&data);
    }

    #[test]
    fn test_random_op_sequence_keeps_rows_rectangular() {
        let mut data = model(SIMPLE);
        let ops = [
            TableOp::InsertColumn { column: 1, position: ColumnPosition::Right },
            TableOp::AppendRow,
            TableOp::DeleteColumn { column: 0 },
            TableOp::InsertRow { row: 2, position: RowPosition::Above },
            TableOp::DeleteRow { row: 1 },
            TableOp::DeleteColumn { column: 1 },
            TableOp::DeleteColumn { column: 0 },
            TableOp::DeleteColumn { column: 0 },
        ];
        for op in ops {
            data.apply(op);
            assert_rectangular(&data);
            assert!(data.row_count() >= 2);
            assert!(data.num_columns >= 1);
        }
    }

    #[test]
    fn test_resize_clamps() {
        let mut data = model(SIMPLE);
        assert_eq!(data.resize_column(0, 10), Some(MIN_COLUMN_WIDTH));
        assert_eq!(data.resize_column(1, 120), Some(120));
        assert_eq!(data.resize_row(1, 5), Some(MIN_ROW_HEIGHT));
        assert_eq!(data.resize_row(0, 50), None);
        assert_eq!(data.resize_column(7, 50), None);
        assert_eq!(data.to_markdown(), SIMPLE, "resizing never reaches Markdown");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scaffolding
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_build_editor_structure() {
        let mut data = model(SIMPLE);
        data.resize_column(1, 90);
        let wrapper = data.build_editor(3);
        assert_eq!(wrapper_index(&wrapper), Some(3));

        let rows = wrapper.find_class(ROW_CONTROLS_CLASS).unwrap();
        assert_eq!(rows.children.len(), 2);
        let cols = wrapper.find_class(COL_CONTROLS_CLASS).unwrap();
        assert_eq!(cols.children.len(), 3);

        let table = wrapper.find_tag("table").unwrap();
        let rebuilt = TableData::from_table_node(table).unwrap();
        assert_eq!(rebuilt.to_markdown(), data.to_markdown());
        assert_eq!(rebuilt.column_widths, vec![None, Some(90)]);
    }

    #[test]
    fn test_attach_and_cell_position() {
        let md = "| a | b |\n| --- | --- |\n| 1 | 2 |\n\ntext\n\n| x |\n| --- |\n| y |";
        let mut tree = render_markdown(md, None, &RenderOptions::default());
        attach_table_editors(&mut tree, md);

        let wrappers: Vec<&Node> = tree
            .descendants()
            .filter(|n| n.has_class(TABLE_WRAPPER_CLASS))
            .collect();
        assert_eq!(wrappers.len(), 2);
        assert_eq!(wrapper_index(wrappers[1]), Some(1));

        let table = wrappers[0].find_tag("table").unwrap();
        let pos = CellPosition::new(1, 1);
        let id = cell_id_at(table, pos).unwrap();
        assert_eq!(cell_position(table, id), Some(pos));
        assert_eq!(enclosing_wrapper(&tree, id), Some(wrappers[0].id));

        // Attaching again does not double-wrap.
        let before = tree.clone();
        attach_table_editors(&mut tree, md);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_attach_numbers_tables_by_source_run() {
        let md = "> | q |\n> | --- |\n> | 0 |\n\n| a |\n| --- |\n| 1 |\n\n| b |\n| --- |\n| 2 |";
        let mut tree = render_markdown(md, None, &RenderOptions::default());
        attach_table_editors(&mut tree, md);

        assert_eq!(tree.descendants().filter(|n| n.is_tag("table")).count(), 3);
        let wrappers: Vec<&Node> = tree
            .descendants()
            .filter(|n| n.has_class(TABLE_WRAPPER_CLASS))
            .collect();
        assert_eq!(wrappers.len(), 2);
        assert_eq!(wrapper_index(wrappers[0]), Some(0));
        assert_eq!(wrapper_index(wrappers[1]), Some(1));
        assert_eq!(wrappers[0].find_tag("th").unwrap().text_content(), "a");
        assert!(tree.root().find_tag("blockquote").unwrap().find_class(TABLE_WRAPPER_CLASS).is_none());
    }

    #[test]
    fn test_table_right_after_paragraph_gets_editor() {
        let md = "intro\n| a |\n| --- |\n| 1 |";
        let mut tree = render_markdown(md, None, &RenderOptions::default());
        attach_table_editors(&mut tree, md);
        let wrapper = tree.root().find_class(TABLE_WRAPPER_CLASS).unwrap();
        assert_eq!(wrapper_index(wrapper), Some(0));
    }

    #[test]
    fn test_table_without_leading_pipes_gets_no_editor() {
        let md = "a | b\n--- | ---\n1 | 2\n\n| c |\n| --- |\n| 3 |";
        let mut tree = render_markdown(md, None, &RenderOptions::default());
        attach_table_editors(&mut tree, md);
        let wrappers: Vec<&Node> = tree
            .descendants()
            .filter(|n| n.has_class(TABLE_WRAPPER_CLASS))
            .collect();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(wrapper_index(wrappers[0]), Some(0));
        assert_eq!(wrappers[0].find_tag("th").unwrap().text_content(), "c");
    }

    #[test]
    fn test_button_ops() {
        assert_eq!(
            TableOp::for_row_button(0),
            TableOp::InsertRow { row: 1, position: RowPosition::Above }
        );
        assert_eq!(
            TableOp::for_row_button(2),
            TableOp::InsertRow { row: 2, position: RowPosition::Below }
        );
        assert_eq!(
            TableOp::for_column_button(0),
            TableOp::InsertColumn { column: 0, position: ColumnPosition::Left }
        );
        assert_eq!(
            TableOp::for_column_button(2),
            TableOp::InsertColumn { column: 1, position: ColumnPosition::Right }
        );
        let pos = CellPosition::new(1, 0);
        assert_eq!(TableMenuAction::DeleteRow.op_at(pos), TableOp::DeleteRow { row: 1 });
        assert!(TableMenuAction::DeleteColumn.is_destructive());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_tab_navigation() {
        let edge = CaretEdge::default();
        assert_eq!(
            navigate(2, 2, CellPosition::new(0, 1), TableKey::Tab, edge),
            NavigationOutcome::Focus(CellPosition::new(1, 0))
        );
        assert_eq!(
            navigate(2, 2, CellPosition::new(1, 1), TableKey::Tab, edge),
            NavigationOutcome::AppendRowAndFocus(CellPosition::new(2, 0))
        );
        assert_eq!(
            navigate(2, 2, CellPosition::new(1, 0), TableKey::ShiftTab, edge),
            NavigationOutcome::Focus(CellPosition::new(0, 1))
        );
        assert_eq!(
            navigate(2, 2, CellPosition::new(0, 0), TableKey::ShiftTab, edge),
            NavigationOutcome::Consumed
        );
    }

    #[test]
    fn test_enter_moves_down() {
        let edge = CaretEdge::default();
        assert_eq!(
            navigate(3, 2, CellPosition::new(0, 1), TableKey::Enter, edge),
            NavigationOutcome::Focus(CellPosition::new(1, 1))
        );
        assert_eq!(
            navigate(3, 2, CellPosition::new(2, 1), TableKey::Enter, edge),
            NavigationOutcome::Consumed
        );
        assert_eq!(
            navigate(3, 2, CellPosition::new(0, 0), TableKey::ShiftEnter, edge),
            NavigationOutcome::Ignored
        );
    }

    #[test]
    fn test_arrows_move_only_at_edges() {
        let middle = CaretEdge::from_offset(1, 3);
        let start = CaretEdge::from_offset(0, 3);
        let end = CaretEdge::from_offset(3, 3);
        let pos = CellPosition::new(1, 1);

        for key in [TableKey::ArrowUp, TableKey::ArrowDown, TableKey::ArrowLeft, TableKey::ArrowRight] {
            assert_eq!(navigate(3, 3, pos, key, middle), NavigationOutcome::Ignored);
        }
        assert_eq!(
            navigate(3, 3, pos, TableKey::ArrowUp, start),
            NavigationOutcome::Focus(CellPosition::new(0, 1))
        );
        assert_eq!(
            navigate(3, 3, pos, TableKey::ArrowLeft, start),
            NavigationOutcome::Focus(CellPosition::new(1, 0))
        );
        assert_eq!(
            navigate(3, 3, pos, TableKey::ArrowDown, end),
            NavigationOutcome::Focus(CellPosition::new(2, 1))
        );
        assert_eq!(
            navigate(3, 3, pos, TableKey::ArrowRight, end),
            NavigationOutcome::Focus(CellPosition::new(1, 2))
        );
        assert_eq!(
            navigate(3, 3, pos, TableKey::ArrowUp, end),
            NavigationOutcome::Ignored
        );
        // Empty cell: caret is at both edges.
        let empty = CaretEdge::from_offset(0, 0);
        assert_eq!(
            navigate(3, 3, CellPosition::new(0, 0), TableKey::ArrowLeft, empty),
            NavigationOutcome::Ignored
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Span location
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_locate_table_span() {
        let source = "intro\n| a |\n| --- |\n| 1 |\n\n| x |\n|---|\n  | y |  \ntail";
        assert_eq!(locate_table_span(source, 0), Some(1..4));
        assert_eq!(locate_table_span(source, 1), Some(5..8));
        assert_eq!(locate_table_span(source, 2), None);
    }

    #[test]
    fn test_locate_table_span_at_end_of_document() {
        assert_eq!(locate_table_span(SIMPLE, 0), Some(0..3));
    }

    #[test]
    fn test_locate_table_span_skips_fenced_code() {
        let source = "```\n| not | a table |\n```\n\n| a |\n| --- |\n| 1 |";
        assert_eq!(locate_table_span(source, 0), Some(4..7));

        let tilde = "~~~~md\n| x |\n```\n| y |\n~~~~\n| a |\n| --- |";
        assert_eq!(locate_table_span(tilde, 0), Some(5..7));
    }

    #[test]
    fn test_locate_counts_runs_not_lines() {
        let source = "| a |\n| --- |\n| 1 |\n| 2 |\n\n| b |\n| --- |";
        assert_eq!(locate_table_span(source, 1), Some(5..7));
    }

    #[test]
    fn test_table_runs() {
        let source = "> | q |\n\n| a |\n| --- |\n\n```\n| x |\n```\n| b |";
        assert_eq!(table_runs(source), vec![2..4, 8..9]);
        assert!(table_runs("no tables").is_empty());
    }

    #[test]
    fn test_adjacent_tables_form_one_run() {
        let source = "| a |\n| --- |\n| b |\n| --- |";
        assert_eq!(locate_table_span(source, 0), Some(0..4));
        assert_eq!(locate_table_span(source, 1), None);
    }
}
