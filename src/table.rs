//! Plain-text rendering of a grid page.
//!
//! The table draws the visible columns, the rows of the current page, an
//! optional summary row and a cursor. It holds no data of its own beyond the
//! cursor position; the grid hands it a [`TableData`] snapshot per frame.

use lipgloss_extras::lipgloss::width as lg_width;
use lipgloss_extras::prelude::*;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::columns::{Column, Density};
use crate::fetch::Row;
use crate::key::{self, KeyMap as KeyMapTrait};

/// Auto-sized columns never grow past this many cells.
const MAX_AUTO_WIDTH: usize = 40;
const ELLIPSIS: &str = "…";

/// Key bindings for moving the cursor and selecting rows.
#[derive(Debug, Clone)]
pub struct TableKeyMap {
    pub row_up: key::Binding,
    pub row_down: key::Binding,
    /// Adds or removes the row under the cursor from the selection.
    pub toggle_select: key::Binding,
}

impl Default for TableKeyMap {
    fn default() -> Self {
        Self {
            row_up: key::new_binding(vec![
                key::with_keys_str(&["up", "k"]),
                key::with_help("↑/k", "up"),
            ]),
            row_down: key::new_binding(vec![
                key::with_keys_str(&["down", "j"]),
                key::with_help("↓/j", "down"),
            ]),
            toggle_select: key::new_binding(vec![
                key::with_keys_str(&["space"]),
                key::with_help("space", "select"),
            ]),
        }
    }
}

impl KeyMapTrait for TableKeyMap {
    fn short_help(&self) -> Vec<&key::Binding> {
        vec![&self.row_up, &self.row_down, &self.toggle_select]
    }

    fn full_help(&self) -> Vec<Vec<&key::Binding>> {
        vec![vec![&self.row_up, &self.row_down], vec![&self.toggle_select]]
    }
}

/// Styles applied to each kind of line.
#[derive(Debug, Clone)]
pub struct TableStyles {
    pub header: Style,
    pub cell: Style,
    /// Line under the cursor.
    pub cursor: Style,
    pub summary: Style,
    /// Shown instead of rows when the page is empty.
    pub empty: Style,
}

impl Default for TableStyles {
    fn default() -> Self {
        Self {
            header: Style::new().bold(true),
            cell: Style::new(),
            cursor: Style::new().foreground(AdaptiveColor {
                Light: "#EE6FF8",
                Dark: "#EE6FF8",
            }),
            summary: Style::new().faint(true),
            empty: Style::new().foreground(AdaptiveColor {
                Light: "#909090",
                Dark: "#626262",
            }),
        }
    }
}

/// What one frame of the table shows.
#[derive(Debug, Clone, Copy)]
pub struct TableData<'a> {
    pub columns: &'a [&'a Column],
    pub rows: &'a [Row],
    pub summary: Option<&'a Row>,
    pub density: Density,
    /// Field holding each row's identity.
    pub row_key: &'a str,
    /// Identities of selected rows.
    pub selected: &'a [Value],
}

/// Cursor state and styling for the grid's table.
#[derive(Debug, Clone, Default)]
pub struct Model {
    cursor: usize,
    pub styles: TableStyles,
    pub keymap: TableKeyMap,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the styles (builder pattern).
    pub fn with_styles(mut self, styles: TableStyles) -> Self {
        self.styles = styles;
        self
    }

    /// Index of the row under the cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor, keeping it within `len` rows.
    pub fn set_cursor(&mut self, cursor: usize, len: usize) {
        self.cursor = cursor.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn select_prev(&mut self, len: usize) {
        if len > 0 {
            self.cursor = if self.cursor == 0 {
                len - 1
            } else {
                self.cursor.min(len) - 1
            };
        }
    }

    /// Renders header, separator, rows and summary.
    pub fn view(&self, data: &TableData<'_>) -> String {
        let widths = column_widths(data);
        let pad = " ".repeat(data.density.cell_padding());
        let line = |cells: Vec<String>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{pad}{}{pad}", fit(cell, *width)))
                .collect::<Vec<_>>()
                .join("│")
        };

        let mut lines = Vec::new();
        let header = line(data.columns.iter().map(|c| c.title.clone()).collect());
        lines.push(self.styles.header.render(&format!("    {header}")));
        let rule_width = widths
            .iter()
            .map(|w| w + 2 * pad.len())
            .sum::<usize>()
            + widths.len().saturating_sub(1);
        lines.push(format!("    {}", "─".repeat(rule_width)));

        if data.rows.is_empty() {
            lines.push(self.styles.empty.render("    No data"));
        }
        for (index, row) in data.rows.iter().enumerate() {
            let at_cursor = index == self.cursor;
            let selected = row
                .get(data.row_key)
                .is_some_and(|key| data.selected.contains(key));
            let marker = match (at_cursor, selected) {
                (true, true) => "> ✓ ",
                (true, false) => ">   ",
                (false, true) => "  ✓ ",
                (false, false) => "    ",
            };
            let text = format!(
                "{marker}{}",
                line(data.columns.iter().map(|c| cell_text(row.get(&c.key))).collect())
            );
            let style = if at_cursor {
                &self.styles.cursor
            } else {
                &self.styles.cell
            };
            lines.push(style.render(&text));
            for _ in 0..data.density.row_spacing() {
                lines.push(String::new());
            }
        }

        if let Some(summary) = data.summary {
            lines.push(format!("    {}", "─".repeat(rule_width)));
            let text = line(
                data.columns
                    .iter()
                    .map(|c| cell_text(summary.get(&c.key)))
                    .collect(),
            );
            lines.push(self.styles.summary.render(&format!("    {text}")));
        }

        lines.join("\n")
    }
}

fn column_widths(data: &TableData<'_>) -> Vec<usize> {
    data.columns
        .iter()
        .map(|column| {
            if let Some(width) = column.width {
                return width;
            }
            let cells = data
                .rows
                .iter()
                .chain(data.summary)
                .map(|row| cell_text(row.get(&column.key)).width());
            cells
                .chain(std::iter::once(column.title.width()))
                .max()
                .unwrap_or(0)
                .min(MAX_AUTO_WIDTH)
        })
        .collect()
}

/// Text shown for a cell value. Strings are shown bare, missing values and
/// nulls as blanks, everything else as JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Pads or truncates `s` to exactly `width` display cells.
fn fit(s: &str, width: usize) -> String {
    let s = truncate(s, width);
    let used = lg_width(&s);
    format!("{s}{}", " ".repeat(width.saturating_sub(used)))
}

/// Cuts `s` at a grapheme boundary so it fits `width` cells, marking the cut
/// with an ellipsis.
pub fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let budget = width - ELLIPSIS.width();
    let mut out = String::new();
    let mut used = 0;
    for grapheme in s.graphemes(true) {
        let w = grapheme.width();
        if used + w > budget {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push_str(ELLIPSIS);
    out
}
