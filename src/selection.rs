//! Tracks which rows are selected in a grid.
//!
//! The grid reports the full selection whenever it changes; the tracker keeps
//! both the rows and their derived keys so actions can operate on either.

use serde_json::Value;

use crate::fetch::Row;

/// Selected rows and their keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    row_key: String,
    rows: Vec<Row>,
    keys: Vec<Value>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new("id")
    }
}

impl Model {
    /// Creates an empty tracker that reads keys from `row_key`.
    pub fn new(row_key: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            rows: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// The field keys are read from.
    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// Replaces the selection.
    ///
    /// Rows lacking the key field stay selected but contribute no key. Keys
    /// are unique and keep the order of their first row.
    pub fn on_selection_changed(&mut self, rows: Vec<Row>) {
        let mut keys: Vec<Value> = Vec::new();
        for key in rows.iter().filter_map(|row| row.get(&self.row_key)) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        self.keys = keys;
        self.rows = rows;
    }

    /// Empties the selection.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.keys.clear();
    }

    pub fn selected_rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn selected_keys(&self) -> &[Value] {
        &self.keys
    }

    /// Whether a row with this key is selected.
    pub fn is_selected(&self, key: &Value) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
