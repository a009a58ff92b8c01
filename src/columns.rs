//! Column visibility, order and density for a grid.
//!
//! The column schema belongs to the host and may change at any time (for
//! example when permissions hide a column). The manager keeps a display
//! overlay on top of it: which columns are shown, in which order, and how
//! dense rows are drawn. Replacing the schema rebuilds the overlay.
//!
//! # Examples
//!
//! ```rust
//! use bubbletea_datagrid::columns::{Column, Model};
//!
//! let mut columns = Model::new(vec![
//!     Column::new("name", "Name"),
//!     Column::new("ip", "IP"),
//!     Column::new("status", "Status"),
//! ]);
//!
//! columns.toggle_column("ip", false);
//! let keys: Vec<&str> = columns.visible_columns().iter().map(|c| c.key.as_str()).collect();
//! assert_eq!(keys, ["name", "status"]);
//!
//! columns.toggle_column("ip", true);
//! let keys: Vec<&str> = columns.visible_columns().iter().map(|c| c.key.as_str()).collect();
//! assert_eq!(keys, ["name", "ip", "status"]);
//! ```

use serde::{Deserialize, Serialize};

/// Row density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    /// No padding, no spacing.
    Mini,
    /// Tight padding.
    Small,
    /// The default.
    #[default]
    Medium,
    /// Extra spacing between rows.
    Large,
}

impl Density {
    /// Horizontal padding on each side of a cell.
    pub fn cell_padding(self) -> usize {
        match self {
            Self::Mini => 0,
            Self::Small | Self::Medium | Self::Large => 1,
        }
    }

    /// Blank lines between rows.
    pub fn row_spacing(self) -> usize {
        match self {
            Self::Mini | Self::Small | Self::Medium => 0,
            Self::Large => 1,
        }
    }
}

/// A column of the host's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Row field the column displays; unique within a schema.
    pub key: String,
    /// Header text.
    pub title: String,
    /// Fixed width in terminal cells; sized to content when `None`.
    #[serde(default)]
    pub width: Option<usize>,
}

impl Column {
    /// Creates a column sized to its content.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: None,
        }
    }

    /// Sets a fixed width (builder pattern).
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

/// Overlay entry for one schema column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Schema column key.
    pub key: String,
    /// Whether the column is shown.
    pub visible: bool,
    /// Display position, 0-based.
    pub order: usize,
}

/// The column visibility manager.
#[derive(Debug, Clone, Default)]
pub struct Model {
    schema: Vec<Column>,
    overlay: Vec<ColumnDescriptor>,
    density: Density,
}

impl Model {
    /// Creates a manager over a schema with every column visible.
    pub fn new(schema: Vec<Column>) -> Self {
        let mut model = Self::default();
        model.set_schema(schema);
        model
    }

    /// Sets the density (builder pattern).
    pub fn with_density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    /// Replaces the schema and rebuilds the overlay: every column visible, in
    /// schema order.
    pub fn set_schema(&mut self, schema: Vec<Column>) {
        self.overlay = schema
            .iter()
            .enumerate()
            .map(|(order, column)| ColumnDescriptor {
                key: column.key.clone(),
                visible: true,
                order,
            })
            .collect();
        self.schema = schema;
    }

    /// The schema as supplied by the host.
    pub fn schema(&self) -> &[Column] {
        &self.schema
    }

    /// The overlay in display order, hidden columns included.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.overlay
    }

    /// Shows or hides one column. Order is unchanged.
    ///
    /// Returns `false` when no column has that key.
    pub fn toggle_column(&mut self, key: &str, visible: bool) -> bool {
        match self.overlay.iter_mut().find(|c| c.key == key) {
            Some(descriptor) => {
                descriptor.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Whether a column is currently shown.
    pub fn is_visible(&self, key: &str) -> bool {
        self.overlay.iter().any(|c| c.key == key && c.visible)
    }

    /// Replaces the display order with the given keys.
    ///
    /// Unknown and repeated keys are ignored; columns missing from `keys`
    /// follow in their previous relative order.
    pub fn reorder<S: AsRef<str>>(&mut self, keys: &[S]) {
        let mut remaining = std::mem::take(&mut self.overlay);
        let mut reordered = Vec::with_capacity(remaining.len());
        for key in keys {
            if let Some(index) = remaining.iter().position(|c| c.key == key.as_ref()) {
                reordered.push(remaining.remove(index));
            }
        }
        reordered.extend(remaining);
        for (order, descriptor) in reordered.iter_mut().enumerate() {
            descriptor.order = order;
        }
        self.overlay = reordered;
    }

    /// Shown columns in display order.
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.overlay
            .iter()
            .filter(|c| c.visible)
            .filter_map(|c| self.schema.iter().find(|s| s.key == c.key))
            .collect()
    }

    /// Current density.
    pub fn density(&self) -> Density {
        self.density
    }

    /// Changes the density. Visibility and order are unaffected.
    pub fn set_density(&mut self, density: Density) {
        self.density = density;
    }
}
