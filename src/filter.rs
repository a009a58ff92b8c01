//! Filter definitions and the form state behind a grid's filter bar.
//!
//! Each [`FilterItem`] declares a field, a [`FilterKind`] and an optional
//! default. A [`FilterForm`] holds the current value of every item, rejects
//! values that do not fit their kind and turns the whole form into the
//! [`QueryPatch`] the grid loads with.
//!
//! # Examples
//!
//! ```rust
//! use bubbletea_datagrid::filter::{FilterForm, FilterItem, FilterKind, FilterValue};
//! use serde_json::json;
//!
//! let mut form = FilterForm::new(vec![
//!     FilterItem::new("name", "Name", FilterKind::Input),
//!     FilterItem::new("status", "Status", FilterKind::select(["online", "offline"], false)),
//! ]);
//!
//! form.set("status", FilterValue::choice(["online"])).unwrap();
//! let patch = form.to_patch();
//! assert_eq!(patch.get("status"), Some(&json!("online")));
//! assert_eq!(patch.get("name"), Some(&json!(null)));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::query::QueryPatch;

/// The kind of input a filter is edited with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    /// Free text.
    Input,
    /// A number, optionally bounded.
    Numeric {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// One or more choices from a fixed list. An empty option list accepts
    /// any choice.
    Select {
        options: Vec<String>,
        #[serde(default)]
        multiple: bool,
    },
    /// A start/end pair, typically dates.
    Range,
    /// Host-defined editor; accepts any value.
    Custom,
}

impl FilterKind {
    /// A select kind over the given options.
    pub fn select<I, S>(options: I, multiple: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Select {
            options: options.into_iter().map(Into::into).collect(),
            multiple,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Numeric { .. } => "numeric",
            Self::Select { .. } => "select",
            Self::Range => "range",
            Self::Custom => "custom",
        }
    }
}

/// The value of one filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Nothing entered.
    #[default]
    Empty,
    Text(String),
    Number(Number),
    /// Selected options.
    Choice(Vec<String>),
    /// Start and end; either side may be open.
    Range(Option<Value>, Option<Value>),
    Custom(Value),
}

impl FilterValue {
    /// A text value.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A numeric value. Non-finite numbers are treated as empty.
    pub fn number(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Empty, Self::Number)
    }

    /// A selection of options.
    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice(choices.into_iter().map(Into::into).collect())
    }

    /// Whether the value carries nothing to filter by.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Choice(choices) => choices.is_empty(),
            Self::Range(start, end) => start.is_none() && end.is_none(),
            Self::Custom(value) => value.is_null(),
            Self::Number(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Choice(_) => "choice",
            Self::Range(..) => "range",
            Self::Custom(_) => "custom",
        }
    }
}

/// A value rejected by a [`FilterForm`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown filter field `{0}`")]
    UnknownField(String),
    #[error("filter `{field}` is {kind} and cannot hold a {value} value")]
    KindMismatch {
        field: String,
        kind: &'static str,
        value: &'static str,
    },
    #[error("filter `{field}` value {value} is outside [{min:?}, {max:?}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("filter `{field}` has no option `{option}`")]
    UnknownOption { field: String, option: String },
    #[error("filter `{field}` accepts a single option")]
    NotMultiple { field: String },
}

/// Custom mapping from a filter value to query parameters.
pub type ToParams = Arc<dyn Fn(&FilterValue, &FilterItem) -> QueryPatch + Send + Sync>;

/// One filter of a grid.
#[derive(Clone)]
pub struct FilterItem {
    /// Query parameter the filter writes by default; unique within a form.
    pub field: String,
    pub label: String,
    pub kind: FilterKind,
    pub default_value: FilterValue,
    to_params: Option<ToParams>,
}

impl fmt::Debug for FilterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterItem")
            .field("field", &self.field)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("default_value", &self.default_value)
            .field("custom_params", &self.to_params.is_some())
            .finish()
    }
}

impl FilterItem {
    /// Creates a filter with no default.
    pub fn new(field: impl Into<String>, label: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            kind,
            default_value: FilterValue::Empty,
            to_params: None,
        }
    }

    /// Sets the default value (builder pattern).
    pub fn with_default(mut self, value: FilterValue) -> Self {
        self.default_value = value;
        self
    }

    /// Replaces the default parameter mapping (builder pattern).
    pub fn with_to_params<F>(mut self, to_params: F) -> Self
    where
        F: Fn(&FilterValue, &FilterItem) -> QueryPatch + Send + Sync + 'static,
    {
        self.to_params = Some(Arc::new(to_params));
        self
    }

    /// Checks that `value` fits this filter's kind.
    pub fn validate(&self, value: &FilterValue) -> Result<(), FilterError> {
        let mismatch = || FilterError::KindMismatch {
            field: self.field.clone(),
            kind: self.kind.name(),
            value: value.name(),
        };

        match (&self.kind, value) {
            (_, FilterValue::Empty) | (FilterKind::Custom, _) => Ok(()),
            (FilterKind::Input, FilterValue::Text(_)) => Ok(()),
            (FilterKind::Range, FilterValue::Range(..)) => Ok(()),
            (FilterKind::Numeric { min, max }, FilterValue::Number(n)) => {
                let n = n.as_f64().unwrap_or(f64::NAN);
                let below = min.is_some_and(|min| n < min);
                let above = max.is_some_and(|max| n > max);
                if below || above || n.is_nan() {
                    return Err(FilterError::OutOfRange {
                        field: self.field.clone(),
                        value: n,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            (FilterKind::Select { options, multiple }, FilterValue::Choice(choices)) => {
                if !multiple && choices.len() > 1 {
                    return Err(FilterError::NotMultiple {
                        field: self.field.clone(),
                    });
                }
                if options.is_empty() {
                    return Ok(());
                }
                match choices.iter().find(|c| !options.contains(c)) {
                    Some(option) => Err(FilterError::UnknownOption {
                        field: self.field.clone(),
                        option: option.clone(),
                    }),
                    None => Ok(()),
                }
            }
            _ => Err(mismatch()),
        }
    }

    /// Maps a value to query parameters.
    ///
    /// Without a custom mapping, an empty value writes `{field: null}`, a
    /// range writes `{field: [start, end]}`, a single select writes the
    /// chosen option as a string and a multiple select writes an array.
    pub fn to_params(&self, value: &FilterValue) -> QueryPatch {
        if let Some(to_params) = &self.to_params {
            return to_params(value, self);
        }
        QueryPatch::new().set(self.field.clone(), self.default_param(value))
    }

    fn default_param(&self, value: &FilterValue) -> Value {
        if value.is_empty() {
            return Value::Null;
        }
        match value {
            FilterValue::Empty => Value::Null,
            FilterValue::Text(text) => Value::String(text.clone()),
            FilterValue::Number(n) => Value::Number(n.clone()),
            FilterValue::Choice(choices) => match self.kind {
                FilterKind::Select {
                    multiple: false, ..
                } => choices.first().cloned().map_or(Value::Null, Value::String),
                _ => Value::Array(choices.iter().cloned().map(Value::String).collect()),
            },
            FilterValue::Range(start, end) => Value::Array(vec![
                start.clone().unwrap_or(Value::Null),
                end.clone().unwrap_or(Value::Null),
            ]),
            FilterValue::Custom(value) => value.clone(),
        }
    }
}

/// Current values of a set of filters.
#[derive(Debug, Clone, Default)]
pub struct FilterForm {
    items: Vec<FilterItem>,
    values: BTreeMap<String, FilterValue>,
}

impl FilterForm {
    /// Creates a form with every filter at its default.
    pub fn new(items: Vec<FilterItem>) -> Self {
        let values = items
            .iter()
            .map(|item| (item.field.clone(), item.default_value.clone()))
            .collect();
        Self { items, values }
    }

    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Current value of a filter.
    pub fn value(&self, field: &str) -> Option<&FilterValue> {
        self.values.get(field)
    }

    /// Sets one filter's value.
    pub fn set(&mut self, field: &str, value: FilterValue) -> Result<(), FilterError> {
        let item = self
            .items
            .iter()
            .find(|item| item.field == field)
            .ok_or_else(|| FilterError::UnknownField(field.to_string()))?;
        item.validate(&value)?;
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Puts every filter back to its default.
    pub fn reset(&mut self) {
        for item in &self.items {
            self.values
                .insert(item.field.clone(), item.default_value.clone());
        }
    }

    /// Parameters for the current values, merged in item order.
    pub fn to_patch(&self) -> QueryPatch {
        self.items.iter().fold(QueryPatch::new(), |patch, item| {
            let value = self.values.get(&item.field).unwrap_or(&FilterValue::Empty);
            patch.merge(item.to_params(value))
        })
    }

    /// Parameters for the default values, regardless of current edits.
    pub fn ready_patch(&self) -> QueryPatch {
        self.items.iter().fold(QueryPatch::new(), |patch, item| {
            patch.merge(item.to_params(&item.default_value))
        })
    }
}
