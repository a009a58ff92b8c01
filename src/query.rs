//! Request parameters for a grid and the store that owns them.
//!
//! A [`ListQuery`] always carries a page and a page size; every other key
//! (search text, sort order, filters) lives in an ordered parameter map. The
//! [`Store`] mutates its query in place by merging [`QueryPatch`]es: keys in
//! the patch overwrite, keys not in the patch keep their value.
//!
//! When URL sync is enabled, pagination in a patch is routed through the
//! [`urlsync`](crate::urlsync) bridge and the bridge's resulting values are
//! copied back, so the address bar and the query never disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::urlsync;

/// Key used for free-text search.
pub const SEARCH_KEY: &str = "search";

/// The full set of parameters sent to a fetch.
///
/// Serializes to a flat JSON object:
///
/// ```rust
/// use bubbletea_datagrid::query::ListQuery;
/// use serde_json::json;
///
/// let mut query = ListQuery::new(2, 50);
/// query.set("status", json!("active"));
/// assert_eq!(
///     serde_json::to_value(&query).unwrap(),
///     json!({"page": 2, "page_size": 50, "status": "active"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawListQuery")]
pub struct ListQuery {
    page: usize,
    page_size: usize,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

/// Wire form of a [`ListQuery`]; pagination is clamped on conversion.
#[derive(Deserialize)]
struct RawListQuery {
    page: usize,
    page_size: usize,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

impl From<RawListQuery> for ListQuery {
    fn from(raw: RawListQuery) -> Self {
        let mut query = ListQuery::new(raw.page, raw.page_size);
        query.params = raw.params;
        query
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

impl ListQuery {
    /// Creates a query with the given pagination and no other parameters.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            params: BTreeMap::new(),
        }
    }

    /// The 1-indexed page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Items per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Sets the page, clamped to at least 1.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Sets the page size, clamped to at least 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    /// Looks up a non-pagination parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Sets a non-pagination parameter.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.params.insert(key.into(), value);
    }

    /// Removes a non-pagination parameter, returning its old value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.params.remove(key)
    }

    /// All non-pagination parameters.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// The search text, when one has been set.
    pub fn search(&self) -> Option<&str> {
        self.get(SEARCH_KEY).and_then(Value::as_str)
    }
}

/// A partial update to a [`ListQuery`].
///
/// # Examples
///
/// ```rust
/// use bubbletea_datagrid::query::QueryPatch;
/// use serde_json::json;
///
/// let patch = QueryPatch::new()
///     .set("sort_field", json!("name"))
///     .set("sort_order", json!("desc"))
///     .page(1);
/// assert!(patch.touches_pagination());
/// assert_eq!(patch.get("sort_field"), Some(&json!("name")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<usize>,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

impl QueryPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch setting the search text.
    pub fn search(text: impl Into<String>) -> Self {
        Self::new().set(SEARCH_KEY, Value::String(text.into()))
    }

    /// Sets the page (builder pattern).
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size (builder pattern).
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets a parameter (builder pattern). `Value::Null` is kept as an
    /// explicit null, which is how a filter is cleared.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a parameter in place.
    ///
    /// The keys `page` and `page_size` are routed to the pagination fields
    /// when they hold non-negative integers; any other value is ignored and
    /// leaves the field as it was.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match key.as_str() {
            "page" => {
                if let Some(page) = value.as_u64() {
                    self.page = Some(page as usize);
                }
            }
            "page_size" => {
                if let Some(page_size) = value.as_u64() {
                    self.page_size = Some(page_size as usize);
                }
            }
            _ => {
                self.params.insert(key, value);
            }
        }
    }

    /// Combines two patches; `other` wins on conflicts.
    pub fn merge(mut self, other: QueryPatch) -> Self {
        if other.page.is_some() {
            self.page = other.page;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        self.params.extend(other.params);
        self
    }

    /// Requested page, if any.
    pub fn requested_page(&self) -> Option<usize> {
        self.page
    }

    /// Requested page size, if any.
    pub fn requested_page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Whether the patch changes page or page size.
    pub fn touches_pagination(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }

    /// Looks up a non-pagination parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Non-pagination parameters in the patch.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        !self.touches_pagination() && self.params.is_empty()
    }
}

impl From<Map<String, Value>> for QueryPatch {
    fn from(map: Map<String, Value>) -> Self {
        let mut patch = QueryPatch::new();
        for (key, value) in map {
            patch.insert(key, value);
        }
        patch
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for QueryPatch {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut patch = QueryPatch::new();
        for (key, value) in iter {
            patch.insert(key, value);
        }
        patch
    }
}

/// Owns the current [`ListQuery`] for one grid instance.
#[derive(Debug)]
pub struct Store {
    query: ListQuery,
    url_sync: Option<urlsync::Model>,
}

impl Store {
    /// A store with the given starting pagination and no URL sync.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            query: ListQuery::new(page, page_size),
            url_sync: None,
        }
    }

    /// A store seeded from, and kept in sync with, the URL.
    pub fn with_url_sync(bridge: urlsync::Model) -> Self {
        let (page, page_size) = bridge.pagination();
        Self {
            query: ListQuery::new(page, page_size),
            url_sync: Some(bridge),
        }
    }

    /// The current query.
    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// The URL bridge, when URL sync is enabled.
    pub fn url_sync(&self) -> Option<&urlsync::Model> {
        self.url_sync.as_ref()
    }

    /// Mutable access to the URL bridge.
    pub fn url_sync_mut(&mut self) -> Option<&mut urlsync::Model> {
        self.url_sync.as_mut()
    }

    /// Whether pagination is mirrored into the URL.
    pub fn is_url_synced(&self) -> bool {
        self.url_sync.is_some()
    }

    /// Shallow-merges a patch into the query.
    ///
    /// Keys not present in the patch are left untouched. With URL sync, page
    /// and page size go through the bridge and its result is copied back.
    pub fn merge(&mut self, patch: &QueryPatch) {
        for (key, value) in patch.params() {
            self.query.set(key.clone(), value.clone());
        }

        if !patch.touches_pagination() {
            return;
        }
        match self.url_sync.as_mut() {
            Some(bridge) => {
                let (page, page_size) = bridge
                    .update_pagination(patch.requested_page(), patch.requested_page_size());
                self.query.set_page(page);
                self.query.set_page_size(page_size);
            }
            None => {
                if let Some(page) = patch.requested_page() {
                    self.query.set_page(page);
                }
                if let Some(page_size) = patch.requested_page_size() {
                    self.query.set_page_size(page_size);
                }
            }
        }
    }

    /// Routes a pagination change through the URL bridge without loading.
    ///
    /// Returns the resulting `(page, page_size)`, or `None` when URL sync is
    /// disabled.
    pub fn update_pagination(
        &mut self,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Option<(usize, usize)> {
        let bridge = self.url_sync.as_mut()?;
        let (page, page_size) = bridge.update_pagination(page, page_size);
        self.query.set_page(page);
        self.query.set_page_size(page_size);
        Some((page, page_size))
    }
}
