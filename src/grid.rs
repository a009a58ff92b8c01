//! The grid controller: one paginated, filterable, column-configurable list.
//!
//! A grid wires together the components of this crate: the query store and
//! its optional URL bridge, the load coordinator, the column manager, the
//! selection tracker, the filter form and the table view. UI events enter
//! through the `on_*` methods, which mutate the query and return the command
//! that fetches the next page.
//!
//! Filter, search and sort changes always request page 1 except sort, which
//! keeps the current page. With URL sync enabled, page and page-size changes
//! only rewrite the URL; the host observes the navigation and calls
//! [`Model::on_url_changed`], which performs the load.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bubbletea_datagrid::prelude::*;
//!
//! # async fn demo() {
//! let mut grid = GridModel::new(GridConfig::default(), vec![Column::new("name", "Name")])
//!     .with_fetcher(|query: ListQuery| async move {
//!         Ok::<_, FetchError>(ListResult::default().with_page(query.page(), query.page_size()))
//!     });
//!
//! if let Some(cmd) = grid.on_search("web") {
//!     if let Some(msg) = cmd.await {
//!         grid.update(msg);
//!     }
//! }
//! assert_eq!(grid.query().page(), 1);
//! # }
//! ```

use bubbletea_rs::{Cmd, KeyMsg, Msg};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::columns::{self, Column, Density};
use crate::fetch::{AfterFetch, BeforeFetch, Fetcher, Notifier, Row};
use crate::filter::{FilterForm, FilterItem};
use crate::loader::{self, ResponseOrdering};
use crate::location::Router;
use crate::paginator::{self, Navigate};
use crate::query::{ListQuery, QueryPatch, Store};
use crate::selection;
use crate::table::{self, TableData};
use crate::urlsync::{self, UrlSyncConfig};

/// Grid settings a host can keep in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Row field used as each row's identity.
    pub row_key: String,
    /// Page size when URL sync is off.
    pub default_page_size: usize,
    /// Mirror pagination into the URL. Its own `default_page_size` applies
    /// while enabled.
    pub url_sync: Option<UrlSyncConfig>,
    pub ordering: ResponseOrdering,
    /// Written into the identity field of the summary row.
    pub summary_label: String,
    pub density: Density,
    /// Load as soon as the grid is initialized.
    pub auto_load: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_key: "id".to_string(),
            default_page_size: 20,
            url_sync: None,
            ordering: ResponseOrdering::default(),
            summary_label: "Summary".to_string(),
            density: Density::default(),
            auto_load: true,
        }
    }
}

impl GridConfig {
    /// Sets the row identity field (builder pattern).
    pub fn with_row_key(mut self, row_key: impl Into<String>) -> Self {
        self.row_key = row_key.into();
        self
    }

    /// Sets the default page size (builder pattern).
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    /// Enables URL sync (builder pattern).
    pub fn with_url_sync(mut self, url_sync: UrlSyncConfig) -> Self {
        self.url_sync = Some(url_sync);
        self
    }

    /// Sets the response ordering policy (builder pattern).
    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the summary label (builder pattern).
    pub fn with_summary_label(mut self, label: impl Into<String>) -> Self {
        self.summary_label = label.into();
        self
    }

    /// Sets the initial density (builder pattern).
    pub fn with_density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    /// Enables or disables loading on init (builder pattern).
    pub fn with_auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }
}

/// Notifications emitted by the grid's actions.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    Search(String),
    SortChange(QueryPatch),
    Filter(QueryPatch),
    /// Filter defaults were applied on first load.
    FilterReady(QueryPatch),
    PageChange(usize),
    PageSizeChange(usize),
    /// Keys of the newly selected rows.
    SelectionChange(Vec<Value>),
}

/// Callback receiving every [`GridEvent`].
pub type EventListener = Box<dyn FnMut(&GridEvent) + Send>;

/// A grid instance.
pub struct Model {
    config: GridConfig,
    loader: loader::Model,
    columns: columns::Model,
    selection: selection::Model,
    filters: Option<FilterForm>,
    table: table::Model,
    listener: Option<EventListener>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .field("columns", &self.columns)
            .field("selection", &self.selection.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates a grid over a column schema. URL sync needs a router; see
    /// [`Model::with_router`].
    pub fn new(config: GridConfig, schema: Vec<Column>) -> Self {
        let loader = loader::Model::new(Store::new(1, config.default_page_size))
            .with_row_key(config.row_key.clone())
            .with_summary_label(config.summary_label.clone())
            .with_ordering(config.ordering);
        Self {
            columns: columns::Model::new(schema).with_density(config.density),
            selection: selection::Model::new(config.row_key.clone()),
            loader,
            filters: None,
            table: table::Model::new(),
            listener: None,
            config,
        }
    }

    /// Connects the grid to the address bar (builder pattern).
    ///
    /// Pagination is re-seeded from the router's URL; other query parameters
    /// are kept. Without a URL sync config the router is ignored.
    pub fn with_router(mut self, router: Box<dyn Router>) -> Self {
        let Some(url_sync) = self.config.url_sync.clone() else {
            debug!("router ignored: url sync disabled");
            return self;
        };
        let bridge = urlsync::Model::new(url_sync, router);
        let previous = std::mem::replace(self.loader.store_mut(), Store::with_url_sync(bridge));
        let carried: QueryPatch = previous
            .query()
            .params()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.loader.store_mut().merge(&carried);
        self.loader.sync_paginator();
        self
    }

    /// Sets the fetch function (builder pattern).
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.loader = self.loader.with_fetcher(fetcher);
        self
    }

    /// Sets the `before_fetch` hook (builder pattern).
    pub fn with_before_fetch(mut self, hook: BeforeFetch) -> Self {
        self.loader = self.loader.with_before_fetch(hook);
        self
    }

    /// Sets the `after_fetch` hook (builder pattern).
    pub fn with_after_fetch(mut self, hook: AfterFetch) -> Self {
        self.loader = self.loader.with_after_fetch(hook);
        self
    }

    /// Sets the message sink (builder pattern).
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.loader = self.loader.with_notifier(notifier);
        self
    }

    /// Starts out tracking an external loading flag (builder pattern).
    pub fn with_external_loading(mut self, loading: bool) -> Self {
        self.loader = self.loader.with_external_loading(loading);
        self
    }

    /// Merges fixed request parameters into the query (builder pattern).
    pub fn with_params(mut self, params: QueryPatch) -> Self {
        self.loader.store_mut().merge(&params);
        self.loader.sync_paginator();
        self
    }

    /// Adds a filter bar (builder pattern).
    pub fn with_filters(mut self, items: Vec<FilterItem>) -> Self {
        self.filters = Some(FilterForm::new(items));
        self
    }

    /// Registers the event listener (builder pattern).
    pub fn with_event_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&GridEvent) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The load coordinator.
    pub fn loader(&self) -> &loader::Model {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut loader::Model {
        &mut self.loader
    }

    pub fn columns(&self) -> &columns::Model {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut columns::Model {
        &mut self.columns
    }

    pub fn selection(&self) -> &selection::Model {
        &self.selection
    }

    pub fn filters(&self) -> Option<&FilterForm> {
        self.filters.as_ref()
    }

    pub fn filters_mut(&mut self) -> Option<&mut FilterForm> {
        self.filters.as_mut()
    }

    pub fn table(&self) -> &table::Model {
        &self.table
    }

    /// The current request parameters.
    pub fn query(&self) -> &ListQuery {
        self.loader.query()
    }

    /// Rows of the current page.
    pub fn rows(&self) -> &[Row] {
        self.loader.rows()
    }

    pub fn paginator(&self) -> &paginator::Model {
        self.loader.paginator()
    }

    pub fn loading(&self) -> bool {
        self.loader.loading()
    }

    /// The initial load, when `auto_load` is on.
    ///
    /// With a filter bar, the filter defaults go into the first request. The
    /// page is not reset, so a page taken from the URL survives.
    pub fn init(&mut self) -> Option<Cmd> {
        if !self.config.auto_load {
            return None;
        }
        match self.filters.as_ref().map(FilterForm::ready_patch) {
            Some(defaults) => {
                self.emit(GridEvent::FilterReady(defaults.clone()));
                self.loader.load(Some(defaults))
            }
            None => self.loader.load(None),
        }
    }

    /// Re-issues the current query.
    pub fn reload(&mut self) -> Option<Cmd> {
        self.loader.reload()
    }

    /// Search submitted: loads page 1 with the search text.
    pub fn on_search(&mut self, text: impl Into<String>) -> Option<Cmd> {
        let text = text.into();
        let cmd = self.loader.load(Some(QueryPatch::search(text.clone()).page(1)));
        self.emit(GridEvent::Search(text));
        cmd
    }

    /// Sort changed: loads with the sort parameters. The page is kept.
    pub fn on_sort_change(&mut self, sort: QueryPatch) -> Option<Cmd> {
        let cmd = self.loader.load(Some(sort.clone()));
        self.emit(GridEvent::SortChange(sort));
        cmd
    }

    /// Filters applied: loads page 1 with the filter parameters.
    pub fn on_filter(&mut self, params: QueryPatch) -> Option<Cmd> {
        let cmd = self.loader.load(Some(params.clone().page(1)));
        self.emit(GridEvent::Filter(params));
        cmd
    }

    /// Filter defaults became known. Loads page 1 with them only when
    /// `auto_load` is set; otherwise nothing happens.
    pub fn on_filter_ready(&mut self, params: QueryPatch, auto_load: bool) -> Option<Cmd> {
        if !auto_load {
            return None;
        }
        let cmd = self.loader.load(Some(params.clone().page(1)));
        self.emit(GridEvent::FilterReady(params));
        cmd
    }

    /// Applies the filter bar's current values.
    pub fn apply_filters(&mut self) -> Option<Cmd> {
        let params = self.filters.as_ref()?.to_patch();
        self.on_filter(params)
    }

    /// Puts the filter bar back to its defaults and applies them.
    pub fn reset_filters(&mut self) -> Option<Cmd> {
        let filters = self.filters.as_mut()?;
        filters.reset();
        let params = filters.to_patch();
        self.on_filter(params)
    }

    /// Page changed.
    ///
    /// With URL sync the URL is rewritten and nothing is loaded; the load
    /// follows from [`Model::on_url_changed`]. Otherwise loads the page.
    pub fn on_page_change(&mut self, page: usize) -> Option<Cmd> {
        let cmd = if self.loader.store().is_url_synced() {
            self.loader.store_mut().update_pagination(Some(page), None);
            self.loader.sync_paginator();
            None
        } else {
            self.loader.paginator_mut().set_current(page);
            self.loader.load(Some(QueryPatch::new().page(page)))
        };
        self.emit(GridEvent::PageChange(page));
        cmd
    }

    /// Page size changed; always returns to page 1.
    ///
    /// Follows the same URL sync branching as [`Model::on_page_change`].
    pub fn on_page_size_change(&mut self, page_size: usize) -> Option<Cmd> {
        let cmd = if self.loader.store().is_url_synced() {
            self.loader
                .store_mut()
                .update_pagination(Some(1), Some(page_size));
            self.loader.sync_paginator();
            None
        } else {
            self.loader.paginator_mut().set_page_size(page_size);
            self.loader.paginator_mut().set_current(1);
            self.loader
                .load(Some(QueryPatch::new().page(1).page_size(page_size)))
        };
        self.emit(GridEvent::PageSizeChange(page_size));
        cmd
    }

    /// The URL changed (navigation, or a page change written by this grid):
    /// re-reads pagination from it and loads.
    ///
    /// Returns `None` when URL sync is disabled.
    pub fn on_url_changed(&mut self) -> Option<Cmd> {
        let (page, page_size) = self.loader.store().url_sync()?.init_from_url();
        debug!(page, page_size, "url changed");
        self.loader
            .load(Some(QueryPatch::new().page(page).page_size(page_size)))
    }

    /// Replaces the selection with `rows`.
    pub fn on_selection_changed(&mut self, rows: Vec<Row>) {
        self.selection.on_selection_changed(rows);
        let keys = self.selection.selected_keys().to_vec();
        self.emit(GridEvent::SelectionChange(keys));
    }

    /// Empties the selection.
    pub fn clear_selection(&mut self) {
        self.on_selection_changed(Vec::new());
    }

    /// Routes a message: fetch results go to the coordinator, page keys to
    /// [`Model::on_page_change`], row keys to the table cursor and selection.
    pub fn update(&mut self, msg: Msg) -> Option<Cmd> {
        if self.loader.update(&msg) {
            let len = self.loader.rows().len();
            self.table.set_cursor(self.table.cursor(), len);
            return None;
        }
        if let Some(Navigate::To(page)) = self.loader.paginator().update(&msg) {
            return self.on_page_change(page);
        }

        let key_msg = msg.downcast_ref::<KeyMsg>()?;
        let len = self.loader.rows().len();
        if self.table.keymap.row_down.matches(key_msg) {
            self.table.select_next(len);
        } else if self.table.keymap.row_up.matches(key_msg) {
            self.table.select_prev(len);
        } else if self.table.keymap.toggle_select.matches(key_msg) {
            self.toggle_cursor_row();
        }
        None
    }

    fn toggle_cursor_row(&mut self) {
        let Some(row) = self.loader.rows().get(self.table.cursor()) else {
            return;
        };
        let Some(key) = row.get(self.selection.row_key()) else {
            return;
        };

        let row_key = self.selection.row_key();
        let mut rows = self.selection.selected_rows().to_vec();
        if self.selection.is_selected(key) {
            rows.retain(|r| r.get(row_key) != Some(key));
        } else {
            rows.push(row.clone());
        }
        self.on_selection_changed(rows);
    }

    /// Renders the table, a status line and the page indicator.
    pub fn view(&self) -> String {
        let visible = self.columns.visible_columns();
        let data = TableData {
            columns: &visible,
            rows: self.loader.rows(),
            summary: self.loader.summary(),
            density: self.columns.density(),
            row_key: self.selection.row_key(),
            selected: self.selection.selected_keys(),
        };
        let mut out = self.table.view(&data);

        let paginator = self.loader.paginator();
        let mut status = format!(
            "{}  {} total",
            paginator.view(),
            paginator.total()
        );
        if !self.selection.is_empty() {
            status.push_str(&format!("  {} selected", self.selection.len()));
        }
        if self.loading() {
            status.push_str("  loading…");
        }
        out.push_str("\n\n");
        out.push_str(&status);
        out
    }

    fn emit(&mut self, event: GridEvent) {
        debug!(?event, "grid event");
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, ListResult};
    use crate::filter::{FilterKind, FilterValue};
    use crate::location::{Location, MemoryRouter};
    use crossterm::event::{KeyCode, KeyModifiers};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Queries = Arc<Mutex<Vec<ListQuery>>>;

    fn row(id: i64) -> Row {
        json!({"id": id, "name": format!("host-{id}")})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn schema() -> Vec<Column> {
        vec![Column::new("id", "ID"), Column::new("name", "Name")]
    }

    /// Serves 120 rows, clamping the page like a real backend.
    fn backend(queries: Queries) -> impl Fetcher {
        move |query: ListQuery| {
            queries.lock().unwrap().push(query.clone());
            async move {
                let size = query.page_size();
                let last = 120_usize.div_ceil(size);
                let page = query.page().min(last);
                let first = (page - 1) * size;
                let items = (first..(first + size).min(120))
                    .map(|i| row(i as i64 + 1))
                    .collect();
                Ok::<_, FetchError>(
                    ListResult::from_items(items)
                        .with_total(120)
                        .with_page(page, size),
                )
            }
        }
    }

    fn grid(config: GridConfig) -> (Model, Queries) {
        let queries = Queries::default();
        let model = Model::new(config, schema()).with_fetcher(backend(queries.clone()));
        (model, queries)
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn run(grid: &mut Model, cmd: Option<Cmd>) {
        let cmd = cmd.expect("a load command");
        let msg = cmd.await.expect("load command yields a message");
        assert!(grid.update(msg).is_none());
    }

    fn key(code: KeyCode) -> Msg {
        Box::new(KeyMsg {
            key: code,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[tokio::test]
    async fn test_url_sync_end_to_end() {
        init_tracing();
        let router = MemoryRouter::from_url("/list?pageSize=50");
        let handle = router.clone();
        let queries = Queries::default();
        let mut grid = Model::new(
            GridConfig::default().with_url_sync(UrlSyncConfig::default()),
            schema(),
        )
        .with_router(Box::new(router))
        .with_fetcher(backend(queries.clone()));

        assert_eq!((grid.query().page(), grid.query().page_size()), (1, 50));

        let cmd = grid.init();
        run(&mut grid, cmd).await;
        assert_eq!(grid.rows().len(), 50);
        assert_eq!(grid.paginator().total(), 120);
        assert_eq!(grid.paginator().current(), 1);

        assert!(grid.on_page_change(2).is_none());
        assert_eq!(handle.url(), "/list?page=2&pageSize=50");
        assert_eq!(handle.history_len(), 1);

        let cmd = grid.on_url_changed();
        run(&mut grid, cmd).await;
        let last = queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!((last.page(), last.page_size()), (2, 50));
        assert_eq!(grid.rows()[0]["id"], json!(51));
    }

    #[tokio::test]
    async fn test_navigation_loads_page_from_url() {
        let router = MemoryRouter::from_url("/list");
        let handle = router.clone();
        let (grid, queries) = grid(GridConfig::default().with_url_sync(UrlSyncConfig::default()));
        let mut grid = grid.with_router(Box::new(router));

        handle.push(Location::parse("/list?page=5&pageSize=10").unwrap());
        let cmd = grid.on_url_changed();
        run(&mut grid, cmd).await;
        let last = queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!((last.page(), last.page_size()), (5, 10));
        assert_eq!(grid.paginator().current(), 5);
        assert_eq!(handle.history_len(), 2);
    }

    #[test]
    fn test_url_changed_without_url_sync() {
        let (mut grid, _) = grid(GridConfig::default());
        assert!(grid.on_url_changed().is_none());
    }

    #[tokio::test]
    async fn test_search_resets_page() {
        let (mut grid, queries) = grid(GridConfig::default());
        let cmd = grid.on_page_change(7);
        run(&mut grid, cmd).await;
        assert_eq!(grid.query().page(), 7);

        let cmd = grid.on_search("foo");
        assert_eq!(grid.query().page(), 1);
        assert_eq!(grid.query().search(), Some("foo"));
        run(&mut grid, cmd).await;
        assert_eq!(queries.lock().unwrap().last().unwrap().page(), 1);
    }

    #[tokio::test]
    async fn test_sort_keeps_page() {
        let (mut grid, _) = grid(GridConfig::default());
        let cmd = grid.on_page_change(3);
        run(&mut grid, cmd).await;

        let cmd = grid.on_sort_change(
            QueryPatch::new()
                .set("sort_field", json!("name"))
                .set("sort_order", json!("desc")),
        );
        run(&mut grid, cmd).await;
        assert_eq!(grid.query().page(), 3);
        assert_eq!(grid.query().get("sort_order"), Some(&json!("desc")));
    }

    #[tokio::test]
    async fn test_filter_resets_page_and_keeps_other_params() {
        let (mut grid, _) = grid(GridConfig::default());
        let cmd = grid.on_search("db");
        run(&mut grid, cmd).await;
        let cmd = grid.on_page_change(4);
        run(&mut grid, cmd).await;

        let cmd = grid.on_filter(QueryPatch::new().set("status", json!("online")));
        run(&mut grid, cmd).await;
        assert_eq!(grid.query().page(), 1);
        assert_eq!(grid.query().get("status"), Some(&json!("online")));
        assert_eq!(grid.query().search(), Some("db"));
    }

    #[tokio::test]
    async fn test_page_size_change_without_url_sync() {
        let (mut grid, queries) = grid(GridConfig::default());
        let cmd = grid.on_page_change(5);
        run(&mut grid, cmd).await;

        let cmd = grid.on_page_size_change(100);
        assert_eq!(grid.paginator().current(), 1);
        run(&mut grid, cmd).await;
        let last = queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!((last.page(), last.page_size()), (1, 100));
        assert_eq!(grid.paginator().page_size(), 100);
    }

    #[test]
    fn test_page_size_change_with_url_sync_only_rewrites_url() {
        let router = MemoryRouter::from_url("/list?page=3&q=x");
        let handle = router.clone();
        let (grid, queries) = grid(GridConfig::default().with_url_sync(UrlSyncConfig::default()));
        let mut grid = grid.with_router(Box::new(router));

        assert!(grid.on_page_size_change(100).is_none());
        assert_eq!(handle.url(), "/list?q=x&pageSize=100");
        assert_eq!((grid.query().page(), grid.query().page_size()), (1, 100));
        assert_eq!(grid.paginator().page_size(), 100);
        assert!(queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_clamps_page() {
        let (mut grid, _) = grid(GridConfig::default());
        let cmd = grid.on_page_change(99);
        run(&mut grid, cmd).await;
        assert_eq!(grid.paginator().current(), 6);
        // the request parameters keep what was asked for
        assert_eq!(grid.query().page(), 99);
    }

    #[tokio::test]
    async fn test_events_reach_listener() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let (grid, _) = grid(GridConfig::default());
        let mut grid = grid.with_event_listener(move |e| sink.lock().unwrap().push(e.clone()));

        let cmd = grid.on_search("a");
        run(&mut grid, cmd).await;
        let cmd = grid.on_page_size_change(10);
        run(&mut grid, cmd).await;
        grid.on_selection_changed(vec![row(4)]);

        assert_eq!(
            *events.lock().unwrap(),
            [
                GridEvent::Search("a".into()),
                GridEvent::PageSizeChange(10),
                GridEvent::SelectionChange(vec![json!(4)]),
            ]
        );
    }

    #[test]
    fn test_filter_ready_without_auto_load_does_nothing() {
        let (mut grid, queries) = grid(GridConfig::default());
        assert!(grid
            .on_filter_ready(QueryPatch::new().set("status", json!("on")), false)
            .is_none());
        assert!(grid.query().get("status").is_none());
        assert!(queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_applies_filter_defaults() {
        let (grid, queries) = grid(GridConfig::default());
        let mut grid = grid.with_filters(vec![FilterItem::new(
            "status",
            "Status",
            FilterKind::select(["on", "off"], false),
        )
        .with_default(FilterValue::choice(["on"]))]);

        let cmd = grid.init();
        run(&mut grid, cmd).await;
        assert_eq!(
            queries.lock().unwrap()[0].get("status"),
            Some(&json!("on"))
        );

        grid.filters_mut()
            .unwrap()
            .set("status", FilterValue::choice(["off"]))
            .unwrap();
        let cmd = grid.apply_filters();
        run(&mut grid, cmd).await;
        assert_eq!(grid.query().get("status"), Some(&json!("off")));

        let cmd = grid.reset_filters();
        run(&mut grid, cmd).await;
        assert_eq!(grid.query().get("status"), Some(&json!("on")));
    }

    #[test]
    fn test_init_without_auto_load() {
        let (mut grid, queries) = grid(GridConfig::default().with_auto_load(false));
        assert!(grid.init().is_none());
        assert!(queries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_without_fetcher_grid_is_local() {
        let mut grid = Model::new(GridConfig::default(), schema());
        assert!(grid.on_search("x").is_none());
        grid.loader_mut()
            .set_data(ListResult::from_items(vec![row(1), row(2)]).with_total(2));
        assert_eq!(grid.rows().len(), 2);
        assert!(!grid.loading());
    }

    #[tokio::test]
    async fn test_keys_page_and_select() {
        let (mut grid, queries) = grid(GridConfig::default());
        let cmd = grid.init();
        run(&mut grid, cmd).await;

        let cmd = grid.update(key(KeyCode::PageDown));
        run(&mut grid, cmd).await;
        assert_eq!(queries.lock().unwrap().last().unwrap().page(), 2);
        assert_eq!(grid.rows()[0]["id"], json!(21));

        assert!(grid.update(key(KeyCode::Down)).is_none());
        grid.update(key(KeyCode::Char(' ')));
        assert_eq!(grid.selection().selected_keys(), [json!(22)]);
        grid.update(key(KeyCode::Char(' ')));
        assert!(grid.selection().is_empty());
    }

    #[tokio::test]
    async fn test_selection_survives_page_change() {
        let (mut grid, _) = grid(GridConfig::default());
        let cmd = grid.init();
        run(&mut grid, cmd).await;
        grid.on_selection_changed(vec![row(1), row(2)]);

        let cmd = grid.on_page_change(2);
        run(&mut grid, cmd).await;
        assert_eq!(grid.selection().len(), 2);

        grid.clear_selection();
        assert!(grid.selection().is_empty());
    }

    #[tokio::test]
    async fn test_view() {
        let (mut grid, _) = grid(GridConfig::default().with_default_page_size(2));
        let cmd = grid.init();
        run(&mut grid, cmd).await;
        grid.columns_mut().toggle_column("id", false);

        let view = grid.view();
        assert!(view.contains("Name"));
        assert!(view.contains("host-2"));
        assert!(view.contains("1/60"));
        assert!(view.contains("120 total"));
    }

    #[test]
    fn test_router_carries_params() {
        let config = GridConfig::default().with_url_sync(UrlSyncConfig::default());
        let grid = Model::new(config, schema())
            .with_params(QueryPatch::new().set("tenant", json!("a")))
            .with_router(Box::new(MemoryRouter::from_url("/x?page=4")));
        assert_eq!(grid.query().page(), 4);
        assert_eq!(grid.query().get("tenant"), Some(&json!("a")));
        assert!(grid.loader().store().is_url_synced());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GridConfig = serde_json::from_value(json!({
            "row_key": "uuid",
            "url_sync": {"page_size_param": "size"},
            "ordering": "latest_request_only",
            "density": "mini"
        }))
        .unwrap();
        assert_eq!(config.row_key, "uuid");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.url_sync.unwrap().page_size_param, "size");
        assert_eq!(config.ordering, ResponseOrdering::LatestRequestOnly);
        assert_eq!(config.density, Density::Mini);
        assert!(config.auto_load);
    }
}
