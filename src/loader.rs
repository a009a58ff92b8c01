//! The fetch lifecycle of a grid.
//!
//! The coordinator merges new parameters into the [`Store`], applies the
//! `before_fetch` hook, starts the external fetch and hands back a [`Cmd`].
//! The command resolves to a [`LoadedMsg`]; routing that message back into
//! [`Model::update`] reconciles the result into render state (rows, summary
//! row, pagination) and returns the coordinator to idle.
//!
//! ## States
//!
//! - `Idle`: no fetch outstanding.
//! - `Loading`: a fetch is outstanding, or the host reported an external
//!   loading condition via [`Model::set_external_loading`].
//!
//! A [`Model::load`] without a patch while `Loading` is dropped, which absorbs
//! duplicate triggers. A load with a patch always goes out, even while
//! another fetch is pending; nothing is cancelled.
//!
//! ## Response ordering
//!
//! With [`ResponseOrdering::LastResponseWins`] every response is reconciled in
//! arrival order, so a slow older response can overwrite a newer one. With
//! [`ResponseOrdering::LatestRequestOnly`] each load gets a sequence number
//! and only the response to the latest load is applied.
//!
//! ## Failures
//!
//! A failed fetch is reported through the [`Notifier`]; the rows already on
//! screen stay as they are and loading still ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bubbletea_rs::{Cmd, Msg};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::fetch::{
    AfterFetch, BeforeFetch, FetchError, Fetcher, ListResult, LogNotifier, Notifier, Row,
};
use crate::paginator;
use crate::query::{ListQuery, QueryPatch, Store};

static LAST_ID: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
    LAST_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// Message a failed fetch with this text is treated as a non-error.
const SILENT_FAILURE: &str = "OK";

/// How concurrent responses are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Every response is applied when it arrives; the last one to arrive wins.
    #[default]
    LastResponseWins,
    /// Only the response to the most recently issued load is applied.
    LatestRequestOnly,
}

/// Coarse lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing outstanding.
    Idle,
    /// A fetch or an external loading condition is outstanding.
    Loading,
}

/// The outcome of one fetch, produced by the command [`Model::load`] returns.
#[derive(Debug)]
pub struct LoadedMsg {
    /// Coordinator that issued the fetch.
    pub id: usize,
    /// Sequence number of the load.
    pub seq: u64,
    /// The (post-processed) result, or the failure.
    pub outcome: Result<ListResult, FetchError>,
}

/// The data load coordinator.
pub struct Model {
    id: usize,
    store: Store,
    fetcher: Option<Arc<dyn Fetcher>>,
    before_fetch: Option<BeforeFetch>,
    after_fetch: Option<AfterFetch>,
    notifier: Arc<dyn Notifier>,
    ordering: ResponseOrdering,
    row_key: String,
    summary_label: String,

    loading: bool,
    external_loading: Option<bool>,
    issued: u64,

    paginator: paginator::Model,
    rows: Vec<Row>,
    summary: Option<Row>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("store", &self.store)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("ordering", &self.ordering)
            .field("loading", &self.loading)
            .field("external_loading", &self.external_loading)
            .field("issued", &self.issued)
            .field("rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates a coordinator over the given store, with no fetch function.
    pub fn new(store: Store) -> Self {
        let query = store.query();
        let paginator = paginator::Model::new()
            .with_current(query.page())
            .with_page_size(query.page_size());
        Self {
            id: next_id(),
            store,
            fetcher: None,
            before_fetch: None,
            after_fetch: None,
            notifier: Arc::new(LogNotifier),
            ordering: ResponseOrdering::default(),
            row_key: "id".to_string(),
            summary_label: "Summary".to_string(),
            loading: false,
            external_loading: None,
            issued: 0,
            paginator,
            rows: Vec::new(),
            summary: None,
        }
    }

    /// Sets the fetch function (builder pattern).
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Sets the `before_fetch` hook (builder pattern).
    pub fn with_before_fetch(mut self, hook: BeforeFetch) -> Self {
        self.before_fetch = Some(hook);
        self
    }

    /// Sets the `after_fetch` hook (builder pattern).
    pub fn with_after_fetch(mut self, hook: AfterFetch) -> Self {
        self.after_fetch = Some(hook);
        self
    }

    /// Sets the message sink (builder pattern).
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Sets the response ordering policy (builder pattern).
    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the row identity field (builder pattern).
    pub fn with_row_key(mut self, row_key: impl Into<String>) -> Self {
        self.row_key = row_key.into();
        self
    }

    /// Sets the label written into the summary row (builder pattern).
    pub fn with_summary_label(mut self, label: impl Into<String>) -> Self {
        self.summary_label = label.into();
        self
    }

    /// Declares an externally driven loading flag (builder pattern).
    pub fn with_external_loading(mut self, loading: bool) -> Self {
        self.external_loading = Some(loading);
        self
    }

    /// Unique id used to route [`LoadedMsg`]s.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The query store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Mutable access to the query store.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// The current query.
    pub fn query(&self) -> &ListQuery {
        self.store.query()
    }

    /// Render-facing pagination.
    pub fn paginator(&self) -> &paginator::Model {
        &self.paginator
    }

    /// Mutable access to the render-facing pagination.
    pub fn paginator_mut(&mut self) -> &mut paginator::Model {
        &mut self.paginator
    }

    /// Rows currently rendered.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The summary row of the last result, if any.
    pub fn summary(&self) -> Option<&Row> {
        self.summary.as_ref()
    }

    /// The row identity field.
    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// Whether a fetch function is configured.
    pub fn has_fetcher(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Whether the grid is loading, from either its own fetches or the
    /// external flag.
    pub fn loading(&self) -> bool {
        self.loading || self.external_loading.unwrap_or(false)
    }

    /// The coarse lifecycle state.
    pub fn state(&self) -> LoadState {
        if self.loading() {
            LoadState::Loading
        } else {
            LoadState::Idle
        }
    }

    /// Forces the internal loading flag.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Tracks the host's loading flag. `None` stops tracking.
    ///
    /// Completing an internal fetch never clears this flag.
    pub fn set_external_loading(&mut self, loading: Option<bool>) {
        self.external_loading = loading;
    }

    /// Copies the query's pagination into the paginator.
    pub(crate) fn sync_paginator(&mut self) {
        let query = self.store.query();
        let (page, page_size) = (query.page(), query.page_size());
        self.paginator.set_current(page);
        self.paginator.set_page_size(page_size);
    }

    /// Starts a fetch, optionally merging a patch into the query first.
    ///
    /// Returns `None` without touching any state when no fetch function is
    /// configured, and when called without a patch while already loading.
    /// Otherwise returns the command that performs the fetch; its
    /// [`LoadedMsg`] must be passed back to [`Model::update`].
    pub fn load(&mut self, patch: Option<QueryPatch>) -> Option<Cmd> {
        let fetcher = self.fetcher.clone()?;

        debug!(
            grid = self.id,
            has_patch = patch.is_some(),
            loading = self.loading(),
            "load called"
        );
        if patch.is_none() && self.loading() {
            debug!(grid = self.id, "load skipped: already loading");
            return None;
        }

        self.loading = true;
        if let Some(patch) = patch {
            self.store.merge(&patch);
            if patch.touches_pagination() {
                self.sync_paginator();
            }
        }

        let mut query = self.store.query().clone();
        if let Some(hook) = &self.before_fetch {
            query = hook(query);
        }

        self.issued += 1;
        let seq = self.issued;
        let id = self.id;
        let after = self.after_fetch.clone();
        debug!(grid = id, seq, query = ?query, "issuing fetch");
        let request = fetcher.fetch(query);

        let cmd: Cmd = Box::pin(async move {
            let outcome = match request.await {
                Ok(result) => match after {
                    Some(hook) => hook(result).await,
                    None => Ok(result),
                },
                Err(err) => Err(err),
            };
            Some(Box::new(LoadedMsg { id, seq, outcome }) as Msg)
        });
        Some(cmd)
    }

    /// Re-issues the current query.
    pub fn reload(&mut self) -> Option<Cmd> {
        self.load(None)
    }

    /// Handles a [`LoadedMsg`] addressed to this coordinator.
    ///
    /// Returns whether the message was consumed.
    pub fn update(&mut self, msg: &Msg) -> bool {
        let Some(loaded) = msg.downcast_ref::<LoadedMsg>() else {
            return false;
        };
        if loaded.id != self.id {
            return false;
        }

        if self.ordering == ResponseOrdering::LatestRequestOnly && loaded.seq != self.issued {
            debug!(
                grid = self.id,
                seq = loaded.seq,
                latest = self.issued,
                "dropping stale response"
            );
            return true;
        }

        match &loaded.outcome {
            Ok(result) => {
                debug!(grid = self.id, seq = loaded.seq, rows = result.items.len(), "fetch completed");
                self.set_data(result.clone());
            }
            Err(err) => self.fail(err),
        }
        self.loading = false;
        true
    }

    /// Reconciles a result into render state and ends loading.
    ///
    /// Rows are replaced wholesale. Server-reported total, page and page size
    /// are adopted when present. The summary row, if any, gets the summary
    /// label in its row identity field.
    pub fn set_data(&mut self, result: ListResult) {
        let ListResult {
            items,
            total,
            page,
            page_size,
            summary,
        } = result;

        self.rows = items;
        self.summary = summary.map(|mut row| {
            row.insert(self.row_key.clone(), Value::String(self.summary_label.clone()));
            row
        });
        if let Some(total) = total {
            self.paginator.set_total(total);
        }
        if let Some(page) = page {
            self.paginator.set_current(page);
        }
        if let Some(page_size) = page_size {
            self.paginator.set_page_size(page_size);
        }
        self.loading = false;
    }

    fn fail(&self, err: &FetchError) {
        let message = err.message();
        if message == SILENT_FAILURE {
            warn!(grid = self.id, "fetch failed with a silent status");
            return;
        }
        error!(grid = self.id, error = %err, "fetch failed");
        self.notifier
            .notify_error(&format!("Failed to load data: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorder {
        fn notify_error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn row(id: i64) -> Row {
        json!({"id": id, "name": format!("row-{id}")})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn echo_fetcher(calls: Arc<AtomicUsize>) -> impl Fetcher {
        move |query: ListQuery| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, FetchError>(
                    ListResult::from_items(vec![row(query.page() as i64)])
                        .with_total(120)
                        .with_page(query.page(), query.page_size()),
                )
            }
        }
    }

    async fn run(model: &mut Model, cmd: Cmd) {
        let msg = cmd.await.expect("load command yields a message");
        assert!(model.update(&msg));
    }

    #[test]
    fn test_load_without_fetcher_is_noop() {
        let mut model = Model::new(Store::new(1, 20));
        assert!(model.load(Some(QueryPatch::new().page(4))).is_none());
        assert!(!model.loading());
        assert_eq!(model.query().page(), 1);
    }

    #[tokio::test]
    async fn test_load_reconciles_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 50)).with_fetcher(echo_fetcher(calls.clone()));

        let cmd = model.load(None).unwrap();
        assert!(model.loading());
        assert_eq!(model.state(), LoadState::Loading);
        run(&mut model, cmd).await;

        assert!(!model.loading());
        assert_eq!(model.rows().len(), 1);
        assert_eq!(model.paginator().total(), 120);
        assert_eq!(model.paginator().total_pages(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_load_while_pending_is_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 20)).with_fetcher(echo_fetcher(calls.clone()));

        let first = model.load(None).unwrap();
        assert!(model.load(None).is_none());
        assert!(model.reload().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        run(&mut model, first).await;
        assert!(model.reload().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_with_patch_proceeds_while_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 20)).with_fetcher(echo_fetcher(calls.clone()));

        let _first = model.load(None).unwrap();
        let second = model.load(Some(QueryPatch::new().page(2)));
        assert!(second.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(model.paginator().current(), 2);
    }

    #[tokio::test]
    async fn test_merge_keeps_unspecified_keys() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(3, 20)).with_fetcher(echo_fetcher(calls));
        model
            .store_mut()
            .merge(&QueryPatch::new().set("status", json!("up")));

        let cmd = model
            .load(Some(QueryPatch::new().set("kind", json!("tcp"))))
            .unwrap();
        run(&mut model, cmd).await;

        let q = model.query();
        assert_eq!(q.get("status"), Some(&json!("up")));
        assert_eq!(q.get("kind"), Some(&json!("tcp")));
        assert_eq!(q.page(), 3);
        assert_eq!(q.page_size(), 20);
    }

    #[tokio::test]
    async fn test_failure_keeps_rows_and_clears_loading() {
        let fail = Arc::new(Mutex::new(false));
        let fail_flag = fail.clone();
        let notes = Recorder::default();
        let mut model = Model::new(Store::new(1, 20))
            .with_notifier(notes.clone())
            .with_fetcher(move |_q: ListQuery| {
                let fail = *fail_flag.lock().unwrap();
                async move {
                    if fail {
                        Err(FetchError::request("connection refused"))
                    } else {
                        Ok(ListResult::from_items(vec![row(1), row(2)]).with_total(2))
                    }
                }
            });

        let cmd = model.load(None).unwrap();
        run(&mut model, cmd).await;
        let before = model.rows().to_vec();
        assert_eq!(before.len(), 2);

        *fail.lock().unwrap() = true;
        let cmd = model.load(Some(QueryPatch::search("x"))).unwrap();
        run(&mut model, cmd).await;

        assert_eq!(model.rows(), before.as_slice());
        assert!(!model.loading());
        assert_eq!(
            notes.0.lock().unwrap().as_slice(),
            ["Failed to load data: connection refused".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ok_failure_is_not_surfaced() {
        let notes = Recorder::default();
        let mut model = Model::new(Store::new(1, 20))
            .with_notifier(notes.clone())
            .with_fetcher(|_q: ListQuery| async { Err::<ListResult, _>(FetchError::request("OK")) });

        let cmd = model.load(None).unwrap();
        run(&mut model, cmd).await;
        assert!(notes.0.lock().unwrap().is_empty());
        assert!(!model.loading());
    }

    #[tokio::test]
    async fn test_hooks_are_applied() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_fetch = seen.clone();
        let mut model = Model::new(Store::new(1, 20))
            .with_fetcher(move |q: ListQuery| {
                *seen_in_fetch.lock().unwrap() = q.get("tenant").cloned();
                async { Ok::<_, FetchError>(ListResult::from_items(vec![row(1)])) }
            })
            .with_before_fetch(crate::fetch::before_fetch(|mut q| {
                q.set("tenant", json!("acme"));
                q
            }))
            .with_after_fetch(crate::fetch::after_fetch(|mut r: ListResult| async move {
                r.items.push(row(99));
                Ok::<_, FetchError>(r)
            }));

        let cmd = model.load(None).unwrap();
        run(&mut model, cmd).await;

        assert_eq!(*seen.lock().unwrap(), Some(json!("acme")));
        // the hook only transforms the request, not the stored query
        assert!(model.query().get("tenant").is_none());
        assert_eq!(model.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_after_fetch_failure_is_reported() {
        let notes = Recorder::default();
        let mut model = Model::new(Store::new(1, 20))
            .with_notifier(notes.clone())
            .with_fetcher(|_q: ListQuery| async { Ok::<_, FetchError>(ListResult::default()) })
            .with_after_fetch(crate::fetch::after_fetch(|_r: ListResult| async {
                Err::<ListResult, _>(FetchError::Transform("bad payload".into()))
            }));

        let cmd = model.load(None).unwrap();
        run(&mut model, cmd).await;
        assert_eq!(notes.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_set_data_adopts_server_pagination_and_summary() {
        let mut model = Model::new(Store::new(9, 20)).with_row_key("name");
        let summary = json!({"size": 42}).as_object().cloned().unwrap();
        model.set_data(
            ListResult::from_items(vec![row(1)])
                .with_total(30)
                .with_page(2, 25)
                .with_summary(summary),
        );

        assert_eq!(model.paginator().current(), 2);
        assert_eq!(model.paginator().page_size(), 25);
        assert_eq!(model.paginator().total(), 30);
        let summary = model.summary().unwrap();
        assert_eq!(summary["name"], json!("Summary"));
        assert_eq!(summary["size"], json!(42));
    }

    #[test]
    fn test_set_data_clamps_zero_page() {
        let mut model = Model::new(Store::new(1, 20));
        model.set_data(ListResult::default().with_page(0, 0));
        assert_eq!(model.paginator().current(), 1);
        assert_eq!(model.paginator().page_size(), 1);
    }

    #[test]
    fn test_set_data_without_summary_clears_previous() {
        let mut model = Model::new(Store::new(1, 20));
        let summary = json!({"size": 1}).as_object().cloned().unwrap();
        model.set_data(ListResult::default().with_summary(summary));
        assert!(model.summary().is_some());
        model.set_data(ListResult::default());
        assert!(model.summary().is_none());
    }

    #[tokio::test]
    async fn test_last_response_wins_applies_stale_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 20)).with_fetcher(echo_fetcher(calls));

        let old = model.load(Some(QueryPatch::new().page(1))).unwrap();
        let new = model.load(Some(QueryPatch::new().page(2))).unwrap();
        run(&mut model, new).await;
        run(&mut model, old).await;

        assert_eq!(model.rows()[0]["id"], json!(1));
        assert_eq!(model.paginator().current(), 1);
    }

    #[tokio::test]
    async fn test_latest_request_only_drops_stale_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 20))
            .with_fetcher(echo_fetcher(calls))
            .with_ordering(ResponseOrdering::LatestRequestOnly);

        let old = model.load(Some(QueryPatch::new().page(1))).unwrap();
        let new = model.load(Some(QueryPatch::new().page(2))).unwrap();

        run(&mut model, old).await;
        assert!(model.rows().is_empty());
        assert!(model.loading());

        run(&mut model, new).await;
        assert_eq!(model.rows()[0]["id"], json!(2));
        assert!(!model.loading());
    }

    #[tokio::test]
    async fn test_external_loading_is_not_cleared_by_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = Model::new(Store::new(1, 20))
            .with_fetcher(echo_fetcher(calls))
            .with_external_loading(true);
        assert!(model.loading());
        assert!(model.load(None).is_none());

        let cmd = model.load(Some(QueryPatch::search("a"))).unwrap();
        run(&mut model, cmd).await;
        assert!(model.loading());

        model.set_external_loading(Some(false));
        assert!(!model.loading());
        model.set_external_loading(None);
        assert_eq!(model.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_messages_for_other_grids_are_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a = Model::new(Store::new(1, 20)).with_fetcher(echo_fetcher(calls.clone()));
        let mut b = Model::new(Store::new(1, 20)).with_fetcher(echo_fetcher(calls));

        let msg = a.load(None).unwrap().await.unwrap();
        assert!(!b.update(&msg));
        assert!(b.rows().is_empty());
        assert!(a.update(&msg));
        assert_eq!(a.rows().len(), 1);
    }
}
