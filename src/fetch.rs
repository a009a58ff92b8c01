//! The collaborators a grid talks to: the fetch function, its transform
//! hooks and the user-facing message sink.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::error;

use crate::query::ListQuery;

/// One record of a list result.
pub type Row = Map<String, Value>;

/// What a backend returns for one page.
///
/// `page`, `page_size` and `total` are authoritative when present: backends
/// may clamp out-of-range requests and the grid adopts what they report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    /// Rows of the page.
    #[serde(default)]
    pub items: Vec<Row>,
    /// Total rows across all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    /// Page actually served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Page size actually used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Aggregate row shown below the data.
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub summary: Option<Row>,
}

impl ListResult {
    /// A result holding just the given rows.
    pub fn from_items(items: Vec<Row>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Sets the total (builder pattern).
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Sets the served page and page size (builder pattern).
    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// Sets the summary row (builder pattern).
    pub fn with_summary(mut self, summary: Row) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// A failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request failed; carries the transport's message.
    #[error("{0}")]
    Request(String),
    /// The `after_fetch` hook rejected the result.
    #[error("{0}")]
    Transform(String),
}

impl FetchError {
    /// Convenience constructor for request failures.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    /// The message shown to users.
    pub fn message(&self) -> &str {
        match self {
            Self::Request(message) | Self::Transform(message) => message,
        }
    }
}

/// Boxed future returned by fetchers and hooks.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// The external fetch function.
///
/// Implemented for any `Fn(ListQuery) -> impl Future<Output =
/// Result<ListResult, FetchError>>`:
///
/// ```rust
/// use bubbletea_datagrid::fetch::{Fetcher, FetchError, ListResult};
/// use bubbletea_datagrid::query::ListQuery;
///
/// fn takes_fetcher(_: impl Fetcher) {}
///
/// takes_fetcher(|query: ListQuery| async move {
///     Ok::<_, FetchError>(ListResult::default().with_page(query.page(), query.page_size()))
/// });
/// ```
pub trait Fetcher: Send + Sync {
    /// Fetches one page. Failures must be reported as `Err`, never as a
    /// successful payload.
    fn fetch(&self, query: ListQuery) -> BoxFuture<Result<ListResult, FetchError>>;
}

impl<F, Fut> Fetcher for F
where
    F: Fn(ListQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ListResult, FetchError>> + Send + 'static,
{
    fn fetch(&self, query: ListQuery) -> BoxFuture<Result<ListResult, FetchError>> {
        Box::pin(self(query))
    }
}

/// Synchronous transform applied to the query before fetching.
pub type BeforeFetch = Arc<dyn Fn(ListQuery) -> ListQuery + Send + Sync>;

/// Asynchronous transform applied to a successful result.
pub type AfterFetch =
    Arc<dyn Fn(ListResult) -> BoxFuture<Result<ListResult, FetchError>> + Send + Sync>;

/// Wraps a closure as an [`AfterFetch`] hook.
pub fn after_fetch<F, Fut>(hook: F) -> AfterFetch
where
    F: Fn(ListResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ListResult, FetchError>> + Send + 'static,
{
    Arc::new(move |result| Box::pin(hook(result)))
}

/// Wraps a closure as a [`BeforeFetch`] hook.
pub fn before_fetch<F>(hook: F) -> BeforeFetch
where
    F: Fn(ListQuery) -> ListQuery + Send + Sync + 'static,
{
    Arc::new(hook)
}

/// Sink for user-visible notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Shows an error to the user.
    fn notify_error(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!(%message, "grid notification");
    }
}
