//! Mirrors grid pagination into the address bar.
//!
//! The bridge reads the page and page-size query parameters when a grid is
//! created and rewrites them whenever pagination changes. Writes go through
//! [`Router::replace`] so pagination never adds history entries, and the
//! parameters are dropped from the URL while they hold their default values,
//! which keeps shared links short.
//!
//! # Examples
//!
//! ```rust
//! use bubbletea_datagrid::location::MemoryRouter;
//! use bubbletea_datagrid::urlsync::{Model, UrlSyncConfig};
//!
//! let router = MemoryRouter::from_url("/list?pageSize=50");
//! let mut bridge = Model::new(UrlSyncConfig::default(), Box::new(router));
//! assert_eq!(bridge.init_from_url(), (1, 50));
//!
//! bridge.update_pagination(Some(2), None);
//! assert_eq!(bridge.router().location().to_string(), "/list?page=2&pageSize=50");
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::location::Router;

/// Names and defaults used for URL pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlSyncConfig {
    /// Query parameter holding the 1-indexed page.
    pub page_param: String,
    /// Query parameter holding the page size.
    pub page_size_param: String,
    /// Page size assumed when the URL carries none.
    pub default_page_size: usize,
}

impl Default for UrlSyncConfig {
    fn default() -> Self {
        Self {
            page_param: "page".to_string(),
            page_size_param: "pageSize".to_string(),
            default_page_size: 20,
        }
    }
}

impl UrlSyncConfig {
    /// Sets the page parameter name (builder pattern).
    pub fn with_page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = name.into();
        self
    }

    /// Sets the page-size parameter name (builder pattern).
    pub fn with_page_size_param(mut self, name: impl Into<String>) -> Self {
        self.page_size_param = name.into();
        self
    }

    /// Sets the default page size (builder pattern). Clamped to at least 1.
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }
}

/// Parses a positive integer query value. Anything else is `None`.
fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse::<i64>().ok().filter(|n| *n >= 1).map(|n| n as usize)
}

/// The URL pagination bridge.
pub struct Model {
    config: UrlSyncConfig,
    router: Box<dyn Router>,
    page: usize,
    page_size: usize,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates a bridge and seeds its state from the router's current URL.
    pub fn new(config: UrlSyncConfig, router: Box<dyn Router>) -> Self {
        let mut bridge = Self {
            page: 1,
            page_size: config.default_page_size.max(1),
            config,
            router,
        };
        let (page, page_size) = bridge.init_from_url();
        bridge.page = page;
        bridge.page_size = page_size;
        bridge
    }

    /// The active configuration.
    pub fn config(&self) -> &UrlSyncConfig {
        &self.config
    }

    /// The router the bridge writes through.
    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    /// Mutable access to the router, e.g. to simulate navigation.
    pub fn router_mut(&mut self) -> &mut dyn Router {
        self.router.as_mut()
    }

    /// The bridge's current `(page, page_size)`.
    pub fn pagination(&self) -> (usize, usize) {
        (self.page, self.page_size)
    }

    /// Reads `(page, page_size)` from the current URL.
    ///
    /// Missing, non-numeric, zero or negative values fall back to page 1 and
    /// the configured default page size. Never fails.
    pub fn init_from_url(&self) -> (usize, usize) {
        let location = self.router.location();
        let page = parse_positive(location.query_value(&self.config.page_param)).unwrap_or(1);
        let page_size = parse_positive(location.query_value(&self.config.page_size_param))
            .unwrap_or(self.config.default_page_size.max(1));
        (page, page_size)
    }

    /// Rewrites the pagination parameters in the URL.
    ///
    /// A parameter is omitted when absent or at its default (page 1, default
    /// page size). Every other query parameter and the path are preserved; the
    /// pagination parameters are written after them, page first.
    pub fn update_url(&mut self, page: Option<usize>, page_size: Option<usize>) {
        let mut location = self.router.location();
        location.remove_query(&self.config.page_param);
        location.remove_query(&self.config.page_size_param);

        if let Some(page) = page.filter(|p| *p > 1) {
            location
                .query
                .push((self.config.page_param.clone(), page.to_string()));
        }
        if let Some(page_size) = page_size.filter(|s| *s != self.config.default_page_size) {
            location
                .query
                .push((self.config.page_size_param.clone(), page_size.to_string()));
        }

        debug!(url = %location, "replacing location");
        self.router.replace(location);
    }

    /// Applies new pagination values and mirrors them into the URL.
    ///
    /// Supplying only a page size resets the page to 1. Returns the resulting
    /// `(page, page_size)`.
    pub fn update_pagination(
        &mut self,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> (usize, usize) {
        if let Some(page) = page {
            self.page = page.max(1);
        }
        if let Some(page_size) = page_size {
            self.page_size = page_size.max(1);
            if page.is_none() {
                self.page = 1;
            }
        }

        self.update_url(Some(self.page), Some(self.page_size));
        (self.page, self.page_size)
    }
}
