#![doc(html_root_url = "https://docs.rs/bubbletea-datagrid/")]

//! # bubbletea-datagrid
//!
//! A reusable list-view controller for [bubbletea-rs](https://github.com/joshka/bubbletea-rs)
//! applications: the state behind any paginated, filterable, sortable,
//! column-configurable data grid, independent of what the rows contain.
//!
//! ## Overview
//!
//! A grid reconciles three writers that change independently: fetch results
//! coming back from a backend, UI events, and the address bar. Each concern
//! lives in its own component, following the Elm Architecture with `update()`
//! and `view()` methods:
//!
//! - [`urlsync`]: mirrors page and page size into the URL query string.
//! - [`query`]: the current request parameters and the store merging patches
//!   into them.
//! - [`loader`]: the fetch lifecycle, from `load()` to reconciliation.
//! - [`columns`]: visibility, order and density on top of a column schema.
//! - [`selection`]: which rows are selected.
//! - [`grid`]: the controller turning UI events into loads.
//!
//! Supporting modules: [`fetch`] (collaborator traits), [`location`] (the
//! router port), [`filter`] (filter definitions), [`pinned`] (process-wide
//! pinned items), [`paginator`], [`table`] and [`key`].
//!
//! ## Loading data
//!
//! `load()` never blocks. It returns a [`bubbletea_rs::Cmd`] that performs the
//! fetch and resolves to a [`loader::LoadedMsg`]; feeding that message back
//! through `update()` applies the result:
//!
//! ```rust
//! use bubbletea_datagrid::prelude::*;
//! use bubbletea_rs::{Cmd, Model, Msg};
//!
//! struct App {
//!     grid: GridModel,
//! }
//!
//! impl Model for App {
//!     fn init() -> (Self, Option<Cmd>) {
//!         let mut grid = GridModel::new(
//!             GridConfig::default(),
//!             vec![Column::new("name", "Name"), Column::new("status", "Status")],
//!         )
//!         .with_fetcher(|query: ListQuery| async move {
//!             Ok::<_, FetchError>(ListResult::default().with_page(query.page(), query.page_size()))
//!         });
//!         let cmd = grid.init();
//!         (Self { grid }, cmd)
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Option<Cmd> {
//!         self.grid.update(msg)
//!     }
//!
//!     fn view(&self) -> String {
//!         self.grid.view()
//!     }
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

pub mod columns;
pub mod fetch;
pub mod filter;
pub mod grid;
pub mod key;
pub mod loader;
pub mod location;
pub mod paginator;
pub mod pinned;
pub mod query;
pub mod selection;
pub mod table;
pub mod urlsync;

pub use columns::{Column, ColumnDescriptor, Density};
pub use fetch::{FetchError, Fetcher, ListResult, LogNotifier, Notifier, Row};
pub use filter::{FilterError, FilterForm, FilterItem, FilterKind, FilterValue};
pub use grid::{GridConfig, GridEvent, Model as Grid};
pub use key::{new_binding, with_disabled, with_help, with_keys_str, Binding, KeyMap, KeyPress};
pub use loader::{LoadState, LoadedMsg, ResponseOrdering};
pub use location::{Location, LocationError, MemoryRouter, Router};
pub use paginator::Model as Paginator;
pub use pinned::{MemoryPersistence, Persistence, PersistenceError, PinnedItem, PinnedItems};
pub use query::{ListQuery, QueryPatch};
pub use urlsync::UrlSyncConfig;

/// Commonly used types, for glob import.
///
/// ```rust
/// use bubbletea_datagrid::prelude::*;
///
/// let config = GridConfig::default().with_url_sync(UrlSyncConfig::default());
/// let grid = GridModel::new(config, vec![Column::new("id", "ID")])
///     .with_router(Box::new(MemoryRouter::from_url("/hosts?page=3")));
/// assert_eq!(grid.query().page(), 3);
/// ```
pub mod prelude {
    pub use crate::columns::{Column, ColumnDescriptor, Density, Model as ColumnManager};
    pub use crate::fetch::{
        after_fetch, before_fetch, FetchError, Fetcher, ListResult, LogNotifier, Notifier, Row,
    };
    pub use crate::filter::{FilterError, FilterForm, FilterItem, FilterKind, FilterValue};
    pub use crate::grid::{GridConfig, GridEvent, Model as GridModel};
    pub use crate::key::{Binding, KeyMap, KeyPress};
    pub use crate::loader::{LoadState, LoadedMsg, Model as DataLoader, ResponseOrdering};
    pub use crate::location::{Location, MemoryRouter, Router};
    pub use crate::paginator::Model as Paginator;
    pub use crate::pinned::{MemoryPersistence, Persistence, PinnedItem, PinnedItems};
    pub use crate::query::{ListQuery, QueryPatch};
    pub use crate::selection::Model as SelectionTracker;
    pub use crate::urlsync::{Model as UrlBridge, UrlSyncConfig};
}
