//! Process-wide pinned items, such as favorite directories shown beside a
//! file grid.
//!
//! The list is shared by every grid in the process. It is read from a
//! [`Persistence`] port the first time it is used and written back after
//! every change. [`PinnedItems::init_global`] installs the process-wide
//! instance once, before first use; [`PinnedItems::global`] falls back to an
//! in-memory store when nothing was installed.
//!
//! # Examples
//!
//! ```rust
//! use bubbletea_datagrid::pinned::{MemoryPersistence, PinnedItems};
//!
//! let pins = PinnedItems::new(MemoryPersistence::default());
//! pins.pin("/var/log/", None).unwrap();
//! assert!(pins.is_pinned("/var/log"));
//! assert_eq!(pins.items()[0].name, "log");
//! ```

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

static GLOBAL: OnceCell<PinnedItems> = OnceCell::new();

/// A pinned path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedItem {
    /// Backend identifier, when the store assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Normalized path.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Milliseconds since the Unix epoch when the path was last checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<u64>,
    #[serde(default = "default_exists")]
    pub exists: bool,
}

fn default_exists() -> bool {
    true
}

impl PinnedItem {
    /// A pin for `path` named after its last segment unless `name` is given.
    pub fn new(path: &str, name: Option<&str>) -> Self {
        let path = normalize_path(path);
        let name = name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| display_name(&path));
        Self {
            id: None,
            path,
            name,
            last_seen: Some(now_millis()),
            exists: true,
        }
    }
}

/// A failure of the persistence port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("failed to load pinned items: {0}")]
    Load(String),
    #[error("failed to save pinned items: {0}")]
    Save(String),
}

/// Where pinned items are stored.
pub trait Persistence: Send + Sync {
    fn load(&self) -> Result<Vec<PinnedItem>, PersistenceError>;
    fn save(&self, items: &[PinnedItem]) -> Result<(), PersistenceError>;
}

/// Keeps pinned items in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    items: Arc<Mutex<Vec<PinnedItem>>>,
}

impl MemoryPersistence {
    /// Storage pre-filled with `items`.
    pub fn with_items(items: Vec<PinnedItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
        }
    }

    /// What is currently stored.
    pub fn stored(&self) -> Vec<PinnedItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<PinnedItem>, PersistenceError> {
        Ok(self.stored())
    }

    fn save(&self, items: &[PinnedItem]) -> Result<(), PersistenceError> {
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
        Ok(())
    }
}

#[derive(Default)]
struct State {
    loaded: bool,
    items: Vec<PinnedItem>,
}

/// The pinned item list.
pub struct PinnedItems {
    persistence: Box<dyn Persistence>,
    state: Mutex<State>,
}

impl std::fmt::Debug for PinnedItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PinnedItems")
            .field("loaded", &state.loaded)
            .field("items", &state.items)
            .finish_non_exhaustive()
    }
}

impl PinnedItems {
    /// Creates a list backed by `persistence`. Nothing is read until first
    /// use.
    pub fn new(persistence: impl Persistence + 'static) -> Self {
        Self {
            persistence: Box::new(persistence),
            state: Mutex::new(State::default()),
        }
    }

    /// Installs the process-wide list. Returns `false` when one is already
    /// installed, in which case `persistence` is dropped.
    pub fn init_global(persistence: impl Persistence + 'static) -> bool {
        GLOBAL.set(Self::new(persistence)).is_ok()
    }

    /// The process-wide list, created in memory if none was installed.
    pub fn global() -> &'static PinnedItems {
        GLOBAL.get_or_init(|| Self::new(MemoryPersistence::default()))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The state, read from persistence if needed. Read failures leave the
    /// list empty and are retried on next use.
    fn loaded(&self) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        if !state.loaded {
            let _ = self.fill(&mut state);
        }
        state
    }

    /// Like [`Self::loaded`], but fails when persistence could not be read.
    /// Saving an unread list would overwrite what is stored.
    fn writable(&self) -> Result<MutexGuard<'_, State>, PersistenceError> {
        let mut state = self.lock();
        if !state.loaded {
            self.fill(&mut state)?;
        }
        Ok(state)
    }

    fn fill(&self, state: &mut State) -> Result<(), PersistenceError> {
        match self.persistence.load() {
            Ok(items) => {
                let mut items: Vec<PinnedItem> = items
                    .into_iter()
                    .map(|mut item| {
                        item.path = normalize_path(&item.path);
                        item
                    })
                    .collect();
                sort_items(&mut items);
                debug!(count = items.len(), "pinned items loaded");
                state.items = items;
                state.loaded = true;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "pinned items unavailable");
                state.items.clear();
                state.loaded = false;
                Err(err)
            }
        }
    }

    /// Re-reads the list from persistence.
    pub fn reload(&self) {
        let mut state = self.lock();
        let _ = self.fill(&mut state);
    }

    /// Pinned items sorted by name.
    pub fn items(&self) -> Vec<PinnedItem> {
        self.loaded().items.clone()
    }

    pub fn is_pinned(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.loaded().items.iter().any(|item| item.path == path)
    }

    /// Pins a path. Pinning an already pinned path does nothing.
    ///
    /// The list is only changed once persistence accepted it. Fails with
    /// [`PersistenceError::Load`] without saving when the stored list cannot
    /// be read.
    pub fn pin(&self, path: &str, name: Option<&str>) -> Result<(), PersistenceError> {
        let item = PinnedItem::new(path, name);
        let mut state = self.writable()?;
        if state.items.iter().any(|p| p.path == item.path) {
            return Ok(());
        }

        let mut items = state.items.clone();
        items.push(item);
        sort_items(&mut items);
        self.persistence.save(&items)?;
        state.items = items;
        Ok(())
    }

    /// Unpins a path. Unknown paths are ignored. Like [`Self::pin`], never
    /// saves over a list it could not read.
    pub fn unpin(&self, path: &str) -> Result<(), PersistenceError> {
        let path = normalize_path(path);
        let mut state = self.writable()?;
        if !state.items.iter().any(|p| p.path == path) {
            return Ok(());
        }

        let items: Vec<PinnedItem> = state
            .items
            .iter()
            .filter(|p| p.path != path)
            .cloned()
            .collect();
        self.persistence.save(&items)?;
        state.items = items;
        Ok(())
    }

    /// Records whether a pinned path still exists. Only touches the item when
    /// the flag changes; the change is not persisted.
    pub fn mark_exists(&self, path: &str, exists: bool) {
        let path = normalize_path(path);
        let mut state = self.loaded();
        if let Some(item) = state
            .items
            .iter_mut()
            .find(|p| p.path == path && p.exists != exists)
        {
            item.exists = exists;
            item.last_seen = Some(now_millis());
        }
    }
}

/// Strips trailing slashes and ensures a leading one.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn display_name(path: &str) -> String {
    match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => path.to_string(),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn sort_items(items: &mut [PinnedItem]) {
    items.sort_by(|a, b| natural_cmp(&a.name, &b.name));
}

/// Case-insensitive order that compares digit runs by value. Names equal
/// apart from case put lowercase first.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l = take_digits(&mut left);
                let r = take_digits(&mut right);
                let ord = l.len().cmp(&r.len()).then_with(|| l.cmp(&r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
    // ASCII puts uppercase first; reverse it
    b.cmp(a)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    let trimmed = digits.trim_start_matches('0');
    trimmed.to_string()
}
