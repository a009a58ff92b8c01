//! Addressable locations and the router port the URL bridge writes through.
//!
//! A [`Location`] is the part of a URL a grid cares about: the route path, its
//! path parameters and the ordered query string. Hosts implement [`Router`] on
//! top of whatever owns the address bar; [`MemoryRouter`] is the in-process
//! implementation used by terminal hosts and tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use url::form_urlencoded;

/// Errors raised when parsing a location string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Locations are absolute route paths.
    #[error("location must start with '/': {0:?}")]
    NotAbsolute(String),
}

/// A route path plus its query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Optional route name.
    pub name: Option<String>,
    /// Route path, e.g. `/hosts/3/files`.
    pub path: String,
    /// Path parameters resolved for this route.
    pub path_params: BTreeMap<String, String>,
    /// Query parameters in address-bar order. Duplicate keys are kept.
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Creates a location for a path with no query.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parses `"/path?key=value&..."`. A `#fragment` suffix is ignored.
    ///
    /// ```rust
    /// use bubbletea_datagrid::location::Location;
    ///
    /// let loc = Location::parse("/list?pageSize=50&q=a%20b").unwrap();
    /// assert_eq!(loc.path, "/list");
    /// assert_eq!(loc.query_value("pageSize"), Some("50"));
    /// assert_eq!(loc.query_value("q"), Some("a b"));
    /// ```
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        if !input.starts_with('/') {
            return Err(LocationError::NotAbsolute(input.to_string()));
        }
        let without_fragment = input.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_fragment, ""),
        };

        Ok(Self {
            name: None,
            path: path.to_string(),
            path_params: BTreeMap::new(),
            query: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        })
    }

    /// Sets the route name (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a path parameter (builder pattern).
    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    /// Appends a query parameter (builder pattern).
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// First value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a query parameter.
    ///
    /// Replaces the first occurrence in place and drops later duplicates; a
    /// new key is appended.
    pub fn set_query(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.query.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.query[index].1 = value;
                let mut seen = 0;
                self.query.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.query.push((key.to_string(), value)),
        }
    }

    /// Removes every occurrence of a query parameter.
    pub fn remove_query(&mut self, key: &str) {
        self.query.retain(|(k, _)| k != key);
    }

    /// The encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query_string())
        }
    }
}

/// Read/replace access to the current location.
///
/// `replace` swaps the current history entry: it must not create a new entry
/// and must not alter path segments.
pub trait Router: Send {
    /// The current location.
    fn location(&self) -> Location;
    /// Replaces the current history entry.
    fn replace(&mut self, location: Location);
}

/// In-memory router with a history stack.
///
/// Clones share the same history, so a host can keep a handle while the grid
/// owns another.
#[derive(Debug, Clone)]
pub struct MemoryRouter {
    history: Arc<Mutex<Vec<Location>>>,
}

impl MemoryRouter {
    /// Starts with a single history entry.
    pub fn new(location: Location) -> Self {
        Self {
            history: Arc::new(Mutex::new(vec![location])),
        }
    }

    /// Parses the initial location, falling back to `/` on invalid input.
    pub fn from_url(url: &str) -> Self {
        Self::new(Location::parse(url).unwrap_or_else(|_| Location::new("/")))
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Location>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Navigates to a new location, adding a history entry.
    pub fn push(&self, location: Location) {
        self.entries().push(location);
    }

    /// Number of history entries.
    pub fn history_len(&self) -> usize {
        self.entries().len()
    }

    /// The current location rendered as a string.
    pub fn url(&self) -> String {
        self.location().to_string()
    }
}

impl Router for MemoryRouter {
    fn location(&self) -> Location {
        self.entries().last().cloned().unwrap_or_default()
    }

    fn replace(&mut self, location: Location) {
        let mut entries = self.entries();
        match entries.last_mut() {
            Some(current) => {
                let path = std::mem::take(&mut current.path);
                let path_params = std::mem::take(&mut current.path_params);
                *current = Location {
                    path,
                    path_params,
                    ..location
                };
            }
            None => entries.push(location),
        }
    }
}
