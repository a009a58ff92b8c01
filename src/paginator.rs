//! Render-facing pagination state for a grid.
//!
//! The paginator does not own the request parameters; it is the projection the
//! UI draws from, derived from the current query and the last reconciled
//! server result. Pages are 1-indexed, matching what backends receive.

use crate::key::{self, KeyMap as KeyMapTrait};
use bubbletea_rs::{KeyMsg, Msg};

/// Above this many pages the dots indicator falls back to `"current/total"`.
const MAX_DOTS: usize = 50;

/// How the pagination indicator is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Type {
    /// `"2/6"`.
    #[default]
    Arabic,
    /// `"○ ● ○ ○ ○ ○"`.
    Dots,
}

/// Key bindings for page navigation.
#[derive(Debug, Clone)]
pub struct PaginatorKeyMap {
    /// Go to the previous page.
    /// Default keys: PageUp, Left Arrow, 'h'
    pub prev_page: key::Binding,
    /// Go to the next page.
    /// Default keys: PageDown, Right Arrow, 'l'
    pub next_page: key::Binding,
}

impl Default for PaginatorKeyMap {
    fn default() -> Self {
        Self {
            prev_page: key::new_binding(vec![
                key::with_keys_str(&["pgup", "left", "h"]),
                key::with_help("←/h", "prev page"),
            ]),
            next_page: key::new_binding(vec![
                key::with_keys_str(&["pgdown", "right", "l"]),
                key::with_help("→/l", "next page"),
            ]),
        }
    }
}

impl KeyMapTrait for PaginatorKeyMap {
    fn short_help(&self) -> Vec<&key::Binding> {
        vec![&self.prev_page, &self.next_page]
    }

    fn full_help(&self) -> Vec<Vec<&key::Binding>> {
        vec![vec![&self.prev_page, &self.next_page]]
    }
}

/// Page navigation requested by a key press.
///
/// The paginator never moves itself in response to keys: the target page is
/// handed back so the grid can route it through its page-change action (which
/// may go through the URL first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigate {
    /// Move to the given 1-indexed page.
    To(usize),
}

/// Pagination state: current page, page size and total item count.
///
/// # Examples
///
/// ```rust
/// use bubbletea_datagrid::paginator::Model;
///
/// let mut p = Model::new().with_page_size(50).with_total(120);
/// assert_eq!(p.total_pages(), 3);
/// assert!(p.on_first_page());
///
/// p.set_current(3);
/// assert!(p.on_last_page());
/// assert_eq!(p.view(), "3/3");
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    /// Indicator style.
    pub paginator_type: Type,
    current: usize,
    page_size: usize,
    total: usize,

    /// Dot for the active page in [`Type::Dots`] mode.
    pub active_dot: String,
    /// Dot for inactive pages in [`Type::Dots`] mode.
    pub inactive_dot: String,

    /// Key bindings.
    pub keymap: PaginatorKeyMap,
}

impl Default for Model {
    /// Page 1, page size 20, no items.
    fn default() -> Self {
        Self {
            paginator_type: Type::default(),
            current: 1,
            page_size: 20,
            total: 0,
            active_dot: "•".to_string(),
            inactive_dot: "○".to_string(),
            keymap: PaginatorKeyMap::default(),
        }
    }
}

impl Model {
    /// Creates a paginator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size (builder pattern). Values below 1 are clamped to 1.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.set_page_size(page_size);
        self
    }

    /// Sets the total item count (builder pattern).
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total;
        self
    }

    /// Sets the current page (builder pattern). Values below 1 are clamped to 1.
    pub fn with_current(mut self, page: usize) -> Self {
        self.set_current(page);
        self
    }

    /// Sets the indicator style (builder pattern).
    pub fn with_type(mut self, paginator_type: Type) -> Self {
        self.paginator_type = paginator_type;
        self
    }

    /// The current 1-indexed page.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Items per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total items reported by the server.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Sets the current page.
    ///
    /// Not clamped to `total_pages()`: the server decides whether a page
    /// exists and reports the page it actually served.
    pub fn set_current(&mut self, page: usize) {
        self.current = page.max(1);
    }

    /// Sets the page size. Values below 1 are clamped to 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    /// Sets the total item count.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
    }

    /// Number of pages needed for `total` items; at least 1.
    pub fn total_pages(&self) -> usize {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    /// Whether the current page is the first one.
    pub fn on_first_page(&self) -> bool {
        self.current == 1
    }

    /// Whether the current page is the last one (or beyond it).
    pub fn on_last_page(&self) -> bool {
        self.current >= self.total_pages()
    }

    /// Zero-based offset of the first item on the current page.
    pub fn offset(&self) -> usize {
        self.current.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Maps a key message to a page navigation request.
    ///
    /// Returns `None` when the key is not a page binding or the move would
    /// leave the valid page range.
    pub fn update(&self, msg: &Msg) -> Option<Navigate> {
        let key_msg = msg.downcast_ref::<KeyMsg>()?;
        if self.keymap.next_page.matches(key_msg) && !self.on_last_page() {
            Some(Navigate::To(self.current + 1))
        } else if self.keymap.prev_page.matches(key_msg) && !self.on_first_page() {
            Some(Navigate::To(self.current - 1))
        } else {
            None
        }
    }

    /// Renders the page indicator.
    pub fn view(&self) -> String {
        match self.paginator_type {
            Type::Arabic => format!("{}/{}", self.current, self.total_pages()),
            Type::Dots => self.dots_view(),
        }
    }

    fn dots_view(&self) -> String {
        if self.total_pages() > MAX_DOTS {
            return format!("{}/{}", self.current, self.total_pages());
        }
        (1..=self.total_pages())
            .map(|page| {
                if page == self.current {
                    self.active_dot.as_str()
                } else {
                    self.inactive_dot.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key_msg(code: KeyCode) -> Msg {
        Box::new(KeyMsg {
            key: code,
            modifiers: KeyModifiers::NONE,
        }) as Msg
    }

    #[test]
    fn test_defaults() {
        let p = Model::new();
        assert_eq!(p.current(), 1);
        assert_eq!(p.page_size(), 20);
        assert_eq!(p.total(), 0);
        assert_eq!(p.total_pages(), 1);
        assert!(p.on_first_page());
        assert!(p.on_last_page());
    }

    #[test]
    fn test_clamps_below_one() {
        let mut p = Model::new().with_page_size(0).with_current(0);
        assert_eq!(p.page_size(), 1);
        assert_eq!(p.current(), 1);
        p.set_current(0);
        assert_eq!(p.current(), 1);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let p = Model::new().with_page_size(50).with_total(120);
        assert_eq!(p.total_pages(), 3);
        let p = Model::new().with_page_size(10).with_total(100);
        assert_eq!(p.total_pages(), 10);
    }

    #[test]
    fn test_offset() {
        let p = Model::new().with_page_size(25).with_current(3);
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn test_update_maps_keys_to_navigation() {
        let p = Model::new()
            .with_page_size(10)
            .with_total(35)
            .with_current(2);
        assert_eq!(p.update(&key_msg(KeyCode::Right)), Some(Navigate::To(3)));
        assert_eq!(p.update(&key_msg(KeyCode::Char('h'))), Some(Navigate::To(1)));
        assert_eq!(p.update(&key_msg(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_update_stops_at_bounds() {
        let first = Model::new().with_page_size(10).with_total(35);
        assert_eq!(first.update(&key_msg(KeyCode::Left)), None);

        let last = Model::new()
            .with_page_size(10)
            .with_total(35)
            .with_current(4);
        assert_eq!(last.update(&key_msg(KeyCode::PageDown)), None);
    }

    #[test]
    fn test_views() {
        let mut p = Model::new()
            .with_page_size(10)
            .with_total(30)
            .with_current(2);
        assert_eq!(p.view(), "2/3");
        p.paginator_type = Type::Dots;
        assert_eq!(p.view(), "○ • ○");
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let mut p = Model::new().with_page_size(100);
        p.set_current(usize::MAX);
        assert_eq!(p.offset(), usize::MAX);
    }

    #[test]
    fn test_dots_fall_back_to_numbers_when_too_many_pages() {
        let mut p = Model::new()
            .with_page_size(1)
            .with_total(1000)
            .with_current(7)
            .with_type(Type::Dots);
        assert_eq!(p.view(), "7/1000");
        p.set_total(MAX_DOTS);
        assert_eq!(p.view().matches('○').count(), MAX_DOTS - 1);
    }
}
