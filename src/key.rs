//! Key bindings used by the grid controller.
//!
//! A [`Binding`] groups one or more key presses under a single action together
//! with the help text a host can show for it. Bindings are built with
//! [`new_binding`] and the `with_*` option functions:
//!
//! ```rust
//! use bubbletea_datagrid::key;
//!
//! let next = key::new_binding(vec![
//!     key::with_keys_str(&["pgdown", "right", "l"]),
//!     key::with_help("→/l", "next page"),
//! ]);
//! assert_eq!(next.keys.len(), 3);
//! ```

use bubbletea_rs::KeyMsg;
use crossterm::event::{KeyCode, KeyModifiers};

/// A single key press: a key code plus the modifiers held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifiers held during the press.
    pub modifiers: KeyModifiers,
}

impl KeyPress {
    /// Parses a key description such as `"l"`, `"pgdown"` or `"ctrl+r"`.
    ///
    /// Returns `None` for names that do not map to a key.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut modifiers = KeyModifiers::NONE;
        let mut name = spec;
        while let Some((prefix, rest)) = name.split_once('+') {
            match prefix {
                "ctrl" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => return None,
            }
            name = rest;
        }

        let code = match name {
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "pgup" => KeyCode::PageUp,
            "pgdown" => KeyCode::PageDown,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Char(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return None,
                }
            }
        };

        Some(Self { code, modifiers })
    }
}

impl From<KeyCode> for KeyPress {
    fn from(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }
}

/// Help text attached to a binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Help {
    /// Short key label, e.g. `"→/l"`.
    pub key: String,
    /// What the binding does, e.g. `"next page"`.
    pub desc: String,
}

/// A named action bound to one or more key presses.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    /// Key presses that trigger the action.
    pub keys: Vec<KeyPress>,
    /// Help text for the action.
    pub help: Help,
    /// Disabled bindings never match.
    pub disabled: bool,
}

impl Binding {
    /// Creates an enabled binding for the given key presses.
    pub fn new<K: Into<KeyPress>>(keys: Vec<K>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            help: Help::default(),
            disabled: false,
        }
    }

    /// Sets the help text (builder pattern).
    pub fn with_help(mut self, key: impl Into<String>, desc: impl Into<String>) -> Self {
        self.help = Help {
            key: key.into(),
            desc: desc.into(),
        };
        self
    }

    /// Reports whether the key message triggers this binding.
    pub fn matches(&self, msg: &KeyMsg) -> bool {
        !self.disabled
            && self
                .keys
                .iter()
                .any(|k| k.code == msg.key && k.modifiers == msg.modifiers)
    }
}

/// Option applied by [`new_binding`].
pub type BindingOpt = Box<dyn FnOnce(&mut Binding)>;

/// Builds a binding from a list of options.
pub fn new_binding(opts: Vec<BindingOpt>) -> Binding {
    let mut binding = Binding::default();
    for opt in opts {
        opt(&mut binding);
    }
    binding
}

/// Sets the keys of a binding from their string descriptions.
///
/// Unknown names are skipped.
pub fn with_keys_str(keys: &[&str]) -> BindingOpt {
    let parsed: Vec<KeyPress> = keys.iter().filter_map(|k| KeyPress::parse(k)).collect();
    Box::new(move |b| b.keys = parsed)
}

/// Sets the help text of a binding.
pub fn with_help(key: &str, desc: &str) -> BindingOpt {
    let help = Help {
        key: key.to_string(),
        desc: desc.to_string(),
    };
    Box::new(move |b| b.help = help)
}

/// Marks a binding as disabled.
pub fn with_disabled() -> BindingOpt {
    Box::new(|b| b.disabled = true)
}

/// Collection of bindings a component exposes for help views.
pub trait KeyMap {
    /// Bindings for the compact, single-line help.
    fn short_help(&self) -> Vec<&Binding>;
    /// Bindings grouped into columns for the expanded help.
    fn full_help(&self) -> Vec<Vec<&Binding>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyMsg {
        KeyMsg {
            key: code,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_parse_named_and_char_keys() {
        assert_eq!(KeyPress::parse("pgdown").unwrap().code, KeyCode::PageDown);
        assert_eq!(KeyPress::parse("h").unwrap().code, KeyCode::Char('h'));
        let ctrl_r = KeyPress::parse("ctrl+r").unwrap();
        assert_eq!(ctrl_r.code, KeyCode::Char('r'));
        assert_eq!(ctrl_r.modifiers, KeyModifiers::CONTROL);
        assert!(KeyPress::parse("nope").is_none());
        assert!(KeyPress::parse("meta+x").is_none());
    }

    #[test]
    fn test_binding_matches() {
        let b = new_binding(vec![
            with_keys_str(&["left", "h"]),
            with_help("←/h", "prev page"),
        ]);
        assert!(b.matches(&key(KeyCode::Left)));
        assert!(b.matches(&key(KeyCode::Char('h'))));
        assert!(!b.matches(&key(KeyCode::Right)));
        assert_eq!(b.help.desc, "prev page");
    }

    #[test]
    fn test_disabled_binding_never_matches() {
        let b = new_binding(vec![with_keys_str(&["r"]), with_disabled()]);
        assert!(!b.matches(&key(KeyCode::Char('r'))));
    }
}
