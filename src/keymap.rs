use winit::keyboard::{Key, NamedKey};

use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Logical actions and the configurable key bindings that trigger them
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CopyAndAdvance,
    Next,
    Prev,
    MarkDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Named(NamedKey),
    Char(char),
}

/// Parse a symbolic key name from the settings file ("Right", "Space",
/// "K", ...) into a binding. Single characters are matched
/// case-insensitively.
fn parse_key_name(name: &str) -> Option<Binding> {
    let named = match name.trim().to_ascii_lowercase().as_str() {
        "right" => Some(NamedKey::ArrowRight),
        "left" => Some(NamedKey::ArrowLeft),
        "up" => Some(NamedKey::ArrowUp),
        "down" => Some(NamedKey::ArrowDown),
        "space" => Some(NamedKey::Space),
        "delete" => Some(NamedKey::Delete),
        "backspace" => Some(NamedKey::Backspace),
        "enter" | "return" => Some(NamedKey::Enter),
        "tab" => Some(NamedKey::Tab),
        "home" => Some(NamedKey::Home),
        "end" => Some(NamedKey::End),
        "pageup" => Some(NamedKey::PageUp),
        "pagedown" => Some(NamedKey::PageDown),
        "insert" => Some(NamedKey::Insert),
        _ => None,
    };
    if let Some(n) = named {
        return Some(Binding::Named(n));
    }
    let mut chars = name.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(Binding::Char(c.to_ascii_lowercase())),
        _ => None,
    }
}

/// Maps pressed keys to review actions, independent of how the shell
/// captures input.
pub struct KeyMap {
    bindings: Vec<(Binding, Action)>,
}

impl KeyMap {
    pub fn from_settings(settings: &Settings) -> KeyMap {
        let configured = [
            (&settings.key_copy, Action::CopyAndAdvance),
            (&settings.key_next, Action::Next),
            (&settings.key_prev, Action::Prev),
            (&settings.key_delete, Action::MarkDelete),
        ];
        let mut bindings = Vec::new();
        for (name, action) in configured {
            match parse_key_name(name) {
                Some(binding) => bindings.push((binding, action)),
                None => log::warn!("unrecognized key name {:?} for {:?}", name, action),
            }
        }
        KeyMap { bindings }
    }

    pub fn action_for(&self, key: &Key) -> Option<Action> {
        let pressed = match key {
            Key::Named(named) => Binding::Named(*named),
            Key::Character(s) => Binding::Char(s.chars().next()?.to_ascii_lowercase()),
            _ => return None,
        };
        self.bindings
            .iter()
            .find(|(binding, _)| *binding == pressed)
            .map(|(_, action)| *action)
    }
}
