//! Global hotkeys, backed by `rdev`.
//!
//! Two keys are watched: one toggles the call, the other opens or closes
//! the panel.  Key presses become [`AssistantCommand`]s sent straight to the
//! controller; auto-repeat while a key is held produces a single command.
//!
//! ```no_run
//! use growth_assistant::config::AssistantConfig;
//! use growth_assistant::hotkey::{HotkeyBindings, HotkeyListener};
//!
//! let (tx, _rx) = tokio::sync::mpsc::channel(16);
//! let bindings = HotkeyBindings::from_config(&AssistantConfig::default()).unwrap();
//! let _listener = HotkeyListener::start(bindings, tx).unwrap();
//! ```

pub mod listener;

use thiserror::Error;

use crate::config::AssistantConfig;
use crate::session::AssistantCommand;

pub use listener::HotkeyListener;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hotkey name: {0:?}")]
pub struct UnknownKey(pub String);

/// Which physical keys drive the assistant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub call: rdev::Key,
    pub panel: rdev::Key,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            call: rdev::Key::F9,
            panel: rdev::Key::F10,
        }
    }
}

impl HotkeyBindings {
    pub fn from_config(config: &AssistantConfig) -> Result<Self, UnknownKey> {
        let lookup = |name: &str| parse_key(name).ok_or_else(|| UnknownKey(name.to_string()));
        Ok(Self {
            call: lookup(&config.call_key)?,
            panel: lookup(&config.panel_key)?,
        })
    }

    /// Command bound to `key`, if any.
    pub fn command_for(&self, key: rdev::Key) -> Option<AssistantCommand> {
        if key == self.call {
            Some(AssistantCommand::ToggleCall)
        } else if key == self.panel {
            Some(AssistantCommand::TogglePanel)
        } else {
            None
        }
    }
}

/// Parse a key name from the config file.
///
/// Accepts `F1`–`F12`, single letters (either case) and a handful of named
/// keys.
///
/// ```
/// use growth_assistant::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
/// assert_eq!(parse_key("k"), Some(rdev::Key::KeyK));
/// assert_eq!(parse_key("Ctrl+K"), None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key::*;

    let name = name.trim();
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        let function = [F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12];
        return function.get(usize::from(n).checked_sub(1)?).copied();
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let letters = [
            KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN,
            KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
        ];
        let c = c.to_ascii_uppercase();
        return c
            .is_ascii_uppercase()
            .then(|| letters[(c as u8 - b'A') as usize]);
    }

    match name {
        "Escape" | "Esc" => Some(Escape),
        "Space" => Some(Space),
        "Pause" => Some(Pause),
        "ScrollLock" => Some(ScrollLock),
        "PrintScreen" => Some(PrintScreen),
        "Insert" => Some(Insert),
        "Home" => Some(Home),
        "End" => Some(End),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_parse() {
        assert_eq!(parse_key("F1"), Some(rdev::Key::F1));
        assert_eq!(parse_key("F10"), Some(rdev::Key::F10));
        assert_eq!(parse_key("F12"), Some(rdev::Key::F12));
        assert_eq!(parse_key("F0"), None);
        assert_eq!(parse_key("F13"), None);
    }

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(parse_key("a"), Some(rdev::Key::KeyA));
        assert_eq!(parse_key("Z"), Some(rdev::Key::KeyZ));
        assert_eq!(parse_key("1"), None);
    }

    #[test]
    fn named_keys_and_unknowns() {
        assert_eq!(parse_key("Esc"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Pause"), Some(rdev::Key::Pause));
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }

    #[test]
    fn default_bindings_map_to_commands() {
        let bindings = HotkeyBindings::from_config(&AssistantConfig::default()).unwrap();
        assert_eq!(
            bindings.command_for(rdev::Key::F9),
            Some(AssistantCommand::ToggleCall)
        );
        assert_eq!(
            bindings.command_for(rdev::Key::F10),
            Some(AssistantCommand::TogglePanel)
        );
        assert_eq!(bindings.command_for(rdev::Key::KeyQ), None);
    }

    #[test]
    fn bad_config_key_is_reported() {
        let config = AssistantConfig {
            call_key: "Hyper".into(),
            ..AssistantConfig::default()
        };
        assert_eq!(
            HotkeyBindings::from_config(&config),
            Err(UnknownKey("Hyper".into()))
        );
    }
}
