//! `rdev::listen` on a dedicated OS thread.
//!
//! `rdev::listen` blocks forever and cannot be stopped, so dropping the
//! [`HotkeyListener`] only raises a flag that makes the callback ignore
//! further events.  The thread itself lives until the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::session::AssistantCommand;

use super::HotkeyBindings;

pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

/// Turns raw key events into commands, one per physical press.
#[derive(Debug)]
pub struct PressTracker {
    bindings: HotkeyBindings,
    held: Vec<rdev::Key>,
}

impl PressTracker {
    pub fn new(bindings: HotkeyBindings) -> Self {
        Self {
            bindings,
            held: Vec::new(),
        }
    }

    pub fn on_event(&mut self, event: &rdev::EventType) -> Option<AssistantCommand> {
        match *event {
            rdev::EventType::KeyPress(key) => {
                let command = self.bindings.command_for(key)?;
                // OS auto-repeat sends presses without releases.
                if self.held.contains(&key) {
                    return None;
                }
                self.held.push(key);
                Some(command)
            }
            rdev::EventType::KeyRelease(key) => {
                self.held.retain(|k| *k != key);
                None
            }
            _ => None,
        }
    }
}

impl HotkeyListener {
    pub fn start(
        bindings: HotkeyBindings,
        tx: mpsc::Sender<AssistantCommand>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut tracker = PressTracker::new(bindings);
                let result = rdev::listen(move |event| {
                    if stopped.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Some(command) = tracker.on_event(&event.event_type) {
                        log::debug!("hotkey: {command:?}");
                        let _ = tx.blocking_send(command);
                    }
                });
                if let Err(e) = result {
                    log::error!("hotkey listener exited: {e:?}");
                }
            })?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{EventType, Key};

    fn tracker() -> PressTracker {
        PressTracker::new(HotkeyBindings {
            call: Key::F9,
            panel: Key::F10,
        })
    }

    #[test]
    fn held_key_fires_once() {
        let mut t = tracker();
        assert_eq!(
            t.on_event(&EventType::KeyPress(Key::F9)),
            Some(AssistantCommand::ToggleCall)
        );
        assert_eq!(t.on_event(&EventType::KeyPress(Key::F9)), None);
        assert_eq!(t.on_event(&EventType::KeyRelease(Key::F9)), None);
        assert_eq!(
            t.on_event(&EventType::KeyPress(Key::F9)),
            Some(AssistantCommand::ToggleCall)
        );
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut t = tracker();
        assert_eq!(t.on_event(&EventType::KeyPress(Key::KeyA)), None);
        assert_eq!(
            t.on_event(&EventType::KeyPress(Key::F10)),
            Some(AssistantCommand::TogglePanel)
        );
    }
}
