//! Growth Experts "Secure Line" assistant.
//!
//! A floating call widget that drives one AI sales-assistant session at a
//! time.  The [`session::SessionController`] owns the lifecycle; everything
//! else is an adapter it calls through a trait:
//!
//! - [`input`] single-utterance microphone capture ([`audio`] + [`stt`])
//! - [`completion`] chat completion client and the assistant persona
//! - [`output`] speech synthesis and playback
//! - [`voice`] hosted bidirectional voice session
//! - [`app`] / [`hotkey`] the egui panel and global hotkeys that send
//!   [`session::AssistantCommand`]s

pub mod app;
pub mod audio;
pub mod completion;
pub mod config;
pub mod hotkey;
pub mod input;
pub mod output;
pub mod session;
pub mod stt;
pub mod voice;
