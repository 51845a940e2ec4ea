//! Raw audio plumbing shared by the input and output adapters.
//!
//! ```text
//! Microphone → cpal callback → MonoConverter (16 kHz mono) → mpsc → Endpointer
//! reply bytes → rodio Decoder → Sink (on the AudioOutput thread) → speakers
//! ```
//!
//! Nothing in here knows about sessions; [`crate::input`] and
//! [`crate::output`] wrap these pieces behind the controller's traits.

pub mod capture;
pub mod convert;
pub mod endpoint;
pub mod playback;

pub use capture::{InputDevice, InputStream};
pub use convert::{downmix, resample_linear, MonoConverter, TARGET_RATE};
pub use endpoint::{duration_ms, trim_silence, Endpoint, Endpointer};
pub use playback::AudioOutput;
