//! Speaker output via `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so [`AudioOutput`] parks it on a
//! dedicated thread for the lifetime of the value and only hands the
//! (thread-safe) `OutputStreamHandle` back to the caller.  Every reply gets
//! its own `Sink`, which makes stopping one reply independent of the next.

use std::io::Cursor;
use std::sync::{mpsc, Arc};
use std::thread;

use rodio::{OutputStreamHandle, Sink, Source};

use crate::output::PlaybackError;

pub struct AudioOutput {
    handle: OutputStreamHandle,
    // Dropping the sender wakes the stream thread, which then exits.
    _shutdown: mpsc::Sender<()>,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn open() -> Result<Self, PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match rodio::OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    log::debug!("audio output closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
                }
            })
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;

        let handle = ready_rx.recv().map_err(|_| {
            PlaybackError::DeviceUnavailable("audio output thread exited".into())
        })??;

        Ok(Self {
            handle,
            _shutdown: shutdown_tx,
        })
    }

    /// Decode `bytes` (mp3/wav) and start playing them on a fresh sink.
    pub fn play(&self, bytes: Vec<u8>) -> Result<Arc<Sink>, PlaybackError> {
        let source = rodio::Decoder::new(Cursor::new(bytes))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
        sink.append(source.convert_samples::<f32>());
        Ok(Arc::new(sink))
    }
}
