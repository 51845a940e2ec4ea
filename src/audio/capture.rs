//! Microphone access via `cpal`.
//!
//! [`InputDevice::open_default`] resolves the default input device and its
//! preferred format.  [`InputDevice::start`] begins streaming already
//! converted 16 kHz mono buffers over an mpsc channel; the returned
//! [`InputStream`] owns the cpal stream and releases the microphone on drop.
//!
//! cpal reports permission refusals as backend-specific strings, so
//! [`classify`] sorts every cpal failure into
//! [`CaptureError::PermissionDenied`] or [`CaptureError::DeviceUnavailable`].

use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::convert::MonoConverter;
use crate::input::CaptureError;

/// Remediation text attached to permission failures.
pub const PERMISSION_HINT: &str =
    "Allow microphone access for this app in your system privacy settings, then try again.";

const PERMISSION_MARKERS: &[&str] = &[
    "permission",
    "denied",
    "not permitted",
    "not authorized",
    "unauthorized",
    "access",
];

/// Map any cpal error text onto the capture taxonomy.
pub fn classify(detail: impl std::fmt::Display) -> CaptureError {
    let text = detail.to_string();
    let lower = text.to_lowercase();
    if PERMISSION_MARKERS.iter().any(|m| lower.contains(m)) {
        log::warn!("microphone refused: {text}");
        CaptureError::PermissionDenied(PERMISSION_HINT.to_string())
    } else {
        CaptureError::DeviceUnavailable(text)
    }
}

/// Keeps the cpal stream alive.  Dropping it stops recording.
pub struct InputStream {
    _stream: cpal::Stream,
}

/// The default microphone and its native format.
pub struct InputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    converter: MonoConverter,
}

impl InputDevice {
    pub fn open_default() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no input device on the default audio host".into())
        })?;

        let supported = device.default_input_config().map_err(classify)?;
        let converter = MonoConverter::new(supported.channels(), supported.sample_rate().0);
        let config: cpal::StreamConfig = supported.into();

        log::debug!(
            "input device: {} ({} ch @ {} Hz)",
            device.name().unwrap_or_else(|_| "unknown".into()),
            config.channels,
            config.sample_rate.0
        );

        Ok(Self {
            device,
            config,
            converter,
        })
    }

    /// Start recording; each callback buffer is sent as 16 kHz mono.
    ///
    /// Runtime stream faults are logged and forwarded once through `faults`
    /// so the reader can stop waiting on a dead device.
    pub fn start(
        &self,
        tx: mpsc::Sender<Vec<f32>>,
        faults: mpsc::Sender<CaptureError>,
    ) -> Result<InputStream, CaptureError> {
        let converter = self.converter;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Receiver gone means the capture finished; nothing to do.
                    let _ = tx.send(converter.convert(data));
                },
                move |err: cpal::StreamError| {
                    log::error!("input stream error: {err}");
                    let _ = faults.send(classify(err));
                },
                None,
            )
            .map_err(classify)?;

        stream.play().map_err(classify)?;
        Ok(InputStream { _stream: stream })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_text_is_classified_as_denied() {
        let err = classify("A backend-specific error has occurred: Access denied (os error 5)");
        assert_eq!(err, CaptureError::PermissionDenied(PERMISSION_HINT.to_string()));
    }

    #[test]
    fn other_text_is_device_unavailable() {
        let err = classify("The requested device is no longer available.");
        assert!(matches!(err, CaptureError::DeviceUnavailable(ref d) if d.contains("no longer")));
    }
}
