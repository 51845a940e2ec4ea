//! Sample-format conversion for the recogniser.
//!
//! Whisper wants 16 kHz mono `f32`; microphones deliver whatever the device
//! prefers (often 48 kHz stereo).  [`MonoConverter`] is built once per
//! capture from the device format and applied to every callback buffer.

/// Sample rate expected by the recogniser.
pub const TARGET_RATE: u32 = 16_000;

/// Converts interleaved device audio into 16 kHz mono.
#[derive(Debug, Clone, Copy)]
pub struct MonoConverter {
    channels: u16,
    source_rate: u32,
}

impl MonoConverter {
    pub fn new(channels: u16, source_rate: u32) -> Self {
        Self {
            channels,
            source_rate,
        }
    }

    pub fn convert(&self, interleaved: &[f32]) -> Vec<f32> {
        let mono = downmix(interleaved, self.channels);
        resample_linear(&mono, self.source_rate, TARGET_RATE)
    }
}

/// Average interleaved frames into one channel.  Zero channels yields nothing.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => interleaved
            .chunks_exact(n as usize)
            .map(|frame| frame.iter().sum::<f32>() / f32::from(n))
            .collect(),
    }
}

/// Linear-interpolation resampler.  Good enough for speech recognition.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let step = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (samples.len() as f64 / step).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let out = downmix(&[1.0, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels_is_empty() {
        assert!(downmix(&[0.3, 0.3], 0).is_empty());
    }

    #[test]
    fn converter_turns_48k_stereo_into_16k_mono() {
        let conv = MonoConverter::new(2, 48_000);
        // 10 ms of 48 kHz stereo = 480 frames = 960 samples.
        let out = conv.convert(&vec![0.25_f32; 960]);
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1e-5));
    }

    #[test]
    fn matching_rate_is_passthrough() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(resample_linear(&input, 16_000, 16_000), input);
    }

    #[test]
    fn upsampling_doubles_length() {
        let out = resample_linear(&vec![0.0_f32; 80], 8_000, 16_000);
        assert_eq!(out.len(), 160);
    }
}
