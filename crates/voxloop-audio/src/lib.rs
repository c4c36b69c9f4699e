pub mod aec;
pub mod capture;
pub mod player;
pub mod resampler;
pub mod ring_buffer;
#[cfg(unix)]
pub mod stderr_guard;
pub mod wav;

pub use aec::AecProcessor;
pub use capture::{CaptureConfig, CaptureThread, DeviceConfig};
pub use player::{AudioPlayer, OutputMode, PlayerConfig, PlayerHooks};
pub use resampler::{linear_resample, linear_resample_i16};
pub use ring_buffer::{AudioConsumer, AudioProducer, AudioRingBuffer};

/// Mono float32 audio plus its sample rate. The only audio shape that
/// crosses component boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Run an audio-device probe with backend chatter on stderr silenced
/// (ALSA prints missing-plugin warnings straight to fd 2).
pub(crate) fn quiet_probe<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(unix)]
    {
        stderr_guard::StderrGuard::silence(f)
    }
    #[cfg(not(unix))]
    {
        f()
    }
}

/// Convert PCM16 samples to float32 in [-1, 1].
pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Convert float32 samples to PCM16, clamping out-of-range input.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}
