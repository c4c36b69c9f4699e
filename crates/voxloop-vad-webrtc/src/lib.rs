//! WebRTC VAD backend.
//!
//! Wraps the `webrtc-vad` crate (libfvad bindings) behind the
//! [`VadEngine`] trait. This is the default detector: frame-level,
//! aggressiveness 0..=3, 10/20/30 ms frames at 8/16/32/48 kHz.

use voxloop_foundation::VadError;
use voxloop_vad::{VadConfig, VadEngine};
use webrtc_vad::{SampleRate, Vad, VadMode};

pub struct WebRtcVad {
    vad: Vad,
    config: VadConfig,
}

// SAFETY: the underlying fvad state is a plain heap allocation with no
// thread affinity; the raw pointer inside `Vad` merely makes it !Send by
// default. All mutation goes through &mut self.
unsafe impl Send for WebRtcVad {}

fn to_rate(hz: u32) -> Result<SampleRate, VadError> {
    match hz {
        8_000 => Ok(SampleRate::Rate8kHz),
        16_000 => Ok(SampleRate::Rate16kHz),
        32_000 => Ok(SampleRate::Rate32kHz),
        48_000 => Ok(SampleRate::Rate48kHz),
        other => Err(VadError::UnsupportedSampleRate(other)),
    }
}

fn to_mode(aggressiveness: u8) -> Result<VadMode, VadError> {
    match aggressiveness {
        0 => Ok(VadMode::Quality),
        1 => Ok(VadMode::LowBitrate),
        2 => Ok(VadMode::Aggressive),
        3 => Ok(VadMode::VeryAggressive),
        other => Err(VadError::InvalidAggressiveness(other)),
    }
}

impl WebRtcVad {
    pub fn new(config: VadConfig) -> Result<Self, VadError> {
        config.validate()?;
        let vad = Vad::new_with_rate_and_mode(to_rate(config.sample_rate_hz)?, to_mode(config.aggressiveness)?);
        Ok(Self { vad, config })
    }
}

impl VadEngine for WebRtcVad {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
        let expected = self.config.frame_size_samples();
        if frame.len() != expected {
            return Err(VadError::InvalidFrameSize {
                expected,
                actual: frame.len(),
            });
        }
        self.vad
            .is_voice_segment(frame)
            .map_err(|_| VadError::ProcessingFailed("fvad rejected frame".into()))
    }

    fn set_aggressiveness(&mut self, aggressiveness: u8) -> Result<(), VadError> {
        let mode = to_mode(aggressiveness)?;
        self.vad.set_mode(mode);
        self.config.aggressiveness = aggressiveness;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn frame_size_samples(&self) -> usize {
        self.config.frame_size_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_frame_is_not_speech() {
        let mut vad = WebRtcVad::new(VadConfig::default()).unwrap();
        let silence = vec![0i16; 480];
        assert!(!vad.is_speech(&silence).unwrap());
    }

    #[test]
    fn frame_size_mismatch_is_rejected() {
        let mut vad = WebRtcVad::new(VadConfig::default()).unwrap();
        assert!(vad.is_speech(&[0i16; 479]).is_err());
    }

    #[test]
    fn aggressiveness_out_of_range_is_rejected() {
        let mut vad = WebRtcVad::new(VadConfig::default()).unwrap();
        assert!(vad.set_aggressiveness(4).is_err());
        assert!(vad.set_aggressiveness(3).is_ok());
    }
}
