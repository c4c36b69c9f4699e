//! Energy-threshold VAD.
//!
//! Kept as a dependency-free fallback and as a deterministic test double
//! for the pipeline. The per-aggressiveness thresholds are tuned for
//! near-field speech; a webrtc-based engine should be preferred for real
//! microphones.

use crate::{VadConfig, VadEngine};
use voxloop_foundation::VadError;

/// dBFS onset thresholds indexed by aggressiveness 0..=3.
const THRESHOLDS_DB: [f32; 4] = [-55.0, -48.0, -42.0, -36.0];

pub struct EnergyVad {
    config: VadConfig,
    threshold_db: f32,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Result<Self, VadError> {
        config.validate()?;
        Ok(Self {
            config,
            threshold_db: THRESHOLDS_DB[config.aggressiveness as usize],
        })
    }

    fn rms_db(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return f32::NEG_INFINITY;
        }
        let sum_sq: f64 = frame
            .iter()
            .map(|&s| {
                let norm = s as f64 / 32768.0;
                norm * norm
            })
            .sum();
        let rms = (sum_sq / frame.len() as f64).sqrt();
        if rms <= 0.0 {
            f32::NEG_INFINITY
        } else {
            (20.0 * rms.log10()) as f32
        }
    }
}

impl VadEngine for EnergyVad {
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError> {
        let expected = self.config.frame_size_samples();
        if frame.len() != expected {
            return Err(VadError::InvalidFrameSize {
                expected,
                actual: frame.len(),
            });
        }
        Ok(Self::rms_db(frame) >= self.threshold_db)
    }

    fn set_aggressiveness(&mut self, aggressiveness: u8) -> Result<(), VadError> {
        if aggressiveness > 3 {
            return Err(VadError::InvalidAggressiveness(aggressiveness));
        }
        self.config.aggressiveness = aggressiveness;
        self.threshold_db = THRESHOLDS_DB[aggressiveness as usize];
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn frame_size_samples(&self) -> usize {
        self.config.frame_size_samples()
    }
}
