use serde::{Deserialize, Serialize};
use voxloop_foundation::VadError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    /// Detector aggressiveness, 0 (permissive) to 3 (strict).
    pub aggressiveness: u8,
    pub sample_rate_hz: u32,
    pub frame_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            aggressiveness: 1,
            sample_rate_hz: 16_000,
            frame_duration_ms: 30,
        }
    }
}

impl VadConfig {
    pub fn frame_size_samples(&self) -> usize {
        (self.sample_rate_hz as usize * self.frame_duration_ms as usize) / 1000
    }

    pub fn validate(&self) -> Result<(), VadError> {
        if self.aggressiveness > 3 {
            return Err(VadError::InvalidAggressiveness(self.aggressiveness));
        }
        if !matches!(self.sample_rate_hz, 8_000 | 16_000 | 32_000 | 48_000) {
            return Err(VadError::UnsupportedSampleRate(self.sample_rate_hz));
        }
        if !matches!(self.frame_duration_ms, 10 | 20 | 30) {
            return Err(VadError::ProcessingFailed(format!(
                "unsupported frame duration: {} ms",
                self.frame_duration_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_30ms_at_16k() {
        let cfg = VadConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.frame_size_samples(), 480);
    }

    #[test]
    fn bad_knobs_are_rejected() {
        let cfg = VadConfig {
            aggressiveness: 4,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(VadError::InvalidAggressiveness(4))
        ));

        let cfg = VadConfig {
            sample_rate_hz: 44_100,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(VadError::UnsupportedSampleRate(44_100))
        ));
    }
}
