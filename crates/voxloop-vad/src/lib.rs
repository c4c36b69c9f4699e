pub mod config;
pub mod energy;

pub use config::VadConfig;
pub use energy::EnergyVad;

use voxloop_foundation::VadError;

/// Frame-level speech/non-speech classifier.
///
/// Implementations keep no state beyond what the underlying detector needs
/// per frame; callers reconstruct the engine on configuration changes.
pub trait VadEngine: Send {
    /// Classify one PCM16 frame of exactly `frame_size_samples()` samples.
    fn is_speech(&mut self, frame: &[i16]) -> Result<bool, VadError>;

    /// Change detector aggressiveness (0 = permissive .. 3 = strict).
    fn set_aggressiveness(&mut self, aggressiveness: u8) -> Result<(), VadError>;

    /// Sample rate this engine was built for.
    fn sample_rate(&self) -> u32;

    /// Frame size, in samples, every `is_speech` call must provide.
    fn frame_size_samples(&self) -> usize;
}
