//! Acoustic echo cancellation boundary.
//!
//! The algorithm itself lives outside this workspace; the recognizer only
//! needs aligned 10 ms PCM16 frames in and cleaned frames out.

use voxloop_foundation::AudioError;

/// Frame duration every processor must accept.
pub const AEC_FRAME_MS: u32 = 10;

/// Echo canceller consumed by the capture pipeline.
///
/// `process` is called once per 10 ms frame pair at the capture sample
/// rate: `near` is the microphone frame, `far` the speaker reference frame
/// (zero-padded by the caller when playback has nothing queued). The
/// returned frame replaces `near` in the pipeline.
pub trait AecProcessor: Send {
    fn process(&mut self, near: &[i16], far: &[i16]) -> Result<Vec<i16>, AudioError>;

    /// Hint the render-to-capture delay. Best-effort; implementations may
    /// ignore it.
    fn set_stream_delay_ms(&mut self, _delay_ms: u32) {}
}

/// Factory used by the manager when AEC is switched on at runtime.
pub type AecFactory = Box<dyn Fn(u32) -> Box<dyn AecProcessor> + Send + Sync>;

/// Identity processor: returns the near-end frame untouched. Useful for
/// wiring tests and as an explicit "AEC disabled" stand-in.
#[derive(Debug, Default)]
pub struct PassthroughAec;

impl AecProcessor for PassthroughAec {
    fn process(&mut self, near: &[i16], _far: &[i16]) -> Result<Vec<i16>, AudioError> {
        Ok(near.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_near_end() {
        let mut aec = PassthroughAec;
        let near = vec![5i16; 160];
        let far = vec![9i16; 160];
        assert_eq!(aec.process(&near, &far).unwrap(), near);
    }
}
