use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cross-thread health counters for the capture/recognition/playback
/// pipeline. Every field is monotonically increasing; consumers diff
/// snapshots.
#[derive(Debug, Default, Clone)]
pub struct PipelineCounters {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    capture_frames: AtomicU64,
    capture_dropped: AtomicU64,
    vad_frames: AtomicU64,
    speech_frames: AtomicU64,
    utterances: AtomicU64,
    stop_checks: AtomicU64,
    stop_hits: AtomicU64,
    playback_chunks: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.inner.$field.fetch_add(1, Ordering::Relaxed);
        }
        pub fn $get(&self) -> u64 {
            self.inner.$field.load(Ordering::Relaxed)
        }
    };
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(incr_capture_frames, capture_frames, capture_frames);
    counter!(incr_capture_dropped, capture_dropped, capture_dropped);
    counter!(incr_vad_frames, vad_frames, vad_frames);
    counter!(incr_speech_frames, speech_frames, speech_frames);
    counter!(incr_utterances, utterances, utterances);
    counter!(incr_stop_checks, stop_checks, stop_checks);
    counter!(incr_stop_hits, stop_hits, stop_hits);
    counter!(incr_playback_chunks, playback_chunks, playback_chunks);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_shared_across_clones() {
        let counters = PipelineCounters::new();
        let worker_view = counters.clone();
        worker_view.incr_utterances();
        worker_view.incr_utterances();
        assert_eq!(counters.utterances(), 2);
        assert_eq!(counters.stop_hits(), 0);
    }
}
