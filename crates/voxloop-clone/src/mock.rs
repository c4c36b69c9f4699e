//! Scripted clone engine for orchestrator tests.

use crate::chunker::chunk_text_for_streaming;
use crate::engine::{ChunkStream, CloneEngine, CloneRequest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use voxloop_audio::AudioBuffer;
use voxloop_foundation::CloneError;

/// Renders a quiet tone per text chunk, optionally sleeping between chunks
/// so tests can interrupt mid-stream. Counts every chunk it hands out.
pub struct MockCloneEngine {
    sample_rate: u32,
    chunk_delay: Mutex<Duration>,
    samples_per_chunk: usize,
    chunks_produced: Arc<AtomicUsize>,
    available: Mutex<bool>,
}

impl Default for MockCloneEngine {
    fn default() -> Self {
        Self::new(24_000)
    }
}

impl MockCloneEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            chunk_delay: Mutex::new(Duration::ZERO),
            samples_per_chunk: (sample_rate as usize) / 10,
            chunks_produced: Arc::new(AtomicUsize::new(0)),
            available: Mutex::new(true),
        }
    }

    /// Sleep this long before yielding each chunk (simulates model time).
    pub fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.lock() = delay;
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    /// Total chunks yielded across all streams.
    pub fn chunks_produced(&self) -> usize {
        self.chunks_produced.load(Ordering::SeqCst)
    }

    fn tone_chunk(&self, seed: usize) -> AudioBuffer {
        let freq = 180.0 + (seed % 5) as f32 * 40.0;
        let samples = (0..self.samples_per_chunk)
            .map(|i| (i as f32 * std::f32::consts::TAU * freq / self.sample_rate as f32).sin() * 0.2)
            .collect();
        AudioBuffer::new(samples, self.sample_rate)
    }
}

impl CloneEngine for MockCloneEngine {
    fn infer_to_wav_bytes(&self, request: &CloneRequest) -> Result<Vec<u8>, CloneError> {
        if !self.is_available() {
            return Err(CloneError::NotAvailable {
                reason: "mock engine disabled".into(),
            });
        }
        let chunks = chunk_text_for_streaming(&request.text, request.max_chars);
        let mut samples = Vec::new();
        for (i, _) in chunks.iter().enumerate() {
            samples.extend(self.tone_chunk(i).samples);
        }
        let audio = AudioBuffer::new(samples, self.sample_rate);
        voxloop_audio::wav::encode_wav_pcm16(&audio)
            .map_err(|e| CloneError::SynthesisFailed(e.to_string()))
    }

    fn infer_chunks(&self, request: &CloneRequest) -> Result<ChunkStream, CloneError> {
        if !self.is_available() {
            return Err(CloneError::NotAvailable {
                reason: "mock engine disabled".into(),
            });
        }
        let texts = chunk_text_for_streaming(&request.text, request.max_chars);
        let delay = *self.chunk_delay.lock();
        let counter = self.chunks_produced.clone();
        let sample_rate = self.sample_rate;
        let samples_per_chunk = self.samples_per_chunk;

        Ok(Box::new(texts.into_iter().enumerate().map(
            move |(i, _text)| {
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let freq = 180.0 + (i % 5) as f32 * 40.0;
                let samples = (0..samples_per_chunk)
                    .map(|j| {
                        (j as f32 * std::f32::consts::TAU * freq / sample_rate as f32).sin() * 0.2
                    })
                    .collect();
                Ok(AudioBuffer::new(samples, sample_rate))
            },
        )))
    }

    fn is_available(&self) -> bool {
        *self.available.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(text: &str) -> CloneRequest {
        CloneRequest::new(text, vec![PathBuf::from("ref.wav")])
    }

    #[test]
    fn wav_path_renders_all_chunks() {
        let engine = MockCloneEngine::default();
        let bytes = engine.infer_to_wav_bytes(&request("One. Two. Three.")).unwrap();
        let audio = voxloop_audio::wav::decode_wav_to_mono(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.samples.len(), 2_400);
    }

    #[test]
    fn chunk_stream_yields_one_buffer_per_batch() {
        let engine = MockCloneEngine::default();
        let mut req = request("First sentence. Second sentence. Third sentence.");
        req.max_chars = 20;
        let chunks: Vec<_> = engine.infer_chunks(&req).unwrap().collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.is_ok()));
        assert_eq!(engine.chunks_produced(), 3);
    }

    #[test]
    fn unavailable_engine_refuses() {
        let engine = MockCloneEngine::default();
        engine.set_available(false);
        assert!(engine.infer_chunks(&request("hi")).is_err());
    }
}
