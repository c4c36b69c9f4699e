//! Deterministic TTS adapter for tests and wiring checks.

use crate::adapter::TtsAdapter;
use crate::error::{TtsError, TtsResult};
use parking_lot::Mutex;
use voxloop_audio::AudioBuffer;

/// Renders a fixed-amplitude tone whose duration scales with text length
/// (80 ms per word, minimum one frame) and records every synthesized
/// string.
pub struct MockTtsAdapter {
    sample_rate: u32,
    language: Mutex<String>,
    available: Mutex<bool>,
    synthesized: Mutex<Vec<String>>,
}

impl Default for MockTtsAdapter {
    fn default() -> Self {
        Self::new(22_050)
    }
}

impl MockTtsAdapter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            language: Mutex::new("en".to_string()),
            available: Mutex::new(true),
            synthesized: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    /// Texts passed to `synthesize`, in order.
    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.lock().clone()
    }

    pub fn current_language(&self) -> String {
        self.language.lock().clone()
    }
}

impl TtsAdapter for MockTtsAdapter {
    fn synthesize(&self, text: &str) -> TtsResult<AudioBuffer> {
        if !self.is_available() {
            return Err(TtsError::EngineNotAvailable("mock adapter disabled".into()));
        }
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".into()));
        }
        self.synthesized.lock().push(text.to_string());

        let words = text.split_whitespace().count().max(1);
        let len = (self.sample_rate as usize * 80 / 1000) * words;
        let samples = (0..len)
            .map(|i| {
                (i as f32 * std::f32::consts::TAU * 220.0 / self.sample_rate as f32).sin() * 0.3
            })
            .collect();
        Ok(AudioBuffer::new(samples, self.sample_rate))
    }

    fn set_language(&self, language: &str) -> bool {
        if self.supported_languages().iter().any(|l| l == language) {
            *self.language.lock() = language.to_string();
            true
        } else {
            false
        }
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["en".into(), "fr".into(), "de".into(), "es".into()]
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_available(&self) -> bool {
        *self.available.lock()
    }
}
