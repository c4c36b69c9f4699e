//! Scripted STT adapter for tests and wiring checks.

use crate::adapter::{SttAdapter, TranscribeOptions};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use voxloop_foundation::SttError;

/// Returns scripted transcripts in order, then falls back to a fixed
/// default. Records every call so tests can assert on options.
#[derive(Default)]
pub struct MockSttAdapter {
    script: Mutex<VecDeque<String>>,
    fallback: Mutex<String>,
    calls: Mutex<Vec<TranscribeOptions>>,
    available: Mutex<bool>,
}

impl MockSttAdapter {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(true),
            ..Default::default()
        }
    }

    /// Always transcribe to `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let adapter = Self::new();
        *adapter.fallback.lock() = text.into();
        adapter
    }

    /// Queue a transcript for the next call.
    pub fn push_transcript(&self, text: impl Into<String>) {
        self.script.lock().push_back(text.into());
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    /// Options seen so far, in call order.
    pub fn calls(&self) -> Vec<TranscribeOptions> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_transcript(&self, opts: &TranscribeOptions) -> Result<String, SttError> {
        if !self.is_available() {
            return Err(SttError::NotAvailable {
                reason: "mock adapter disabled".into(),
            });
        }
        self.calls.lock().push(opts.clone());
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone()))
    }
}

impl SttAdapter for MockSttAdapter {
    fn transcribe_file(&self, path: &Path, opts: &TranscribeOptions) -> Result<String, SttError> {
        if !path.exists() {
            return Err(SttError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        self.next_transcript(opts)
    }

    fn transcribe_bytes(&self, _bytes: &[u8], opts: &TranscribeOptions) -> Result<String, SttError> {
        self.next_transcript(opts)
    }

    fn transcribe_samples(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<String, SttError> {
        self.next_transcript(opts)
    }

    fn set_language(&self, language: &str) -> bool {
        self.supported_languages().iter().any(|l| l == language)
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["en".into(), "fr".into(), "de".into()]
    }

    fn is_available(&self) -> bool {
        *self.available.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_transcripts_come_back_in_order() {
        let stt = MockSttAdapter::fixed("fallback");
        stt.push_transcript("first");
        stt.push_transcript("second");

        let opts = TranscribeOptions::new();
        assert_eq!(stt.transcribe_samples(&[0.0], 16_000, &opts).unwrap(), "first");
        assert_eq!(stt.transcribe_samples(&[0.0], 16_000, &opts).unwrap(), "second");
        assert_eq!(
            stt.transcribe_samples(&[0.0], 16_000, &opts).unwrap(),
            "fallback"
        );
        assert_eq!(stt.call_count(), 3);
    }

    #[test]
    fn unavailable_adapter_errors() {
        let stt = MockSttAdapter::new();
        stt.set_available(false);
        assert!(stt
            .transcribe_samples(&[0.0], 16_000, &TranscribeOptions::new())
            .is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let stt = MockSttAdapter::new();
        let err = stt
            .transcribe_file(Path::new("/definitely/not/here.wav"), &TranscribeOptions::new())
            .unwrap_err();
        assert!(matches!(err, SttError::FileNotFound { .. }));
    }
}
