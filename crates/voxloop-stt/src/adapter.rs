//! Speech-to-text adapter boundary.

use std::path::Path;
use voxloop_foundation::SttError;

/// Per-call transcription options.
///
/// The rolling stop-phrase detector depends on `hotwords` biasing and on
/// `condition_on_previous_text = false`; adapters that cannot honor those
/// should still transcribe rather than fail.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// ISO 639-1 language code; `None` lets the adapter auto-detect.
    pub language: Option<String>,
    /// Comma-separated bias terms, e.g. "stop, ok stop, okay stop".
    pub hotwords: Option<String>,
    /// Whether the decoder may condition on its previous output. Defaults
    /// to true; the stop detector turns it off.
    pub condition_on_previous_text: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: None,
            hotwords: None,
            condition_on_previous_text: true,
        }
    }
}

impl TranscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    pub fn hotwords(mut self, words: impl Into<String>) -> Self {
        self.hotwords = Some(words.into());
        self
    }

    pub fn condition_on_previous_text(mut self, on: bool) -> Self {
        self.condition_on_previous_text = on;
        self
    }
}

/// Contract every STT backend implements.
pub trait SttAdapter: Send + Sync {
    /// Transcribe an audio file.
    fn transcribe_file(&self, path: &Path, opts: &TranscribeOptions) -> Result<String, SttError>;

    /// Transcribe encoded audio bytes (WAV unless the adapter says
    /// otherwise).
    fn transcribe_bytes(&self, bytes: &[u8], opts: &TranscribeOptions) -> Result<String, SttError>;

    /// Transcribe raw mono float32 samples.
    fn transcribe_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<String, SttError>;

    /// Set the default language. Returns false (state unchanged) for
    /// unsupported codes.
    fn set_language(&self, language: &str) -> bool;

    fn supported_languages(&self) -> Vec<String>;

    fn is_available(&self) -> bool;

    fn info(&self) -> serde_json::Value {
        serde_json::json!({
            "languages": self.supported_languages(),
            "available": self.is_available(),
        })
    }
}
