//! Voice-clone synthesis boundary.
//!
//! Engines take text plus reference audio of the target speaker and render
//! speech in that speaker's voice. Model internals live outside this
//! workspace.

use std::path::PathBuf;
use voxloop_audio::AudioBuffer;
use voxloop_foundation::CloneError;

/// One cloned synthesis request.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub text: String,
    /// Reference recordings of the target speaker.
    pub reference_paths: Vec<PathBuf>,
    /// Transcript of the reference audio, when known. Engines fall back to
    /// transcribing the reference themselves.
    pub reference_text: Option<String>,
    /// Playback speed hint in [0.5, 2.0]; `None` means native pace.
    pub speed: Option<f32>,
    /// Streaming batch size in characters (sentence-aligned).
    pub max_chars: usize,
}

impl CloneRequest {
    pub fn new(text: impl Into<String>, reference_paths: Vec<PathBuf>) -> Self {
        Self {
            text: text.into(),
            reference_paths,
            reference_text: None,
            speed: None,
            max_chars: 240,
        }
    }
}

/// Iterator of synthesized chunks; each item is a mono float32 buffer at
/// the engine's native rate for that chunk.
pub type ChunkStream = Box<dyn Iterator<Item = Result<AudioBuffer, CloneError>> + Send>;

/// Contract every clone backend implements.
pub trait CloneEngine: Send + Sync {
    /// Render the full utterance as WAV PCM16 bytes.
    fn infer_to_wav_bytes(&self, request: &CloneRequest) -> Result<Vec<u8>, CloneError>;

    /// Render the utterance as a pull stream of audio chunks
    /// (sentence-chunked batches of roughly `request.max_chars`
    /// characters). The caller polls its cancel token between chunks.
    fn infer_chunks(&self, request: &CloneRequest) -> Result<ChunkStream, CloneError>;

    fn is_available(&self) -> bool;

    fn info(&self) -> serde_json::Value {
        serde_json::json!({ "available": self.is_available() })
    }
}
