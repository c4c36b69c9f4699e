//! Text-to-speech adapter boundary.

use crate::error::{TtsError, TtsResult};
use std::path::{Path, PathBuf};
use voxloop_audio::AudioBuffer;

/// Encoded audio container for bytes/file export. WAV support is
/// mandatory for every adapter; the rest may return
/// [`TtsError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Wav,
    Mp3,
    Ogg,
}

impl AudioEncoding {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") => Some(Self::Wav),
            Some("mp3") => Some(Self::Mp3),
            Some("ogg") => Some(Self::Ogg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
        }
    }
}

/// Contract every TTS backend implements.
pub trait TtsAdapter: Send + Sync {
    /// Synthesize text to a mono float32 buffer at the adapter's native
    /// rate.
    fn synthesize(&self, text: &str) -> TtsResult<AudioBuffer>;

    /// Synthesize to encoded bytes. Default implementation renders through
    /// `synthesize` and encodes WAV PCM16; other encodings are refused.
    fn synthesize_to_bytes(&self, text: &str, encoding: AudioEncoding) -> TtsResult<Vec<u8>> {
        match encoding {
            AudioEncoding::Wav => {
                let audio = self.synthesize(text)?;
                Ok(voxloop_audio::wav::encode_wav_pcm16(&audio)?)
            }
            other => Err(TtsError::UnsupportedFormat(other.as_str().to_string())),
        }
    }

    /// Synthesize to a file; encoding inferred from the extension when not
    /// given (WAV when the extension is unknown).
    fn synthesize_to_file(
        &self,
        text: &str,
        output_path: &Path,
        encoding: Option<AudioEncoding>,
    ) -> TtsResult<PathBuf> {
        let encoding = encoding
            .or_else(|| AudioEncoding::from_extension(output_path))
            .unwrap_or(AudioEncoding::Wav);
        let bytes = self.synthesize_to_bytes(text, encoding)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(output_path, bytes)?;
        Ok(output_path.to_path_buf())
    }

    /// Switch language. Returns false (state unchanged) for unsupported
    /// codes.
    fn set_language(&self, language: &str) -> bool;

    fn supported_languages(&self) -> Vec<String>;

    /// Native synthesis rate in Hz.
    fn sample_rate(&self) -> u32;

    fn is_available(&self) -> bool;

    fn info(&self) -> serde_json::Value {
        serde_json::json!({
            "languages": self.supported_languages(),
            "sample_rate": self.sample_rate(),
            "available": self.is_available(),
        })
    }
}
