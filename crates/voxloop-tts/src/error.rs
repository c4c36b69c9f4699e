use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("TTS engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid text input: {0}")]
    InvalidInput(String),

    #[error("Audio output error: {0}")]
    Audio(#[from] voxloop_foundation::AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TtsResult<T> = Result<T, TtsError>;
