use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxloopError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Vad(#[from] VadError),

    #[error(transparent)]
    Stt(#[from] SttError),

    #[error(transparent)]
    Clone(#[from] CloneError),

    #[error("No TTS adapter available for this operation")]
    NoTtsAdapter,

    #[error("TTS engine error: {0}")]
    Tts(String),

    #[error("No STT adapter available for this operation")]
    NoSttAdapter,

    #[error("No clone engine available for voice '{voice_id}'")]
    NoCloneEngine { voice_id: String },

    #[error("AEC support was not configured on this manager")]
    AecNotConfigured,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Output device not found")]
    NoOutputDevice,

    #[error("Input device not found: {name:?}")]
    InputDeviceNotFound { name: Option<String> },

    #[error("No usable stream config (tried {attempts} candidates)")]
    NoUsableConfig { attempts: usize },

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Stream owner thread is gone")]
    StreamOwnerGone,

    #[error("CPAL stream error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("AEC processing failed: {0}")]
    Aec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum VadError {
    #[error("Invalid frame size: expected {expected} samples, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    #[error("Invalid aggressiveness {0} (expected 0..=3)")]
    InvalidAggressiveness(u8),

    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[derive(Error, Debug)]
pub enum SttError {
    #[error("Adapter not available: {reason}")]
    NotAvailable { reason: String },

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Audio file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("Engine not available: {reason}")]
    NotAvailable { reason: String },

    #[error("Unknown voice: {voice_id}")]
    UnknownVoice { voice_id: String },

    #[error("Reference audio missing: {path}")]
    ReferenceMissing { path: PathBuf },

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
