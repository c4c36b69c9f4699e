//! voxloop: a local, offline-first voice interaction runtime.
//!
//! The [`VoiceManager`] façade ties together a callback-driven playback
//! pipeline, a microphone capture + VAD + STT recognizer with a rolling
//! stop-phrase detector, a cloned-voice streaming orchestrator with
//! per-utterance cancellation, and a turn-taking coordinator that keeps
//! the system from interrupting itself.
//!
//! Model backends are injected as trait objects (`TtsAdapter`,
//! `SttAdapter`, `CloneEngine`, `AecProcessor`); this crate owns the
//! real-time engine, not the models.

pub mod catalog;
pub mod clone_orchestrator;
pub mod manager;
pub mod playback;
pub mod recognizer;
pub mod turn;

pub use clone_orchestrator::CloneOrchestrator;
pub use manager::{CloneVoice, SpeakOptions, VoiceManager, VoiceManagerBuilder};
pub use playback::PlaybackFacade;
pub use recognizer::{
    CaptureSource, Recognizer, RecognizerCallbacks, RecognizerConfig, RecognizerControl,
};
pub use turn::TurnCoordinator;

pub use voxloop_audio::{AudioBuffer, OutputMode, PlayerConfig};
pub use voxloop_foundation::{CancelToken, VoiceMode, VoiceRuntimeConfig, VoxloopError};
pub use voxloop_telemetry::VoiceMetrics;
