use serde::{Deserialize, Serialize};
use std::env;

/// Listening profile governing how playback and capture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    /// No coordination; the recognizer is left alone.
    Off,
    /// Pause listening entirely while the system speaks.
    Wait,
    /// Keep listening for the stop phrase only while the system speaks.
    Stop,
    /// Keep listening and allow barge-in while the system speaks.
    Full,
    /// Push-to-talk: capture is explicitly started and stopped.
    Ptt,
}

impl Default for VoiceMode {
    fn default() -> Self {
        // Safe on open speakers without echo cancellation. `Full` is for
        // headset or AEC-equipped setups and must be opted into.
        Self::Wait
    }
}

impl VoiceMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "wait" => Some(Self::Wait),
            "stop" => Some(Self::Stop),
            "full" => Some(Self::Full),
            "ptt" => Some(Self::Ptt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Wait => "wait",
            Self::Stop => "stop",
            Self::Full => "full",
            Self::Ptt => "ptt",
        }
    }
}

/// Process-level knobs, loaded once at init.
///
/// Everything here used to be scattered env flags in the predecessor
/// program; keeping them in one struct means no component reads the
/// environment after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceRuntimeConfig {
    /// Default language (ISO 639-1).
    pub language: String,
    /// Initial voice mode.
    pub voice_mode: VoiceMode,
    /// Stream cloned synthesis in chunks (lower TTFB) instead of rendering
    /// the full utterance first.
    pub cloned_tts_streaming: bool,
    /// Verbose diagnostics in worker loops.
    pub debug: bool,
}

impl Default for VoiceRuntimeConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            voice_mode: VoiceMode::default(),
            cloned_tts_streaming: true,
            debug: false,
        }
    }
}

impl VoiceRuntimeConfig {
    /// Load configuration from `VOXLOOP_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(lang) = env::var("VOXLOOP_LANGUAGE") {
            let lang = lang.trim().to_ascii_lowercase();
            if !lang.is_empty() {
                cfg.language = lang;
            }
        }
        if let Ok(mode) = env::var("VOXLOOP_VOICE_MODE") {
            if let Some(parsed) = VoiceMode::parse(&mode) {
                cfg.voice_mode = parsed;
            } else {
                tracing::warn!(value = %mode, "Ignoring unknown VOXLOOP_VOICE_MODE");
            }
        }
        if let Ok(v) = env::var("VOXLOOP_STREAMING_CLONE") {
            cfg.cloned_tts_streaming = !matches!(v.trim(), "0" | "false" | "no");
        }
        if let Ok(v) = env::var("VOXLOOP_DEBUG") {
            cfg.debug = matches!(v.trim(), "1" | "true" | "yes");
        }
        cfg
    }
}
