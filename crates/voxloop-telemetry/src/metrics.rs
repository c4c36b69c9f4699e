use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// One synthesis run, as observed by the path that produced the audio.
///
/// Written once by the synthesis worker and read destructively by whoever
/// displays it (`MetricsSlot::pop`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VoiceMetrics {
    /// Producing engine: "tts" for the default adapter path, "clone" for
    /// cloned-voice synthesis.
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    /// Wall-clock seconds spent synthesizing.
    pub synth_s: f64,
    /// Seconds of audio produced.
    pub audio_s: f64,
    /// Real-time factor (synth_s / audio_s); absent when no audio came out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtf: Option<f64>,
    /// Time to first audio chunk (streaming paths only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    pub audio_samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp (seconds) when the record was written.
    pub ts: f64,
}

impl VoiceMetrics {
    pub fn now_ts() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Shorthand for a failed run.
    pub fn error(engine: &str, voice_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            engine: engine.to_string(),
            voice_id: voice_id.map(str::to_string),
            error: Some(message.into()),
            ts: Self::now_ts(),
            ..Default::default()
        }
    }
}

/// Single-record metrics mailbox: last write wins, reads are destructive.
#[derive(Debug, Default, Clone)]
pub struct MetricsSlot {
    inner: Arc<Mutex<Option<VoiceMetrics>>>,
}

impl MetricsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, metrics: VoiceMetrics) {
        *self.inner.lock() = Some(metrics);
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    /// Take the last record, leaving the slot empty.
    pub fn pop(&self) -> Option<VoiceMetrics> {
        self.inner.lock().take()
    }
}
