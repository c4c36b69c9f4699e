//! Turn-taking coordination.
//!
//! Observes playback lifecycle and routes pause/resume calls into the
//! recognizer so the system does not transcribe or interrupt itself.

use crate::recognizer::RecognizerControl;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;
use voxloop_foundation::VoiceMode;

pub struct TurnCoordinator {
    mode: Mutex<VoiceMode>,
    recognizer: RwLock<Option<Arc<dyn RecognizerControl>>>,
}

impl TurnCoordinator {
    pub fn new(mode: VoiceMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            recognizer: RwLock::new(None),
        }
    }

    pub fn set_mode(&self, mode: VoiceMode) {
        *self.mode.lock() = mode;
        debug!(mode = mode.as_str(), "Voice mode set");
    }

    pub fn mode(&self) -> VoiceMode {
        *self.mode.lock()
    }

    pub fn set_recognizer(&self, recognizer: Option<Arc<dyn RecognizerControl>>) {
        *self.recognizer.write() = recognizer;
    }

    /// Playback is starting: quiet the recognizer per the active mode.
    pub fn on_speak_start(&self) {
        let Some(rec) = self.recognizer.read().clone() else {
            return;
        };
        match self.mode() {
            VoiceMode::Full => {
                // With AEC the cleaned mic signal is trustworthy and real
                // barge-in stays armed; without it, barge-in would trigger
                // on our own speaker output.
                if !rec.aec_enabled() {
                    rec.pause_tts_interrupt();
                }
            }
            VoiceMode::Wait => rec.pause_listening(),
            VoiceMode::Stop | VoiceMode::Ptt => {
                rec.pause_tts_interrupt();
                rec.pause_transcriptions();
            }
            VoiceMode::Off => {}
        }
    }

    /// Playback ended (or was stopped): restore the recognizer. Must be
    /// idempotent; `stop_speaking` routes here explicitly because an
    /// abrupt stop can skip the natural drain events.
    pub fn on_speak_end(&self) {
        let Some(rec) = self.recognizer.read().clone() else {
            return;
        };
        match self.mode() {
            VoiceMode::Full => rec.resume_tts_interrupt(),
            VoiceMode::Wait => rec.resume_listening(),
            VoiceMode::Stop | VoiceMode::Ptt => {
                rec.resume_tts_interrupt();
                rec.resume_transcriptions();
            }
            VoiceMode::Off => {}
        }
    }
}
