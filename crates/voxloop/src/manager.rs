//! The public façade.
//!
//! `VoiceManager` owns the playback facade, the recognizer, the clone
//! orchestrator and the turn coordinator, and wires them together with
//! function handles so no component holds a reference web. Model backends
//! are injected through the builder.

use crate::catalog;
use crate::clone_orchestrator::CloneOrchestrator;
use crate::playback::PlaybackFacade;
use crate::recognizer::{
    CaptureSource, Recognizer, RecognizerCallbacks, RecognizerConfig,
};
use crate::turn::TurnCoordinator;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{info, warn};
use voxloop_audio::aec::AecFactory;
use voxloop_audio::capture::CaptureConfig;
use voxloop_audio::player::LifecycleHook;
use voxloop_audio::PlayerConfig;
use voxloop_clone::{CloneEngine, CloneRequest};
use voxloop_foundation::{
    CloneError, VadError, VoiceMode, VoiceRuntimeConfig, VoxloopError,
};
use voxloop_stt::{SttAdapter, TranscribeOptions};
use voxloop_telemetry::{MetricsSlot, PipelineCounters, VoiceMetrics};
use voxloop_tts::{sanitize_markdown_for_speech, AudioEncoding, TtsAdapter, TtsError};
use voxloop_vad::{VadConfig, VadEngine};

pub type VadFactory =
    Box<dyn Fn(VadConfig) -> Result<Box<dyn VadEngine>, VadError> + Send + Sync>;

/// A registered cloned voice: where its reference audio lives. Persistent
/// stores live outside this crate and register voices here at startup.
#[derive(Debug, Clone)]
pub struct CloneVoice {
    pub id: String,
    pub name: Option<String>,
    pub reference_paths: Vec<PathBuf>,
    pub reference_text: Option<String>,
}

/// Per-call options for [`VoiceManager::speak_with`].
pub struct SpeakOptions {
    /// Playback speed; `None` uses the manager's current speed.
    pub speed: Option<f32>,
    /// Cloned voice id; `None` uses the default TTS adapter.
    pub voice: Option<String>,
    /// Strip Markdown header/emphasis syntax before synthesis.
    pub sanitize_syntax: bool,
    /// Fires when playback of this utterance drains.
    pub callback: Option<LifecycleHook>,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            speed: None,
            voice: None,
            sanitize_syntax: true,
            callback: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AecState {
    enabled: bool,
    stream_delay_ms: u32,
}

pub struct VoiceManagerBuilder {
    config: VoiceRuntimeConfig,
    tts: Option<Arc<dyn TtsAdapter>>,
    stt: Option<Arc<dyn SttAdapter>>,
    clone_engine: Option<Arc<dyn CloneEngine>>,
    aec_factory: Option<AecFactory>,
    player_config: PlayerConfig,
    vad_factory: Option<VadFactory>,
    capture_source: Option<CaptureSource>,
}

impl VoiceManagerBuilder {
    pub fn new(config: VoiceRuntimeConfig) -> Self {
        Self {
            config,
            tts: None,
            stt: None,
            clone_engine: None,
            aec_factory: None,
            player_config: PlayerConfig::default(),
            vad_factory: None,
            capture_source: None,
        }
    }

    pub fn with_tts_adapter(mut self, adapter: Arc<dyn TtsAdapter>) -> Self {
        self.tts = Some(adapter);
        self
    }

    pub fn with_stt_adapter(mut self, adapter: Arc<dyn SttAdapter>) -> Self {
        self.stt = Some(adapter);
        self
    }

    pub fn with_clone_engine(mut self, engine: Arc<dyn CloneEngine>) -> Self {
        self.clone_engine = Some(engine);
        self
    }

    /// AEC processors are built per listening session by this factory
    /// (argument: capture sample rate).
    pub fn with_aec_factory(mut self, factory: AecFactory) -> Self {
        self.aec_factory = Some(factory);
        self
    }

    pub fn with_player_config(mut self, config: PlayerConfig) -> Self {
        self.player_config = config;
        self
    }

    pub fn with_vad_factory(mut self, factory: VadFactory) -> Self {
        self.vad_factory = Some(factory);
        self
    }

    /// Capture source for the next `listen()`; defaults to the system
    /// input device.
    pub fn with_capture_source(mut self, source: CaptureSource) -> Self {
        self.capture_source = Some(source);
        self
    }

    pub fn build(self) -> VoiceManager {
        let metrics = MetricsSlot::new();
        let counters = PipelineCounters::new();
        let playback = PlaybackFacade::new(self.tts, self.player_config, metrics.clone());
        let turn = Arc::new(TurnCoordinator::new(self.config.voice_mode));

        // Playback lifecycle drives turn-taking through handles, not
        // object references.
        let (start_turn, end_turn) = (turn.clone(), turn.clone());
        playback.set_on_playback_start(Arc::new(move || start_turn.on_speak_start()));
        playback.set_on_playback_end(Arc::new(move || end_turn.on_speak_end()));

        let orchestrator = self.clone_engine.map(|engine| {
            CloneOrchestrator::new(
                engine,
                playback.clone(),
                metrics.clone(),
                self.config.cloned_tts_streaming,
            )
        });

        let language = if catalog::is_supported(&self.config.language) {
            self.config.language.clone()
        } else {
            warn!(
                requested = %self.config.language,
                fallback = catalog::SAFE_FALLBACK,
                "Unsupported language requested at init"
            );
            catalog::SAFE_FALLBACK.to_string()
        };

        let vad_factory = self.vad_factory.unwrap_or_else(default_vad_factory);

        VoiceManager {
            inner: Arc::new(Inner {
                config: self.config,
                playback,
                turn,
                orchestrator,
                stt: RwLock::new(self.stt),
                recognizer: RwLock::new(None),
                metrics,
                counters,
                speed: Mutex::new(1.0),
                language: Mutex::new(language),
                voices: Mutex::new(HashMap::new()),
                aec_factory: self.aec_factory,
                aec_state: Mutex::new(AecState::default()),
                vad_factory,
                capture_source: Mutex::new(self.capture_source),
            }),
        }
    }
}

#[cfg(feature = "webrtc-vad")]
fn default_vad_factory() -> VadFactory {
    Box::new(|config| {
        Ok(Box::new(voxloop_vad_webrtc::WebRtcVad::new(config)?) as Box<dyn VadEngine>)
    })
}

#[cfg(not(feature = "webrtc-vad"))]
fn default_vad_factory() -> VadFactory {
    Box::new(|_| {
        Err(VadError::ProcessingFailed(
            "no VAD backend: enable the webrtc-vad feature or supply a factory".into(),
        ))
    })
}

struct Inner {
    config: VoiceRuntimeConfig,
    playback: Arc<PlaybackFacade>,
    turn: Arc<TurnCoordinator>,
    orchestrator: Option<CloneOrchestrator>,
    stt: RwLock<Option<Arc<dyn SttAdapter>>>,
    recognizer: RwLock<Option<Arc<Recognizer>>>,
    metrics: MetricsSlot,
    counters: PipelineCounters,
    speed: Mutex<f32>,
    language: Mutex<String>,
    voices: Mutex<HashMap<String, CloneVoice>>,
    aec_factory: Option<AecFactory>,
    aec_state: Mutex<AecState>,
    vad_factory: VadFactory,
    capture_source: Mutex<Option<CaptureSource>>,
}

impl Inner {
    fn stop_speaking(&self) -> bool {
        if let Some(orchestrator) = &self.orchestrator {
            orchestrator.cancel_current();
        }
        let stopped = self.playback.stop(false);
        // An abrupt stop may never reach the natural drain events, which
        // would leave the recognizer paused. Route the end transition
        // explicitly; it is idempotent.
        self.turn.on_speak_end();
        stopped
    }

    fn available_stt(&self) -> Result<Arc<dyn SttAdapter>, VoxloopError> {
        self.stt
            .read()
            .clone()
            .filter(|s| s.is_available())
            .ok_or(VoxloopError::NoSttAdapter)
    }
}

pub struct VoiceManager {
    inner: Arc<Inner>,
}

impl VoiceManager {
    pub fn builder(config: VoiceRuntimeConfig) -> VoiceManagerBuilder {
        VoiceManagerBuilder::new(config)
    }

    /// Speak with the default adapter at the current speed.
    pub fn speak(&self, text: &str) -> Result<(), VoxloopError> {
        self.speak_with(text, SpeakOptions::default())
    }

    /// Speak with explicit options. Returns as soon as synthesis is
    /// dispatched; completion is observable through `options.callback`.
    pub fn speak_with(&self, text: &str, options: SpeakOptions) -> Result<(), VoxloopError> {
        let speed = options.speed.unwrap_or_else(|| *self.inner.speed.lock());
        if !(0.5..=2.0).contains(&speed) {
            return Err(VoxloopError::InvalidParameter(format!(
                "speed {speed} outside [0.5, 2.0]"
            )));
        }

        let speak_text = if options.sanitize_syntax {
            sanitize_markdown_for_speech(text)
        } else {
            text.to_string()
        };
        if speak_text.trim().is_empty() {
            return Err(VoxloopError::InvalidParameter("empty text".into()));
        }

        if let Some(voice_id) = &options.voice {
            let orchestrator =
                self.inner
                    .orchestrator
                    .as_ref()
                    .ok_or_else(|| VoxloopError::NoCloneEngine {
                        voice_id: voice_id.clone(),
                    })?;
            let voice = self
                .inner
                .voices
                .lock()
                .get(voice_id)
                .cloned()
                .ok_or_else(|| CloneError::UnknownVoice {
                    voice_id: voice_id.clone(),
                })?;

            // The previous utterance is gone the moment a new one starts.
            self.inner.stop_speaking();

            let mut request = CloneRequest::new(speak_text, voice.reference_paths);
            request.reference_text = voice.reference_text;
            request.speed = Some(speed);
            orchestrator.speak(request, voice_id, options.callback)?;
            return Ok(());
        }

        self.inner
            .playback
            .speak(&speak_text, speed, options.callback)
            .map_err(map_tts_err)
    }

    /// Synthesize to encoded bytes without playback.
    pub fn speak_to_bytes(
        &self,
        text: &str,
        encoding: AudioEncoding,
        voice: Option<&str>,
        sanitize_syntax: bool,
    ) -> Result<Vec<u8>, VoxloopError> {
        let speak_text = if sanitize_syntax {
            sanitize_markdown_for_speech(text)
        } else {
            text.to_string()
        };

        if let Some(voice_id) = voice {
            let orchestrator =
                self.inner
                    .orchestrator
                    .as_ref()
                    .ok_or_else(|| VoxloopError::NoCloneEngine {
                        voice_id: voice_id.to_string(),
                    })?;
            if encoding != AudioEncoding::Wav {
                return Err(CloneError::UnsupportedFormat(encoding.as_str().into()).into());
            }
            let voice = self
                .inner
                .voices
                .lock()
                .get(voice_id)
                .cloned()
                .ok_or_else(|| CloneError::UnknownVoice {
                    voice_id: voice_id.to_string(),
                })?;
            let mut request = CloneRequest::new(speak_text, voice.reference_paths);
            request.reference_text = voice.reference_text;
            request.speed = Some(*self.inner.speed.lock());
            return orchestrator.render_to_wav_bytes(&request).map_err(Into::into);
        }

        let adapter = self
            .inner
            .playback
            .adapter()
            .filter(|a| a.is_available())
            .ok_or(VoxloopError::NoTtsAdapter)?;
        adapter
            .synthesize_to_bytes(&speak_text, encoding)
            .map_err(map_tts_err)
    }

    /// Synthesize to a file; encoding inferred from the extension when not
    /// given.
    pub fn speak_to_file(
        &self,
        text: &str,
        output_path: &Path,
        encoding: Option<AudioEncoding>,
        voice: Option<&str>,
        sanitize_syntax: bool,
    ) -> Result<PathBuf, VoxloopError> {
        if voice.is_some() {
            let encoding = encoding
                .or_else(|| AudioEncoding::from_extension(output_path))
                .unwrap_or(AudioEncoding::Wav);
            let bytes = self.speak_to_bytes(text, encoding, voice, sanitize_syntax)?;
            if let Some(parent) = output_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| VoxloopError::Fatal(e.to_string()))?;
                }
            }
            std::fs::write(output_path, bytes).map_err(|e| VoxloopError::Fatal(e.to_string()))?;
            return Ok(output_path.to_path_buf());
        }

        let speak_text = if sanitize_syntax {
            sanitize_markdown_for_speech(text)
        } else {
            text.to_string()
        };
        let adapter = self
            .inner
            .playback
            .adapter()
            .filter(|a| a.is_available())
            .ok_or(VoxloopError::NoTtsAdapter)?;
        adapter
            .synthesize_to_file(&speak_text, output_path, encoding)
            .map_err(map_tts_err)
    }

    /// Stop playback and any in-flight cloned synthesis. Safe when idle;
    /// always restores the recognizer state for the active mode.
    pub fn stop_speaking(&self) -> bool {
        self.inner.stop_speaking()
    }

    pub fn pause_speaking(&self) -> bool {
        self.inner.playback.pause()
    }

    pub fn resume_speaking(&self) -> bool {
        self.inner.playback.resume()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.playback.is_paused()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.playback.is_active()
            || self
                .inner
                .orchestrator
                .as_ref()
                .is_some_and(|o| o.is_synthesizing())
    }

    pub fn set_speed(&self, speed: f32) -> bool {
        if (0.5..=2.0).contains(&speed) {
            *self.inner.speed.lock() = speed;
            true
        } else {
            false
        }
    }

    pub fn get_speed(&self) -> f32 {
        *self.inner.speed.lock()
    }

    /// Switch language across the TTS adapter, STT adapter and recognizer.
    /// Unknown or adapter-rejected codes leave everything unchanged.
    pub fn set_language(&self, language: &str) -> bool {
        let code = language.trim().to_lowercase();
        if !catalog::is_supported(&code) {
            warn!(code = %code, "Unsupported language");
            return false;
        }
        if code == *self.inner.language.lock() {
            return true;
        }

        self.inner.stop_speaking();
        if let Some(adapter) = self.inner.playback.adapter() {
            if !adapter.set_language(&code) {
                warn!(code = %code, "TTS adapter rejected language, keeping previous");
                return false;
            }
        }
        if let Some(stt) = self.inner.stt.read().clone() {
            // Best effort: many STT backends are multilingual anyway.
            let _ = stt.set_language(&code);
        }
        if let Some(recognizer) = self.inner.recognizer.read().clone() {
            recognizer.set_language(Some(code.clone()));
        }
        *self.inner.language.lock() = code;
        true
    }

    pub fn get_language(&self) -> String {
        self.inner.language.lock().clone()
    }

    pub fn supported_languages(&self) -> Vec<String> {
        catalog::supported_languages()
    }

    /// Start hands-free listening. Returns `Ok(false)` when already
    /// listening.
    pub fn listen(
        &self,
        on_transcription: Arc<dyn Fn(String) + Send + Sync>,
        on_stop: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> Result<bool, VoxloopError> {
        if let Some(existing) = self.inner.recognizer.read().clone() {
            if existing.is_running() {
                return Ok(false);
            }
        }

        let stt = self.inner.available_stt()?;
        let vad_config = VadConfig::default();
        let vad = (self.inner.vad_factory)(vad_config)?;

        let config = RecognizerConfig {
            language: Some(self.inner.language.lock().clone()),
            ..Default::default()
        };

        let weak_stop: Weak<Inner> = Arc::downgrade(&self.inner);
        let stop_callback: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            if let Some(inner) = weak_stop.upgrade() {
                // Signal only: this runs on the capture worker, which must
                // not join itself. `stop_listening` reaps the thread.
                if let Some(recognizer) = inner.recognizer.read().clone() {
                    recognizer.signal_stop();
                }
            }
            if let Some(user) = &on_stop {
                user();
            }
        });

        let weak_interrupt: Weak<Inner> = Arc::downgrade(&self.inner);
        let interrupt_callback: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            if let Some(inner) = weak_interrupt.upgrade() {
                inner.stop_speaking();
            }
        });

        let source = self
            .inner
            .capture_source
            .lock()
            .take()
            .unwrap_or(CaptureSource::Device(CaptureConfig::default()));

        let recognizer = Recognizer::spawn(
            config,
            vad,
            stt,
            RecognizerCallbacks {
                on_transcription,
                on_stop: Some(stop_callback),
                on_tts_interrupt: Some(interrupt_callback),
            },
            source,
            self.inner.counters.clone(),
        )?;

        recognizer.set_profile(self.inner.turn.mode());

        // Rendered output feeds back as the recognizer's far end (AEC
        // reference and echo gate).
        let weak_rec = Arc::downgrade(&recognizer);
        self.inner
            .playback
            .player()
            .hooks()
            .set_on_audio_chunk(Arc::new(move |chunk, sample_rate| {
                if let Some(rec) = weak_rec.upgrade() {
                    rec.feed_far_end_audio(chunk, sample_rate);
                }
            }));

        let aec_state = *self.inner.aec_state.lock();
        if aec_state.enabled {
            if let Some(factory) = &self.inner.aec_factory {
                let mut processor = factory(recognizer.sample_rate());
                processor.set_stream_delay_ms(aec_state.stream_delay_ms);
                recognizer.set_aec(Some(processor));
            }
        }

        *self.inner.recognizer.write() = Some(recognizer.clone());
        self.inner.turn.set_recognizer(Some(recognizer));
        info!("Listening started");
        Ok(true)
    }

    pub fn stop_listening(&self) -> bool {
        let recognizer = self.inner.recognizer.write().take();
        self.inner.turn.set_recognizer(None);
        match recognizer {
            Some(rec) => rec.stop(),
            None => false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.inner
            .recognizer
            .read()
            .as_ref()
            .is_some_and(|r| r.is_running())
    }

    /// Change the voice mode; applies to both turn routing and the live
    /// recognizer profile.
    pub fn set_voice_mode(&self, mode: VoiceMode) -> bool {
        self.inner.turn.set_mode(mode);
        if let Some(recognizer) = self.inner.recognizer.read().clone() {
            recognizer.set_profile(mode);
        }
        true
    }

    pub fn voice_mode(&self) -> VoiceMode {
        self.inner.turn.mode()
    }

    pub fn set_vad_aggressiveness(&self, aggressiveness: u8) -> bool {
        match self.inner.recognizer.read().clone() {
            Some(recognizer) => recognizer.set_vad_aggressiveness(aggressiveness),
            None => false,
        }
    }

    /// Turn acoustic echo cancellation on or off. Requires an AEC factory
    /// at build time.
    pub fn enable_aec(&self, enabled: bool, stream_delay_ms: u32) -> Result<(), VoxloopError> {
        if enabled && self.inner.aec_factory.is_none() {
            return Err(VoxloopError::AecNotConfigured);
        }
        *self.inner.aec_state.lock() = AecState {
            enabled,
            stream_delay_ms,
        };

        if let Some(recognizer) = self.inner.recognizer.read().clone() {
            if enabled {
                let factory = self.inner.aec_factory.as_ref().unwrap();
                let mut processor = factory(recognizer.sample_rate());
                processor.set_stream_delay_ms(stream_delay_ms);
                recognizer.set_aec(Some(processor));
            } else {
                recognizer.set_aec(None);
            }
        }
        Ok(())
    }

    /// Manually feed far-end (speaker) audio, for hosts that render audio
    /// outside this manager. The built-in playback path feeds itself.
    pub fn feed_far_end_audio(&self, samples: &[f32], sample_rate: u32) {
        if let Some(recognizer) = self.inner.recognizer.read().clone() {
            recognizer.feed_far_end_audio(samples, sample_rate);
        }
    }

    pub fn transcribe_file(
        &self,
        path: &Path,
        language: Option<&str>,
    ) -> Result<String, VoxloopError> {
        let stt = self.inner.available_stt()?;
        let mut opts = TranscribeOptions::new();
        if let Some(lang) = language {
            opts = opts.language(lang);
        }
        stt.transcribe_file(path, &opts).map_err(Into::into)
    }

    pub fn transcribe_bytes(
        &self,
        bytes: &[u8],
        language: Option<&str>,
    ) -> Result<String, VoxloopError> {
        let stt = self.inner.available_stt()?;
        let mut opts = TranscribeOptions::new();
        if let Some(lang) = language {
            opts = opts.language(lang);
        }
        stt.transcribe_bytes(bytes, &opts).map_err(Into::into)
    }

    /// Swap the STT backend (e.g. a different model size); applies to the
    /// live recognizer immediately.
    pub fn set_stt_adapter(&self, adapter: Arc<dyn SttAdapter>) {
        if let Some(recognizer) = self.inner.recognizer.read().clone() {
            recognizer.set_stt_adapter(adapter.clone());
        }
        *self.inner.stt.write() = Some(adapter);
    }

    /// Register a cloned voice so `speak_with(voice = id)` can find its
    /// reference bundle. Persistence is the caller's concern.
    pub fn register_cloned_voice(&self, voice: CloneVoice) {
        self.inner.voices.lock().insert(voice.id.clone(), voice);
    }

    pub fn cloned_voices(&self) -> Vec<CloneVoice> {
        self.inner.voices.lock().values().cloned().collect()
    }

    pub fn remove_cloned_voice(&self, voice_id: &str) -> bool {
        self.inner.voices.lock().remove(voice_id).is_some()
    }

    /// Take the metrics of the most recent synthesis, leaving the slot
    /// empty.
    pub fn pop_last_tts_metrics(&self) -> Option<VoiceMetrics> {
        self.inner.metrics.pop()
    }

    /// Direct access to the playback facade (advanced wiring, tests).
    pub fn playback(&self) -> &Arc<PlaybackFacade> {
        &self.inner.playback
    }

    pub fn config(&self) -> &VoiceRuntimeConfig {
        &self.inner.config
    }

    /// Release the capture device and the output stream.
    pub fn cleanup(&self) -> bool {
        self.stop_listening();
        self.inner.stop_speaking();
        self.inner.playback.cleanup();
        true
    }
}

impl Drop for VoiceManager {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn map_tts_err(e: TtsError) -> VoxloopError {
    match e {
        TtsError::EngineNotAvailable(_) => VoxloopError::NoTtsAdapter,
        other => VoxloopError::Tts(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxloop_audio::OutputMode;
    use voxloop_tts::MockTtsAdapter;

    fn manager_with_tts(adapter: Arc<MockTtsAdapter>) -> VoiceManager {
        VoiceManager::builder(VoiceRuntimeConfig::default())
            .with_tts_adapter(adapter)
            .with_player_config(PlayerConfig {
                mode: OutputMode::Null,
                device_name: None,
            })
            .build()
    }

    #[test]
    fn speak_sanitizes_markdown_by_default() {
        let adapter = Arc::new(MockTtsAdapter::default());
        let manager = manager_with_tts(adapter.clone());

        manager.speak("# Title **bold** *italics*").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(adapter.synthesized(), vec!["Title bold italics"]);
    }

    #[test]
    fn speak_can_opt_out_of_sanitization() {
        let adapter = Arc::new(MockTtsAdapter::default());
        let manager = manager_with_tts(adapter.clone());

        manager
            .speak_with(
                "# Title **bold**",
                SpeakOptions {
                    sanitize_syntax: false,
                    ..Default::default()
                },
            )
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(adapter.synthesized(), vec!["# Title **bold**"]);
    }

    #[test]
    fn out_of_range_speed_is_rejected_without_side_effects() {
        let adapter = Arc::new(MockTtsAdapter::default());
        let manager = manager_with_tts(adapter.clone());

        assert!(matches!(
            manager.speak_with(
                "hello",
                SpeakOptions {
                    speed: Some(3.0),
                    ..Default::default()
                }
            ),
            Err(VoxloopError::InvalidParameter(_))
        ));
        assert!(adapter.synthesized().is_empty());

        assert!(!manager.set_speed(0.1));
        assert!(manager.set_speed(1.5));
        assert_eq!(manager.get_speed(), 1.5);
    }

    #[test]
    fn empty_text_is_rejected() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert!(matches!(
            manager.speak("   "),
            Err(VoxloopError::InvalidParameter(_))
        ));
    }

    #[test]
    fn unknown_language_keeps_previous_state() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert_eq!(manager.get_language(), "en");
        assert!(!manager.set_language("xx"));
        assert_eq!(manager.get_language(), "en");
        assert!(manager.set_language("fr"));
        assert_eq!(manager.get_language(), "fr");
    }

    #[test]
    fn adapter_rejected_language_is_not_committed() {
        // Mock adapter supports en/fr/de/es; "ru" is in the catalog but
        // not in the adapter.
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert!(!manager.set_language("ru"));
        assert_eq!(manager.get_language(), "en");
    }

    #[test]
    fn speak_without_adapter_fails_fast() {
        let manager = VoiceManager::builder(VoiceRuntimeConfig::default())
            .with_player_config(PlayerConfig {
                mode: OutputMode::Null,
                device_name: None,
            })
            .build();
        assert!(matches!(
            manager.speak("hello"),
            Err(VoxloopError::NoTtsAdapter)
        ));
    }

    #[test]
    fn voice_without_clone_engine_fails_fast() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert!(matches!(
            manager.speak_with(
                "hello",
                SpeakOptions {
                    voice: Some("v1".into()),
                    ..Default::default()
                }
            ),
            Err(VoxloopError::NoCloneEngine { .. })
        ));
    }

    #[test]
    fn stop_speaking_when_idle_is_a_safe_no_op() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert!(!manager.stop_speaking());
    }

    #[test]
    fn enable_aec_without_factory_is_rejected() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert!(matches!(
            manager.enable_aec(true, 40),
            Err(VoxloopError::AecNotConfigured)
        ));
        // Disabling never needs the factory.
        manager.enable_aec(false, 0).unwrap();
    }

    #[test]
    fn default_voice_mode_is_wait() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        assert_eq!(manager.voice_mode(), VoiceMode::Wait);
        assert!(manager.set_voice_mode(VoiceMode::Full));
        assert_eq!(manager.voice_mode(), VoiceMode::Full);
    }

    #[test]
    fn cloned_voice_registry_round_trips() {
        let manager = manager_with_tts(Arc::new(MockTtsAdapter::default()));
        manager.register_cloned_voice(CloneVoice {
            id: "v1".into(),
            name: Some("Test".into()),
            reference_paths: vec![PathBuf::from("ref.wav")],
            reference_text: None,
        });
        assert_eq!(manager.cloned_voices().len(), 1);
        assert!(manager.remove_cloned_voice("v1"));
        assert!(!manager.remove_cloned_voice("v1"));
    }
}
