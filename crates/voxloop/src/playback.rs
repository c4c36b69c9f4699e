//! Adapter-bound playback façade.
//!
//! Presents the turn coordinator and the manager with one surface for
//! "make sound come out": synthesize-and-play for the default adapter,
//! session-based enqueue for externally produced audio (cloning), and
//! stop/pause/resume with immediate effect.

use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Instant;
use tracing::warn;
use voxloop_audio::player::LifecycleHook;
use voxloop_audio::{AudioBuffer, AudioPlayer, PlayerConfig};
use voxloop_foundation::AudioError;
use voxloop_telemetry::{MetricsSlot, VoiceMetrics};
use voxloop_tts::{apply_speed_preserving_pitch, TtsAdapter, TtsError, TtsResult};

pub struct PlaybackFacade {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: RwLock<Option<Arc<dyn TtsAdapter>>>,
    player: AudioPlayer,
    metrics: MetricsSlot,
    on_playback_start: RwLock<Option<LifecycleHook>>,
    on_playback_end: RwLock<Option<LifecycleHook>>,
    /// Completion callback for the current session; consumed on drain.
    user_callback: Mutex<Option<LifecycleHook>>,
}

fn run_guarded(hook: &LifecycleHook) {
    if catch_unwind(AssertUnwindSafe(|| hook())).is_err() {
        warn!("Playback callback panicked");
    }
}

impl Inner {
    fn fire_playback_start(&self) {
        if let Some(hook) = self.on_playback_start.read().clone() {
            thread::spawn(move || run_guarded(&hook));
        }
    }

    /// Runs on a notifier thread after the queue drains.
    fn handle_drain(&self) {
        if let Some(hook) = self.on_playback_end.read().clone() {
            run_guarded(&hook);
        }
        if let Some(callback) = self.user_callback.lock().take() {
            run_guarded(&callback);
        }
    }
}

impl PlaybackFacade {
    pub fn new(
        adapter: Option<Arc<dyn TtsAdapter>>,
        player_config: PlayerConfig,
        metrics: MetricsSlot,
    ) -> Arc<Self> {
        let inner = Arc::new(Inner {
            adapter: RwLock::new(adapter),
            player: AudioPlayer::new(player_config),
            metrics,
            on_playback_start: RwLock::new(None),
            on_playback_end: RwLock::new(None),
            user_callback: Mutex::new(None),
        });

        // The player must not keep the façade alive.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.player.hooks().set_on_audio_end(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_drain();
            }
        }));

        Arc::new(Self { inner })
    }

    pub fn set_on_playback_start(&self, hook: LifecycleHook) {
        *self.inner.on_playback_start.write() = Some(hook);
    }

    pub fn set_on_playback_end(&self, hook: LifecycleHook) {
        *self.inner.on_playback_end.write() = Some(hook);
    }

    pub fn set_adapter(&self, adapter: Option<Arc<dyn TtsAdapter>>) {
        *self.inner.adapter.write() = adapter;
    }

    pub fn adapter(&self) -> Option<Arc<dyn TtsAdapter>> {
        self.inner.adapter.read().clone()
    }

    pub fn player(&self) -> &AudioPlayer {
        &self.inner.player
    }

    /// Synthesize `text` and enqueue it for playback. Availability is
    /// checked synchronously; synthesis runs on a worker thread and the
    /// call returns immediately. `callback` fires when playback drains.
    pub fn speak(
        &self,
        text: &str,
        speed: f32,
        callback: Option<LifecycleHook>,
    ) -> TtsResult<()> {
        let adapter = self
            .inner
            .adapter
            .read()
            .clone()
            .ok_or_else(|| TtsError::EngineNotAvailable("no adapter configured".into()))?;
        if !adapter.is_available() {
            return Err(TtsError::EngineNotAvailable("adapter reports unavailable".into()));
        }

        *self.inner.user_callback.lock() = callback;
        self.inner.fire_playback_start();

        let inner = self.inner.clone();
        let text = text.to_string();
        thread::Builder::new()
            .name("tts-synthesis".to_string())
            .spawn(move || {
                let t0 = Instant::now();
                match adapter.synthesize(&text) {
                    Ok(audio) => {
                        let synth_s = t0.elapsed().as_secs_f64();
                        let samples = if (speed - 1.0).abs() > 1e-3 {
                            apply_speed_preserving_pitch(&audio.samples, speed)
                        } else {
                            audio.samples
                        };
                        let sample_rate = audio.sample_rate;
                        let audio_s = samples.len() as f64 / sample_rate.max(1) as f64;
                        inner.metrics.set(VoiceMetrics {
                            engine: "tts".into(),
                            synth_s,
                            audio_s,
                            rtf: (audio_s > 0.0).then(|| synth_s / audio_s),
                            sample_rate: Some(sample_rate),
                            audio_samples: samples.len() as u64,
                            speed: Some(speed),
                            ts: VoiceMetrics::now_ts(),
                            ..Default::default()
                        });
                        if let Err(e) = inner.player.play_audio(&samples, sample_rate) {
                            warn!(error = %e, "Playback enqueue failed");
                            inner
                                .metrics
                                .set(VoiceMetrics::error("tts", None, e.to_string()));
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Synthesis failed");
                        inner
                            .metrics
                            .set(VoiceMetrics::error("tts", None, e.to_string()));
                    }
                }
            })
            .map_err(|e| TtsError::SynthesisFailed(format!("spawn failed: {e}")))?;

        Ok(())
    }

    /// Open a playback session for externally produced audio at a declared
    /// rate. Returns the rate the sink actually runs at.
    pub fn begin_playback(
        &self,
        callback: Option<LifecycleHook>,
        sample_rate: u32,
    ) -> Result<u32, AudioError> {
        if callback.is_some() {
            *self.inner.user_callback.lock() = callback;
        }
        self.inner.fire_playback_start();
        self.inner.player.begin_session(sample_rate)
    }

    /// Append one frame to the current session.
    pub fn enqueue_audio(&self, audio: &AudioBuffer) -> Result<(), AudioError> {
        self.inner.player.play_audio(&audio.samples, audio.sample_rate)
    }

    /// One-shot: open a session and enqueue a fully synthesized buffer.
    pub fn play_audio_array(
        &self,
        audio: &AudioBuffer,
        callback: Option<LifecycleHook>,
    ) -> Result<(), AudioError> {
        *self.inner.user_callback.lock() = callback;
        self.inner.fire_playback_start();
        self.inner.player.begin_session(audio.sample_rate)?;
        self.inner.player.play_audio(&audio.samples, audio.sample_rate)
    }

    /// Stop playback immediately and discard queued audio. With
    /// `close_stream` false the device stays open, which is kinder to
    /// hosts where close/reopen cycles are unreliable. Returns false when
    /// there was nothing to stop.
    pub fn stop(&self, close_stream: bool) -> bool {
        let had_sink = self.inner.player.opened_rate().is_some();
        let was_playing = self.inner.player.is_playing();
        if !(had_sink || was_playing) {
            return false;
        }
        if close_stream {
            self.inner.player.stop_sink();
        } else {
            self.inner.player.flush();
        }
        true
    }

    pub fn pause(&self) -> bool {
        self.inner.player.pause()
    }

    pub fn resume(&self) -> bool {
        self.inner.player.resume()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.player.is_paused()
    }

    pub fn is_active(&self) -> bool {
        self.inner.player.is_playing()
    }

    pub fn cleanup(&self) {
        self.inner.player.cleanup();
        *self.inner.user_callback.lock() = None;
    }
}
