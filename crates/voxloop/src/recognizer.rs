//! Capture + recognition pipeline.
//!
//! One worker thread reads fixed 30 ms PCM16 chunks from the capture ring
//! and runs them through: optional AEC, the rolling stop-phrase detector
//! (active while normal transcriptions are paused), then VAD and the
//! utterance state machine. Listening profiles tune the VAD thresholds for
//! the current interaction mode.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use voxloop_audio::capture::{CaptureConfig, CaptureThread};
use voxloop_audio::ring_buffer::{AudioConsumer, AudioRingBuffer};
use voxloop_audio::resampler::{linear_resample, linear_resample_i16};
use voxloop_audio::{f32_to_pcm16, pcm16_to_f32, AecProcessor};
use voxloop_foundation::{SttError, VoiceMode, VoxloopError};
use voxloop_stt::{match_stop_phrase, SttAdapter, TranscribeOptions};
use voxloop_telemetry::PipelineCounters;
use voxloop_vad::VadEngine;

/// Capture ring capacity: ~4 s at 16 kHz mono, headroom for STT stalls.
const RING_CAPACITY: usize = 65_536;
/// Far-end history kept for the echo gate (samples at the capture rate).
const ECHO_HISTORY_FACTOR: u32 = 2; // sample_rate / 2 => 500 ms
/// Normalized correlation above this is treated as speaker echo.
const ECHO_CORR_THRESHOLD: f32 = 0.6;
/// Offset stride when sliding the near chunk over far-end history.
const ECHO_SCAN_STEP: usize = 80;
/// Confirmation window for bare "stop" during playback.
const STOP_CONFIRM_WINDOW: Duration = Duration::from_millis(2_500);
/// Hotword bias handed to the STT adapter by the rolling detector.
const STOP_HOTWORDS: &str = "stop, ok stop, okay stop";
/// Transcripts longer than this many tokens are treated as hallucinated.
const STOP_MAX_TOKENS: usize = 4;

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Processing rate; VAD and STT both consume audio at this rate.
    pub sample_rate: u32,
    /// Chunk duration fed to the VAD.
    pub chunk_ms: u32,
    /// Cumulative speech needed before an utterance starts recording.
    pub min_speech_ms: u32,
    /// Trailing silence that ends an utterance.
    pub silence_timeout_ms: u32,
    pub stop_phrases: Vec<String>,
    /// Rolling stop-detector window.
    pub stop_window_s: f32,
    /// Minimum spacing between rolling stop-detector transcriptions.
    pub stop_check_interval_s: f32,
    /// Transcription language; `None` lets the adapter detect.
    pub language: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_ms: 30,
            min_speech_ms: 600,
            silence_timeout_ms: 1_500,
            stop_phrases: vec!["stop".into(), "ok stop".into(), "okay stop".into()],
            stop_window_s: 2.0,
            stop_check_interval_s: 0.6,
            language: None,
        }
    }
}

impl RecognizerConfig {
    pub fn chunk_size(&self) -> usize {
        (self.sample_rate as usize * self.chunk_ms as usize) / 1000
    }

    fn chunks_for_ms(&self, ms: u32) -> usize {
        ((ms as f32 / self.chunk_ms as f32).round() as usize).max(1)
    }
}

/// Where capture frames come from.
pub enum CaptureSource {
    /// Open a real input device.
    Device(CaptureConfig),
    /// Pre-wired ring of mono PCM16 at `sample_rate`; the producer half is
    /// driven by the caller (tests, file replay).
    Ring {
        consumer: AudioConsumer,
        sample_rate: u32,
    },
}

pub struct RecognizerCallbacks {
    /// Receives each finished utterance transcript.
    pub on_transcription: Arc<dyn Fn(String) + Send + Sync>,
    /// Invoked when a stop phrase is confirmed.
    pub on_stop: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Barge-in: invoked when the user starts speaking in FULL profile.
    pub on_tts_interrupt: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// The pause/resume surface the turn coordinator drives. A trait seam so
/// coordination can be tested without microphones.
pub trait RecognizerControl: Send + Sync {
    fn pause_listening(&self);
    fn resume_listening(&self);
    fn pause_transcriptions(&self);
    fn resume_transcriptions(&self);
    fn pause_tts_interrupt(&self);
    fn resume_tts_interrupt(&self);
    fn aec_enabled(&self) -> bool;
}

struct Shared {
    config: RecognizerConfig,
    running: AtomicBool,
    listening_paused: AtomicBool,
    transcriptions_paused: AtomicBool,
    tts_interrupt_enabled: AtomicBool,
    profile: Mutex<VoiceMode>,
    min_speech_chunks: AtomicUsize,
    silence_timeout_chunks: AtomicUsize,
    vad: Mutex<Box<dyn VadEngine>>,
    stt: RwLock<Arc<dyn SttAdapter>>,
    language: Mutex<Option<String>>,
    aec: Mutex<Option<Box<dyn AecProcessor>>>,
    aec_enabled: AtomicBool,
    /// Far-end PCM16 queued for AEC, consumed in 10 ms sub-frames.
    far_queue: Mutex<VecDeque<i16>>,
    /// Recent far-end audio for the no-AEC echo gate. Fed regardless of
    /// AEC state.
    far_history: Mutex<VecDeque<i16>>,
    callbacks: RecognizerCallbacks,
    counters: PipelineCounters,
}

fn guarded(f: &Arc<dyn Fn() + Send + Sync>) {
    if catch_unwind(AssertUnwindSafe(|| f())).is_err() {
        warn!("Recognizer callback panicked");
    }
}

fn guarded_text(f: &Arc<dyn Fn(String) + Send + Sync>, text: String) {
    if catch_unwind(AssertUnwindSafe(|| f(text))).is_err() {
        warn!("Transcription callback panicked");
    }
}

impl Shared {
    fn transcribe_pcm16(
        &self,
        pcm: &[i16],
        hotwords: Option<&str>,
        condition_on_previous_text: bool,
    ) -> Result<String, SttError> {
        if pcm.is_empty() {
            return Ok(String::new());
        }
        let samples = pcm16_to_f32(pcm);
        let mut opts = TranscribeOptions::new().condition_on_previous_text(condition_on_previous_text);
        if let Some(h) = hotwords {
            opts = opts.hotwords(h);
        }
        if let Some(lang) = self.language.lock().clone() {
            opts = opts.language(lang);
        }
        let stt = self.stt.read().clone();
        stt.transcribe_samples(&samples, self.config.sample_rate, &opts)
            .map(|t| t.trim().to_string())
    }

    fn pop_far_end(&self, n: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(n);
        let mut queue = self.far_queue.lock();
        for _ in 0..n.min(queue.len()) {
            out.push(queue.pop_front().unwrap());
        }
        out.resize(n, 0);
        out
    }

    /// Near/far correlation gate: with AEC off, a mic chunk that closely
    /// matches recently rendered output is the speaker, not the user.
    fn is_likely_echo(&self, near: &[i16]) -> bool {
        let history: Vec<f32> = {
            let h = self.far_history.lock();
            if h.len() < near.len() {
                return false;
            }
            h.iter().map(|&s| s as f32 / 32768.0).collect()
        };
        let near_f: Vec<f32> = near.iter().map(|&s| s as f32 / 32768.0).collect();
        let near_norm = near_f.iter().map(|s| s * s).sum::<f32>().sqrt();
        if near_norm < 1e-4 {
            return false;
        }

        let mut offset = 0;
        let mut best = 0.0f32;
        while offset + near_f.len() <= history.len() {
            let window = &history[offset..offset + near_f.len()];
            let dot: f32 = near_f.iter().zip(window).map(|(a, b)| a * b).sum();
            let window_norm = window.iter().map(|s| s * s).sum::<f32>().sqrt();
            if window_norm > 1e-4 {
                best = best.max((dot / (near_norm * window_norm)).abs());
                if best >= ECHO_CORR_THRESHOLD {
                    return true;
                }
            }
            offset += ECHO_SCAN_STEP;
        }
        false
    }
}

/// Per-chunk pipeline state, owned by the worker thread.
struct RecognizerCore {
    shared: Arc<Shared>,
    speech_buffer: Vec<i16>,
    speech_count: usize,
    silence_count: usize,
    recording: bool,
    stop_ring: Vec<i16>,
    stop_last_check: Option<Instant>,
    stop_hit_count: u32,
    stop_hit_deadline: Option<Instant>,
}

impl RecognizerCore {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            speech_buffer: Vec::new(),
            speech_count: 0,
            silence_count: 0,
            recording: false,
            stop_ring: Vec::new(),
            stop_last_check: None,
            stop_hit_count: 0,
            stop_hit_deadline: None,
        }
    }

    fn process_chunk(&mut self, raw: &[i16]) {
        let chunk = self.apply_aec(raw);

        // While playback suppresses normal transcriptions, the rolling
        // stop detector still listens. A confirmed hit consumes the chunk.
        if self.maybe_detect_stop_phrase(&chunk) {
            return;
        }

        let is_speech = match self.shared.vad.lock().is_speech(&chunk) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "VAD rejected chunk");
                return;
            }
        };
        self.shared.counters.incr_vad_frames();

        if is_speech {
            self.shared.counters.incr_speech_frames();
            self.speech_buffer.extend_from_slice(&chunk);
            self.speech_count += 1;
            self.silence_count = 0;

            let min_chunks = self.shared.min_speech_chunks.load(Ordering::Relaxed);
            if !self.recording && self.speech_count >= min_chunks {
                self.maybe_interrupt_playback(&chunk);
                self.recording = true;
            }
        } else if self.recording {
            self.speech_buffer.extend_from_slice(&chunk);
            self.silence_count += 1;
            if self.silence_count >= self.shared.silence_timeout_chunks.load(Ordering::Relaxed) {
                self.finalize_utterance();
            }
        } else {
            // Decay accumulated speech so isolated blips don't linger.
            self.speech_count = self.speech_count.saturating_sub(1);
            if self.speech_count == 0 {
                self.speech_buffer.clear();
            }
        }
    }

    /// Barge-in, FULL profile only: gated by the interrupt switch and,
    /// without AEC, by the echo gate.
    fn maybe_interrupt_playback(&self, chunk: &[i16]) {
        if *self.shared.profile.lock() != VoiceMode::Full {
            return;
        }
        let Some(interrupt) = &self.shared.callbacks.on_tts_interrupt else {
            return;
        };
        if !self.shared.tts_interrupt_enabled.load(Ordering::SeqCst) {
            return;
        }
        if !self.shared.aec_enabled.load(Ordering::SeqCst) && self.shared.is_likely_echo(chunk) {
            debug!("Barge-in suppressed: near end correlates with rendered audio");
            return;
        }
        info!("User speech detected during playback, interrupting");
        guarded(interrupt);
    }

    fn apply_aec(&mut self, chunk: &[i16]) -> Vec<i16> {
        if !self.shared.aec_enabled.load(Ordering::SeqCst) {
            return chunk.to_vec();
        }
        let mut guard = self.shared.aec.lock();
        let Some(aec) = guard.as_mut() else {
            return chunk.to_vec();
        };

        let frame = (self.shared.config.sample_rate as usize) / 100; // 10 ms
        let mut near = chunk.to_vec();
        if near.len() % frame != 0 {
            near.resize(near.len() + frame - (near.len() % frame), 0);
        }

        let mut cleaned = Vec::with_capacity(near.len());
        for sub in near.chunks(frame) {
            let far = self.shared.pop_far_end(frame);
            match aec.process(sub, &far) {
                Ok(mut out) => {
                    out.resize(frame, 0);
                    cleaned.extend(out);
                }
                Err(e) => {
                    warn!(error = %e, "AEC failed, using raw chunk");
                    return chunk.to_vec();
                }
            }
        }
        cleaned.truncate(chunk.len());
        cleaned
    }

    /// Best-effort rolling stop-phrase detection during playback. Returns
    /// true when the stop callback fired and the chunk is consumed.
    fn maybe_detect_stop_phrase(&mut self, chunk: &[i16]) -> bool {
        let shared = &self.shared;
        if !shared.transcriptions_paused.load(Ordering::SeqCst) {
            return false;
        }
        let Some(on_stop) = &shared.callbacks.on_stop else {
            return false;
        };

        self.stop_ring.extend_from_slice(chunk);
        let max_len =
            (shared.config.sample_rate as f32 * shared.config.stop_window_s) as usize;
        if self.stop_ring.len() > max_len {
            let excess = self.stop_ring.len() - max_len;
            self.stop_ring.drain(..excess);
        }

        let now = Instant::now();
        let interval = Duration::from_secs_f32(shared.config.stop_check_interval_s.max(0.0));
        if let Some(last) = self.stop_last_check {
            if now.duration_since(last) < interval {
                return false;
            }
        }
        self.stop_last_check = Some(now);
        shared.counters.incr_stop_checks();

        let text = match shared.transcribe_pcm16(&self.stop_ring, Some(STOP_HOTWORDS), false) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "Stop-window transcription failed");
                return false;
            }
        };

        // Hotword bias makes long hallucinated transcripts likely; only
        // short ones are trusted.
        if text.split_whitespace().count() > STOP_MAX_TOKENS {
            self.stop_hit_count = 0;
            return false;
        }

        let Some(matched) = match_stop_phrase(&text, &shared.config.stop_phrases) else {
            return false;
        };

        if matched == "stop" {
            // Bare "stop" needs a second hit inside the confirmation
            // window; "ok stop"/"okay stop" are accepted immediately.
            let now = Instant::now();
            if self.stop_hit_deadline.map(|d| now > d).unwrap_or(true) {
                self.stop_hit_count = 0;
            }
            self.stop_hit_deadline = Some(now + STOP_CONFIRM_WINDOW);
            self.stop_hit_count += 1;
            if self.stop_hit_count < 2 {
                return false;
            }
        } else {
            self.stop_hit_count = 0;
        }

        info!(phrase = %matched, "Stop phrase confirmed during playback");
        shared.counters.incr_stop_hits();
        guarded(on_stop);
        self.stop_ring.clear();
        self.stop_last_check = Some(Instant::now());
        true
    }

    fn finalize_utterance(&mut self) {
        let shared = self.shared.clone();
        shared.counters.incr_utterances();
        debug!(
            samples = self.speech_buffer.len(),
            "End of utterance, transcribing"
        );

        match shared.transcribe_pcm16(&self.speech_buffer, None, true) {
            Ok(text) if !text.is_empty() => {
                if match_stop_phrase(&text, &shared.config.stop_phrases).is_some() {
                    if let Some(on_stop) = &shared.callbacks.on_stop {
                        guarded(on_stop);
                    } else {
                        guarded_text(&shared.callbacks.on_transcription, text);
                    }
                } else if !shared.transcriptions_paused.load(Ordering::SeqCst) {
                    guarded_text(&shared.callbacks.on_transcription, text);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Utterance transcription failed"),
        }

        self.speech_buffer.clear();
        self.speech_count = 0;
        self.silence_count = 0;
        self.recording = false;
    }
}

/// Control surface around the capture worker.
pub struct Recognizer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    capture: Mutex<Option<CaptureThread>>,
}

impl Recognizer {
    /// Spawn the recognition worker over the given capture source.
    pub fn spawn(
        config: RecognizerConfig,
        vad: Box<dyn VadEngine>,
        stt: Arc<dyn SttAdapter>,
        callbacks: RecognizerCallbacks,
        source: CaptureSource,
        counters: PipelineCounters,
    ) -> Result<Arc<Self>, VoxloopError> {
        if vad.frame_size_samples() != config.chunk_size() {
            return Err(voxloop_foundation::VadError::InvalidFrameSize {
                expected: config.chunk_size(),
                actual: vad.frame_size_samples(),
            }
            .into());
        }
        if !stt.is_available() {
            return Err(VoxloopError::NoSttAdapter);
        }

        let shared = Arc::new(Shared {
            min_speech_chunks: AtomicUsize::new(config.chunks_for_ms(config.min_speech_ms)),
            silence_timeout_chunks: AtomicUsize::new(
                config.chunks_for_ms(config.silence_timeout_ms),
            ),
            language: Mutex::new(config.language.clone()),
            config,
            running: AtomicBool::new(true),
            listening_paused: AtomicBool::new(false),
            transcriptions_paused: AtomicBool::new(false),
            tts_interrupt_enabled: AtomicBool::new(true),
            profile: Mutex::new(VoiceMode::Stop),
            vad: Mutex::new(vad),
            stt: RwLock::new(stt),
            aec: Mutex::new(None),
            aec_enabled: AtomicBool::new(false),
            far_queue: Mutex::new(VecDeque::new()),
            far_history: Mutex::new(VecDeque::new()),
            callbacks,
            counters,
        });

        let (consumer, source_rate, capture) = match source {
            CaptureSource::Ring {
                consumer,
                sample_rate,
            } => (consumer, sample_rate, None),
            CaptureSource::Device(capture_config) => {
                let (producer, consumer) = AudioRingBuffer::new(RING_CAPACITY).split();
                let (thread, device_config) =
                    CaptureThread::spawn(capture_config, producer, shared.counters.clone())?;
                (consumer, device_config.sample_rate, Some(thread))
            }
        };

        let recognizer = Arc::new(Self {
            shared: shared.clone(),
            worker: Mutex::new(None),
            capture: Mutex::new(capture),
        });

        let handle = thread::Builder::new()
            .name("recognizer".to_string())
            .spawn(move || worker_loop(shared, consumer, source_rate))
            .map_err(|e| VoxloopError::Fatal(format!("failed to spawn recognizer: {e}")))?;
        *recognizer.worker.lock() = Some(handle);

        info!("Voice recognition started");
        Ok(recognizer)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Processing sample rate (VAD, STT and far-end alignment all run at
    /// this rate).
    pub fn sample_rate(&self) -> u32 {
        self.shared.config.sample_rate
    }

    /// Ask the worker to exit without waiting. Safe from any thread,
    /// including the worker's own callbacks.
    pub fn signal_stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    /// Stop the worker and release the capture device. Returns false when
    /// already stopped.
    pub fn stop(&self) -> bool {
        let was_running = self.shared.running.swap(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        if let Some(capture) = self.capture.lock().take() {
            capture.stop();
        }
        if was_running {
            info!("Voice recognition stopped");
        }
        was_running
    }

    /// Retune thresholds for the interaction mode.
    pub fn set_profile(&self, mode: VoiceMode) {
        let cfg = &self.shared.config;
        match mode {
            VoiceMode::Ptt => {
                // Capture must be eager: record from the first speech chunk
                // and close the turn quickly.
                self.shared.min_speech_chunks.store(1, Ordering::Relaxed);
                self.shared
                    .silence_timeout_chunks
                    .store(cfg.chunks_for_ms(700).max(8), Ordering::Relaxed);
                self.shared.transcriptions_paused.store(false, Ordering::SeqCst);
                self.shared.listening_paused.store(false, Ordering::SeqCst);
            }
            VoiceMode::Full => {
                self.shared
                    .min_speech_chunks
                    .store(cfg.chunks_for_ms(180).max(3), Ordering::Relaxed);
                self.shared
                    .silence_timeout_chunks
                    .store(cfg.chunks_for_ms(900).max(12), Ordering::Relaxed);
            }
            _ => {
                self.shared
                    .min_speech_chunks
                    .store(cfg.chunks_for_ms(cfg.min_speech_ms), Ordering::Relaxed);
                self.shared
                    .silence_timeout_chunks
                    .store(cfg.chunks_for_ms(cfg.silence_timeout_ms), Ordering::Relaxed);
            }
        }
        *self.shared.profile.lock() = mode;
        debug!(profile = mode.as_str(), "Listening profile applied");
    }

    /// Install or remove the echo canceller.
    pub fn set_aec(&self, processor: Option<Box<dyn AecProcessor>>) {
        match processor {
            Some(p) => {
                *self.shared.aec.lock() = Some(p);
                self.shared.aec_enabled.store(true, Ordering::SeqCst);
            }
            None => {
                self.shared.aec_enabled.store(false, Ordering::SeqCst);
                *self.shared.aec.lock() = None;
                self.shared.far_queue.lock().clear();
            }
        }
    }

    /// Feed rendered output audio back as the far-end reference. Always
    /// recorded for the echo gate; queued for AEC only when enabled.
    pub fn feed_far_end_audio(&self, samples: &[f32], sample_rate: u32) {
        if samples.is_empty() {
            return;
        }
        let target = self.shared.config.sample_rate;
        let mono = if sample_rate != target {
            linear_resample(samples, sample_rate, target)
        } else {
            samples.to_vec()
        };
        let pcm = f32_to_pcm16(&mono);

        {
            let mut history = self.shared.far_history.lock();
            history.extend(pcm.iter().copied());
            let cap = (target / ECHO_HISTORY_FACTOR) as usize;
            while history.len() > cap {
                history.pop_front();
            }
        }

        if self.shared.aec_enabled.load(Ordering::SeqCst) {
            let mut queue = self.shared.far_queue.lock();
            queue.extend(pcm);
            let cap = (target as usize) * 2;
            while queue.len() > cap {
                queue.pop_front();
            }
        }
    }

    pub fn set_vad_aggressiveness(&self, aggressiveness: u8) -> bool {
        self.shared
            .vad
            .lock()
            .set_aggressiveness(aggressiveness)
            .is_ok()
    }

    /// Swap the STT backend (e.g. a different model size).
    pub fn set_stt_adapter(&self, stt: Arc<dyn SttAdapter>) {
        *self.shared.stt.write() = stt;
    }

    pub fn set_language(&self, language: Option<String>) {
        *self.shared.language.lock() = language;
    }
}

impl RecognizerControl for Recognizer {
    fn pause_listening(&self) {
        self.shared.listening_paused.store(true, Ordering::SeqCst);
        debug!("Listening paused");
    }
    fn resume_listening(&self) {
        self.shared.listening_paused.store(false, Ordering::SeqCst);
        debug!("Listening resumed");
    }
    fn pause_transcriptions(&self) {
        self.shared.transcriptions_paused.store(true, Ordering::SeqCst);
        debug!("Transcriptions paused");
    }
    fn resume_transcriptions(&self) {
        self.shared.transcriptions_paused.store(false, Ordering::SeqCst);
        debug!("Transcriptions resumed");
    }
    fn pause_tts_interrupt(&self) {
        self.shared.tts_interrupt_enabled.store(false, Ordering::SeqCst);
        debug!("Barge-in paused");
    }
    fn resume_tts_interrupt(&self) {
        self.shared.tts_interrupt_enabled.store(true, Ordering::SeqCst);
        debug!("Barge-in resumed");
    }
    fn aec_enabled(&self) -> bool {
        self.shared.aec_enabled.load(Ordering::SeqCst)
    }
}

fn worker_loop(shared: Arc<Shared>, mut consumer: AudioConsumer, source_rate: u32) {
    let target_rate = shared.config.sample_rate;
    let chunk_out = shared.config.chunk_size();
    let source_chunk =
        ((source_rate as usize * shared.config.chunk_ms as usize) / 1000).max(1);

    let mut read_buf = vec![0i16; 4096];
    let mut source_pending: VecDeque<i16> = VecDeque::new();
    let mut chunk_pending: VecDeque<i16> = VecDeque::new();
    let mut core = RecognizerCore::new(shared.clone());

    while shared.running.load(Ordering::SeqCst) {
        if shared.listening_paused.load(Ordering::SeqCst) {
            // Keep the ring from overflowing while ignoring its contents.
            consumer.discard_all();
            source_pending.clear();
            chunk_pending.clear();
            thread::sleep(Duration::from_millis(100));
            continue;
        }

        let n = consumer.read(&mut read_buf);
        if n == 0 {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        source_pending.extend(&read_buf[..n]);

        while source_pending.len() >= source_chunk {
            let chunk: Vec<i16> = source_pending.drain(..source_chunk).collect();
            if source_rate != target_rate {
                chunk_pending.extend(linear_resample_i16(&chunk, source_rate, target_rate));
            } else {
                chunk_pending.extend(chunk);
            }
        }

        while chunk_pending.len() >= chunk_out {
            let chunk: Vec<i16> = chunk_pending.drain(..chunk_out).collect();
            core.process_chunk(&chunk);
        }
    }
}
