//! Cloned-voice synthesis orchestration.
//!
//! One worker per utterance. Every utterance gets a brand-new cancel
//! token; the worker only ever reads the token it captured at start, so a
//! newer `speak` can never resurrect an older worker by clearing state.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use voxloop_audio::player::LifecycleHook;
use voxloop_audio::resampler::linear_resample;
use voxloop_audio::AudioBuffer;
use voxloop_clone::{CloneEngine, CloneRequest};
use voxloop_foundation::CancelToken;
use voxloop_telemetry::{MetricsSlot, VoiceMetrics};

use crate::playback::PlaybackFacade;

/// Streaming sessions play at this rate; chunks at other rates are
/// resampled on the way in.
const STREAM_TARGET_RATE: u32 = 24_000;

pub struct CloneOrchestrator {
    engine: Arc<dyn CloneEngine>,
    playback: Arc<PlaybackFacade>,
    metrics: MetricsSlot,
    current_cancel: Mutex<Option<CancelToken>>,
    synthesis_active: Arc<AtomicBool>,
    streaming: AtomicBool,
}

/// Everything one utterance worker needs, captured at spawn.
struct CloneJob {
    request: CloneRequest,
    voice_id: String,
    cancel: CancelToken,
    streaming: bool,
    callback: Option<LifecycleHook>,
}

impl CloneOrchestrator {
    pub fn new(
        engine: Arc<dyn CloneEngine>,
        playback: Arc<PlaybackFacade>,
        metrics: MetricsSlot,
        streaming: bool,
    ) -> Self {
        Self {
            engine,
            playback,
            metrics,
            current_cancel: Mutex::new(None),
            synthesis_active: Arc::new(AtomicBool::new(false)),
            streaming: AtomicBool::new(streaming),
        }
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::SeqCst);
    }

    pub fn is_synthesizing(&self) -> bool {
        self.synthesis_active.load(Ordering::SeqCst)
    }

    /// Signal the in-flight utterance, if any, to stop.
    pub fn cancel_current(&self) {
        if let Some(token) = self.current_cancel.lock().as_ref() {
            token.cancel();
        }
    }

    /// Synchronous render to WAV bytes, bypassing playback entirely.
    pub fn render_to_wav_bytes(
        &self,
        request: &CloneRequest,
    ) -> Result<Vec<u8>, voxloop_foundation::CloneError> {
        self.engine.infer_to_wav_bytes(request)
    }

    /// Start synthesizing one utterance. The caller has already stopped
    /// current playback; this cancels the previous worker, allocates a
    /// fresh token, and returns as soon as the worker is spawned.
    pub fn speak(
        &self,
        request: CloneRequest,
        voice_id: &str,
        callback: Option<LifecycleHook>,
    ) -> Result<(), voxloop_foundation::CloneError> {
        if !self.engine.is_available() {
            return Err(voxloop_foundation::CloneError::NotAvailable {
                reason: "clone engine unavailable".into(),
            });
        }

        self.metrics.clear();

        // Per-utterance token: signal the old one, then replace it. The
        // old worker keeps its own clone and sees only the signal.
        let cancel = CancelToken::new();
        {
            let mut slot = self.current_cancel.lock();
            if let Some(old) = slot.replace(cancel.clone()) {
                old.cancel();
            }
        }

        let job = CloneJob {
            request,
            voice_id: voice_id.to_string(),
            cancel,
            streaming: self.streaming.load(Ordering::SeqCst),
            callback,
        };

        let engine = self.engine.clone();
        let playback = self.playback.clone();
        let metrics = self.metrics.clone();
        let active = self.synthesis_active.clone();

        thread::Builder::new()
            .name("clone-synthesis".to_string())
            .spawn(move || {
                active.store(true, Ordering::SeqCst);
                run_clone_job(&*engine, &playback, &metrics, job);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                voxloop_foundation::CloneError::SynthesisFailed(format!("spawn failed: {e}"))
            })?;

        Ok(())
    }
}

fn run_clone_job(
    engine: &dyn CloneEngine,
    playback: &PlaybackFacade,
    metrics: &MetricsSlot,
    job: CloneJob,
) {
    let result = if job.streaming {
        run_streaming(engine, playback, metrics, &job)
    } else {
        run_buffered(engine, playback, metrics, &job)
    };

    if let Err(message) = result {
        warn!(voice = %job.voice_id, error = %message, "Cloned synthesis failed");
        metrics.set(VoiceMetrics::error("clone", Some(&job.voice_id), message));
    }
}

/// Render the whole utterance, then hand it to playback in one piece.
fn run_buffered(
    engine: &dyn CloneEngine,
    playback: &PlaybackFacade,
    metrics: &MetricsSlot,
    job: &CloneJob,
) -> Result<(), String> {
    let t0 = Instant::now();
    let wav = engine
        .infer_to_wav_bytes(&job.request)
        .map_err(|e| e.to_string())?;
    let synth_s = t0.elapsed().as_secs_f64();
    if job.cancel.is_cancelled() {
        debug!(voice = %job.voice_id, "Cancelled before decode");
        return Ok(());
    }

    let audio = voxloop_audio::wav::decode_wav_to_mono(&wav).map_err(|e| e.to_string())?;
    let audio_s = audio.duration_secs();
    metrics.set(VoiceMetrics {
        engine: "clone".into(),
        voice_id: Some(job.voice_id.clone()),
        streaming: Some(false),
        synth_s,
        audio_s,
        rtf: (audio_s > 0.0).then(|| synth_s / audio_s),
        sample_rate: Some(audio.sample_rate),
        audio_samples: audio.samples.len() as u64,
        speed: job.request.speed,
        ts: VoiceMetrics::now_ts(),
        ..Default::default()
    });

    playback
        .begin_playback(job.callback.clone(), audio.sample_rate)
        .map_err(|e| e.to_string())?;
    if job.cancel.is_cancelled() {
        debug!(voice = %job.voice_id, "Cancelled before enqueue");
        return Ok(());
    }
    playback.enqueue_audio(&audio).map_err(|e| e.to_string())?;
    Ok(())
}

/// Pipe chunks from the engine into an open playback session, checking
/// the captured cancel token between every chunk.
fn run_streaming(
    engine: &dyn CloneEngine,
    playback: &PlaybackFacade,
    metrics: &MetricsSlot,
    job: &CloneJob,
) -> Result<(), String> {
    let t0 = Instant::now();
    let chunks = engine.infer_chunks(&job.request).map_err(|e| e.to_string())?;

    playback
        .begin_playback(job.callback.clone(), STREAM_TARGET_RATE)
        .map_err(|e| e.to_string())?;

    let mut first_chunk: Option<Instant> = None;
    let mut total_samples: u64 = 0;
    let mut chunk_count: u32 = 0;

    for chunk in chunks {
        if job.cancel.is_cancelled() {
            info!(voice = %job.voice_id, "Cloned synthesis cancelled mid-stream");
            break;
        }
        let chunk = chunk.map_err(|e| e.to_string())?;
        if first_chunk.is_none() {
            first_chunk = Some(Instant::now());
        }

        let samples = if chunk.sample_rate != STREAM_TARGET_RATE {
            linear_resample(&chunk.samples, chunk.sample_rate, STREAM_TARGET_RATE)
        } else {
            chunk.samples
        };
        total_samples += samples.len() as u64;
        chunk_count += 1;

        playback
            .enqueue_audio(&AudioBuffer::new(samples, STREAM_TARGET_RATE))
            .map_err(|e| e.to_string())?;
    }

    let synth_s = t0.elapsed().as_secs_f64();
    let audio_s = total_samples as f64 / STREAM_TARGET_RATE as f64;
    metrics.set(VoiceMetrics {
        engine: "clone".into(),
        voice_id: Some(job.voice_id.clone()),
        streaming: Some(true),
        cancelled: Some(job.cancel.is_cancelled()),
        synth_s,
        ttfb_s: first_chunk.map(|t| t.duration_since(t0).as_secs_f64()),
        audio_s,
        rtf: (audio_s > 0.0).then(|| synth_s / audio_s),
        sample_rate: Some(STREAM_TARGET_RATE),
        audio_samples: total_samples,
        chunks: Some(chunk_count),
        speed: job.request.speed,
        ts: VoiceMetrics::now_ts(),
        ..Default::default()
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use voxloop_audio::{OutputMode, PlayerConfig};
    use voxloop_clone::MockCloneEngine;

    fn setup(streaming: bool) -> (CloneOrchestrator, Arc<MockCloneEngine>, MetricsSlot) {
        let metrics = MetricsSlot::new();
        let playback = PlaybackFacade::new(
            None,
            PlayerConfig {
                mode: OutputMode::Null,
                device_name: None,
            },
            metrics.clone(),
        );
        let engine = Arc::new(MockCloneEngine::new(24_000));
        let orchestrator =
            CloneOrchestrator::new(engine.clone(), playback, metrics.clone(), streaming);
        (orchestrator, engine, metrics)
    }

    fn request(text: &str) -> CloneRequest {
        CloneRequest::new(text, vec![PathBuf::from("ref.wav")])
    }

    fn wait_idle(orchestrator: &CloneOrchestrator) {
        let start = Instant::now();
        while orchestrator.is_synthesizing() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn streaming_run_records_ttfb_and_chunk_count() {
        let (orchestrator, _engine, metrics) = setup(true);
        orchestrator
            .speak(request("One. Two. Three."), "v1", None)
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        wait_idle(&orchestrator);

        let m = metrics.pop().expect("metrics written");
        assert_eq!(m.engine, "clone");
        assert_eq!(m.streaming, Some(true));
        assert_eq!(m.cancelled, Some(false));
        assert!(m.ttfb_s.is_some());
        assert_eq!(m.chunks, Some(1));
        assert_eq!(m.sample_rate, Some(STREAM_TARGET_RATE));
        assert!(m.audio_samples > 0);
    }

    #[test]
    fn buffered_run_decodes_and_enqueues_once() {
        let (orchestrator, _engine, metrics) = setup(false);
        orchestrator
            .speak(request("Hello world."), "v2", None)
            .unwrap();
        wait_idle(&orchestrator);

        let m = metrics.pop().expect("metrics written");
        assert_eq!(m.streaming, Some(false));
        assert_eq!(m.sample_rate, Some(24_000));
        assert!(m.audio_samples > 0);
    }

    #[test]
    fn second_speak_cancels_the_first_worker() {
        let (orchestrator, engine, metrics) = setup(true);
        engine.set_chunk_delay(Duration::from_millis(20));

        let mut req = request(
            "Sentence one. Sentence two. Sentence three. Sentence four. \
             Sentence five. Sentence six. Sentence seven. Sentence eight.",
        );
        req.max_chars = 16;
        orchestrator.speak(req, "v1", None).unwrap();
        thread::sleep(Duration::from_millis(30));

        let mut second = request("Short.");
        second.max_chars = 16;
        orchestrator.speak(second, "v1", None).unwrap();
        wait_idle(&orchestrator);

        let produced_after = engine.chunks_produced();
        thread::sleep(Duration::from_millis(80));
        // The first worker stopped pulling chunks shortly after the
        // takeover; allow one in-flight chunk of slack.
        assert!(engine.chunks_produced() <= produced_after + 1);
        let _ = metrics.pop();
    }

    #[test]
    fn tokens_are_fresh_per_utterance() {
        let (orchestrator, _engine, _metrics) = setup(true);
        orchestrator.speak(request("first"), "v1", None).unwrap();
        let first = orchestrator.current_cancel.lock().clone().unwrap();
        orchestrator.speak(request("second"), "v1", None).unwrap();
        let second = orchestrator.current_cancel.lock().clone().unwrap();

        assert!(!first.same_token(&second));
        assert!(first.is_cancelled(), "old token was signalled");
        assert!(!second.is_cancelled(), "new token starts clean");
        wait_idle(&orchestrator);
    }

    #[test]
    fn engine_failure_lands_in_metrics_not_panics() {
        struct FailingEngine;
        impl CloneEngine for FailingEngine {
            fn infer_to_wav_bytes(
                &self,
                _request: &CloneRequest,
            ) -> Result<Vec<u8>, voxloop_foundation::CloneError> {
                Err(voxloop_foundation::CloneError::SynthesisFailed(
                    "model exploded".into(),
                ))
            }
            fn infer_chunks(
                &self,
                _request: &CloneRequest,
            ) -> Result<voxloop_clone::engine::ChunkStream, voxloop_foundation::CloneError> {
                Err(voxloop_foundation::CloneError::SynthesisFailed(
                    "model exploded".into(),
                ))
            }
            fn is_available(&self) -> bool {
                true
            }
        }

        let metrics = MetricsSlot::new();
        let playback = PlaybackFacade::new(
            None,
            PlayerConfig {
                mode: OutputMode::Null,
                device_name: None,
            },
            metrics.clone(),
        );
        let orchestrator =
            CloneOrchestrator::new(Arc::new(FailingEngine), playback, metrics.clone(), true);

        orchestrator.speak(request("hello"), "v9", None).unwrap();
        wait_idle(&orchestrator);

        let m = metrics.pop().expect("error recorded");
        assert_eq!(m.engine, "clone");
        assert!(m.error.as_deref().unwrap_or("").contains("model exploded"));
    }

    #[test]
    fn unavailable_engine_is_rejected_synchronously() {
        let (orchestrator, engine, _metrics) = setup(true);
        engine.set_available(false);
        assert!(orchestrator.speak(request("hello"), "v9", None).is_err());
    }

    #[test]
    fn cancel_current_is_safe_when_idle() {
        let (orchestrator, _, _) = setup(true);
        orchestrator.cancel_current();
        assert!(!orchestrator.is_synthesizing());
    }
}
