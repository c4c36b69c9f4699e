//! Callback-driven audio output.
//!
//! The cpal output stream is owned by a dedicated thread (cpal streams are
//! not `Send`); every other thread talks to it through a small command
//! channel. Producers only ever append to the queue; the render callback is
//! the sole consumer and the sole owner of the in-flight frame. A queue
//! flush bumps an epoch counter so the callback drops its in-flight frame
//! without anyone else touching callback state.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use voxloop_foundation::AudioError;
use voxloop_telemetry::PipelineCounters;

use crate::resampler::linear_resample;

/// Sample rates tried, in order, when the requested rate cannot be opened.
const FALLBACK_RATES: [u32; 5] = [48_000, 44_100, 24_000, 22_050, 16_000];
/// Block size hints tried for each candidate rate.
const BLOCK_SIZES: [u32; 2] = [1024, 0];

const ENSURE_TIMEOUT: Duration = Duration::from_secs(3);
/// Null-sink pump tick; one tick renders 10 ms of audio.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;
pub type ChunkHook = Arc<dyn Fn(&[f32], u32) + Send + Sync>;

/// Where rendered audio goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// A real cpal output device.
    Device,
    /// No device: a timed pump drains the queue at real-time rate. Used in
    /// headless environments and tests; everything above the sink behaves
    /// identically.
    Null,
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub mode: OutputMode,
    /// Preferred output device name; `None` selects the host default.
    pub device_name: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Device,
            device_name: None,
        }
    }
}

/// Lifecycle and chunk hooks, set once at wiring time.
#[derive(Default)]
pub struct PlayerHooks {
    on_audio_start: RwLock<Option<LifecycleHook>>,
    on_audio_end: RwLock<Option<LifecycleHook>>,
    on_audio_pause: RwLock<Option<LifecycleHook>>,
    on_audio_resume: RwLock<Option<LifecycleHook>>,
    on_audio_chunk: RwLock<Option<ChunkHook>>,
}

impl PlayerHooks {
    pub fn set_on_audio_start(&self, hook: LifecycleHook) {
        *self.on_audio_start.write() = Some(hook);
    }
    pub fn set_on_audio_end(&self, hook: LifecycleHook) {
        *self.on_audio_end.write() = Some(hook);
    }
    pub fn set_on_audio_pause(&self, hook: LifecycleHook) {
        *self.on_audio_pause.write() = Some(hook);
    }
    pub fn set_on_audio_resume(&self, hook: LifecycleHook) {
        *self.on_audio_resume.write() = Some(hook);
    }
    /// Receives exactly the mono chunk written to the sink, tick by tick.
    pub fn set_on_audio_chunk(&self, hook: ChunkHook) {
        *self.on_audio_chunk.write() = Some(hook);
    }
}

/// Spawn a short-lived notifier thread so hook work never runs on the
/// audio thread. Hook panics are contained.
fn notify(slot: &RwLock<Option<LifecycleHook>>) {
    if let Some(hook) = slot.read().clone() {
        thread::spawn(move || {
            if catch_unwind(AssertUnwindSafe(|| hook())).is_err() {
                warn!("Audio lifecycle hook panicked");
            }
        });
    }
}

struct Shared {
    queue: Mutex<VecDeque<Vec<f32>>>,
    paused: Mutex<bool>,
    is_playing: AtomicBool,
    audio_started: AtomicBool,
    /// Bumped on flush; the callback drops its in-flight frame when it sees
    /// a new epoch.
    epoch: AtomicU64,
    /// Rate the sink actually opened at; 0 while closed.
    opened_rate: AtomicU32,
    hooks: PlayerHooks,
    counters: PipelineCounters,
}

/// Callback-local state. Only the render path touches it.
#[derive(Default)]
struct RenderState {
    current: Option<Vec<f32>>,
    position: usize,
    epoch: u64,
}

/// Fill `out` (interleaved, `channels` wide) from the queue. This is the
/// body of the audio callback: no unbounded allocation, no blocking waits,
/// silence on any degenerate state.
fn render_into(shared: &Shared, state: &mut RenderState, out: &mut [f32], channels: usize) {
    out.fill(0.0);
    if channels == 0 {
        return;
    }

    let epoch = shared.epoch.load(Ordering::Acquire);
    if epoch != state.epoch {
        state.current = None;
        state.position = 0;
        state.epoch = epoch;
    }

    if *shared.paused.lock() {
        return;
    }

    let total_frames = out.len() / channels;
    let mut frame_idx = 0;
    let rate = shared.opened_rate.load(Ordering::Relaxed);

    while frame_idx < total_frames {
        let exhausted = state
            .current
            .as_ref()
            .map(|cur| state.position >= cur.len())
            .unwrap_or(true);
        if exhausted {
            match shared.queue.lock().pop_front() {
                Some(next) => {
                    state.current = Some(next);
                    state.position = 0;
                }
                None => {
                    state.current = None;
                    state.position = 0;
                    if shared.is_playing.swap(false, Ordering::SeqCst) {
                        shared.audio_started.store(false, Ordering::SeqCst);
                        notify(&shared.hooks.on_audio_end);
                    }
                    return;
                }
            }
        }

        let current = state.current.as_ref().unwrap();
        let n = (current.len() - state.position).min(total_frames - frame_idx);
        if n > 0 && !shared.audio_started.swap(true, Ordering::SeqCst) {
            notify(&shared.hooks.on_audio_start);
        }

        for i in 0..n {
            let sample = current[state.position + i];
            let base = (frame_idx + i) * channels;
            for ch in 0..channels {
                out[base + ch] = sample;
            }
        }

        // The chunk tap sees exactly what went to the sink. It runs inline
        // (the AEC far-end feed is a short lock) and must never break
        // rendering.
        if n > 0 {
            if let Some(hook) = shared.hooks.on_audio_chunk.read().clone() {
                let written = &current[state.position..state.position + n];
                if catch_unwind(AssertUnwindSafe(|| hook(written, rate))).is_err() {
                    warn!("Audio chunk hook panicked");
                }
            }
            shared.counters.incr_playback_chunks();
        }

        state.position += n;
        frame_idx += n;
    }
}

enum Command {
    EnsureSink {
        rate: u32,
        reply: Sender<Result<u32, AudioError>>,
    },
    CloseSink {
        reply: Sender<()>,
    },
    Shutdown,
}

/// Non-blocking audio player handle. Cheap to share; all methods may be
/// called from any thread.
pub struct AudioPlayer {
    shared: Arc<Shared>,
    cmd_tx: Sender<Command>,
    owner: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self::with_counters(config, PipelineCounters::new())
    }

    pub fn with_counters(config: PlayerConfig, counters: PipelineCounters) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            paused: Mutex::new(false),
            is_playing: AtomicBool::new(false),
            audio_started: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            opened_rate: AtomicU32::new(0),
            hooks: PlayerHooks::default(),
            counters,
        });

        let (cmd_tx, cmd_rx) = bounded::<Command>(8);
        let owner_shared = shared.clone();
        let owner = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || sink_owner_loop(config, owner_shared, cmd_rx))
            .expect("spawn audio output thread");

        Self {
            shared,
            cmd_tx,
            owner: Mutex::new(Some(owner)),
        }
    }

    pub fn hooks(&self) -> &PlayerHooks {
        &self.shared.hooks
    }

    /// Rate the sink is currently open at, if any.
    pub fn opened_rate(&self) -> Option<u32> {
        match self.shared.opened_rate.load(Ordering::Relaxed) {
            0 => None,
            r => Some(r),
        }
    }

    /// Make sure a sink is open, preferring `rate`. Returns the rate the
    /// sink actually runs at; an already-open sink is left untouched and
    /// per-enqueue resampling covers the difference.
    pub fn ensure_sink(&self, rate: u32) -> Result<u32, AudioError> {
        if let Some(open) = self.opened_rate() {
            return Ok(open);
        }
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send(Command::EnsureSink {
                rate,
                reply: reply_tx,
            })
            .map_err(|_| AudioError::StreamOwnerGone)?;
        reply_rx
            .recv_timeout(ENSURE_TIMEOUT)
            .map_err(|_| AudioError::StreamOwnerGone)?
    }

    /// Enqueue one mono frame for playback. Opens the sink on first use;
    /// resamples when `sample_rate` differs from the opened rate;
    /// normalizes by peak when the frame clips.
    pub fn play_audio(&self, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
        if samples.is_empty() {
            return Ok(());
        }

        let opened = self.ensure_sink(sample_rate)?;
        let mut frame: Vec<f32> = if sample_rate != opened {
            linear_resample(samples, sample_rate, opened)
        } else {
            samples.to_vec()
        };

        let peak = frame.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        if peak > 1.0 {
            for s in &mut frame {
                *s /= peak;
            }
        }

        self.shared.queue.lock().push_back(frame);
        self.shared.is_playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Start a fresh playback session at a declared rate: the next rendered
    /// chunk counts as the session's first audio again.
    pub fn begin_session(&self, sample_rate: u32) -> Result<u32, AudioError> {
        self.shared.audio_started.store(false, Ordering::SeqCst);
        self.ensure_sink(sample_rate)
    }

    pub fn pause(&self) -> bool {
        let mut paused = self.shared.paused.lock();
        if self.shared.is_playing.load(Ordering::SeqCst) && !*paused {
            *paused = true;
            notify(&self.shared.hooks.on_audio_pause);
            true
        } else {
            false
        }
    }

    pub fn resume(&self) -> bool {
        let mut paused = self.shared.paused.lock();
        if *paused {
            *paused = false;
            notify(&self.shared.hooks.on_audio_resume);
            true
        } else {
            false
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.paused.lock()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing.load(Ordering::SeqCst)
    }

    /// Discard queued and in-flight audio and reset playback flags. The
    /// sink stays open (`stop_sink` closes it).
    pub fn flush(&self) {
        self.shared.queue.lock().clear();
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        self.shared.is_playing.store(false, Ordering::SeqCst);
        self.shared.audio_started.store(false, Ordering::SeqCst);
        *self.shared.paused.lock() = false;
    }

    /// Flush and close the sink. Safe to call when nothing is open.
    pub fn stop_sink(&self) {
        self.flush();
        let (reply_tx, reply_rx) = bounded(1);
        if self
            .cmd_tx
            .send(Command::CloseSink { reply: reply_tx })
            .is_ok()
        {
            let _ = reply_rx.recv_timeout(ENSURE_TIMEOUT);
        }
    }

    pub fn cleanup(&self) {
        self.stop_sink();
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(handle) = self.owner.lock().take() {
            let _ = handle.join();
        }
    }
}

/// State held by the sink-owner thread.
enum Sink {
    Closed,
    Device {
        _stream: cpal::Stream,
        rate: u32,
    },
    /// Headless: the owner loop pumps the render path itself.
    Null {
        rate: u32,
        channels: usize,
        state: RenderState,
        scratch: Vec<f32>,
    },
}

fn sink_owner_loop(config: PlayerConfig, shared: Arc<Shared>, cmd_rx: Receiver<Command>) {
    let mut sink = Sink::Closed;

    loop {
        let cmd = match cmd_rx.recv_timeout(PUMP_INTERVAL) {
            Ok(cmd) => Some(cmd),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        match cmd {
            Some(Command::EnsureSink { rate, reply }) => {
                let already_open = match &sink {
                    Sink::Device { rate, .. } | Sink::Null { rate, .. } => Some(*rate),
                    Sink::Closed => None,
                };
                let result = if let Some(open_rate) = already_open {
                    Ok(open_rate)
                } else {
                    match config.mode {
                        OutputMode::Null => {
                            let channels = 1;
                            let scratch = vec![0.0f32; (rate as usize / 100).max(1) * channels];
                            shared.opened_rate.store(rate, Ordering::Relaxed);
                            sink = Sink::Null {
                                rate,
                                channels,
                                state: RenderState::default(),
                                scratch,
                            };
                            debug!(rate, "Opened null audio sink");
                            Ok(rate)
                        }
                        OutputMode::Device => match open_device_stream(&config, &shared, rate) {
                            Ok((stream, opened)) => {
                                shared.opened_rate.store(opened, Ordering::Relaxed);
                                sink = Sink::Device {
                                    _stream: stream,
                                    rate: opened,
                                };
                                Ok(opened)
                            }
                            Err(e) => Err(e),
                        },
                    }
                };
                let _ = reply.send(result);
            }
            Some(Command::CloseSink { reply }) => {
                sink = Sink::Closed;
                shared.opened_rate.store(0, Ordering::Relaxed);
                let _ = reply.send(());
            }
            Some(Command::Shutdown) => break,
            None => {
                // Pump tick: only the null sink renders here.
                if let Sink::Null {
                    channels,
                    state,
                    scratch,
                    ..
                } = &mut sink
                {
                    render_into(&shared, state, scratch, *channels);
                }
            }
        }
    }

    shared.opened_rate.store(0, Ordering::Relaxed);
}

/// Open a cpal output stream, walking the fallback ladder:
/// requested rate, device default, then the common rates, each with block
/// size hints 1024 and default, mono first then stereo.
fn open_device_stream(
    config: &PlayerConfig,
    shared: &Arc<Shared>,
    requested: u32,
) -> Result<(cpal::Stream, u32), AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let (device, default_rate) = crate::quiet_probe(|| -> Result<_, AudioError> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| AudioError::Fatal(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or(AudioError::NoOutputDevice)?,
            None => host
                .default_output_device()
                .ok_or(AudioError::NoOutputDevice)?,
        };
        let default_rate = device
            .default_output_config()
            .map(|c| c.sample_rate())
            .ok();
        Ok((device, default_rate))
    })?;

    let mut rates: Vec<u32> = Vec::with_capacity(2 + FALLBACK_RATES.len());
    rates.push(requested);
    if let Some(d) = default_rate {
        rates.push(d);
    }
    rates.extend_from_slice(&FALLBACK_RATES);
    rates.dedup();

    let mut attempts = 0usize;
    for &rate in &rates {
        for &block in &BLOCK_SIZES {
            for channels in [1u16, 2u16] {
                attempts += 1;
                let stream_config = cpal::StreamConfig {
                    channels,
                    sample_rate: rate,
                    buffer_size: if block == 0 {
                        cpal::BufferSize::Default
                    } else {
                        cpal::BufferSize::Fixed(block)
                    },
                };

                let cb_shared = shared.clone();
                let ch = channels as usize;
                let mut state = RenderState::default();
                let built = device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        render_into(&cb_shared, &mut state, data, ch);
                    },
                    |err| warn!("Output stream error: {err}"),
                    None,
                );

                match built {
                    Ok(stream) => match stream.play() {
                        Ok(()) => {
                            info!(
                                rate,
                                channels, block, "Opened output stream"
                            );
                            return Ok((stream, rate));
                        }
                        Err(e) => {
                            debug!(rate, channels, block, error = %e, "Stream refused to play");
                        }
                    },
                    Err(e) => {
                        debug!(rate, channels, block, error = %e, "Output config rejected");
                    }
                }
            }
        }
    }

    Err(AudioError::NoUsableConfig { attempts })
}
