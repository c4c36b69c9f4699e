//! Microphone capture on a dedicated thread.
//!
//! The cpal input stream is `!Send`, so one thread owns it for its whole
//! life and always closes it before returning. The stream callback
//! converts whatever the device delivers to mono PCM16 and writes it into
//! the lock-free ring; the recognition worker reads from the other end and
//! resamples to its processing rate.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use voxloop_foundation::AudioError;
use voxloop_telemetry::PipelineCounters;

use crate::ring_buffer::AudioProducer;

const SPAWN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Preferred capture rate; the device default is used when refused.
    pub sample_rate: u32,
    /// Preferred input device name; `None` selects the host default.
    pub device_name: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            device_name: None,
        }
    }
}

/// What the device actually opened at. The ring always carries mono PCM16
/// at this rate (multi-channel input is downmixed in the callback).
#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to the capture thread.
pub struct CaptureThread {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl CaptureThread {
    /// Spawn the capture thread and wait for the device to open.
    pub fn spawn(
        config: CaptureConfig,
        producer: AudioProducer,
        counters: PipelineCounters,
    ) -> Result<(Self, DeviceConfig), AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();
        let (cfg_tx, cfg_rx) = bounded::<Result<DeviceConfig, String>>(1);

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                // The producer is shared with whichever stream callback ends
                // up being built; the lock is held only for the ring write.
                let producer = Arc::new(parking_lot::Mutex::new(producer));
                let opened = open_input_stream(&config, &worker_running, &counters, &producer);
                match opened {
                    Ok((stream, dev_cfg)) => {
                        let _ = cfg_tx.send(Ok(dev_cfg));
                        while worker_running.load(Ordering::SeqCst) {
                            thread::sleep(Duration::from_millis(100));
                        }
                        // Close the device before the thread returns.
                        drop(stream);
                        info!("Capture thread shut down");
                    }
                    Err(e) => {
                        let _ = cfg_tx.send(Err(e.to_string()));
                    }
                }
            })
            .map_err(|e| AudioError::Fatal(format!("failed to spawn capture thread: {e}")))?;

        match cfg_rx.recv_timeout(SPAWN_TIMEOUT) {
            Ok(Ok(dev_cfg)) => Ok((Self { handle, running }, dev_cfg)),
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(AudioError::Fatal(msg))
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(AudioError::Fatal("capture device did not open in time".into()))
            }
        }
    }

    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

fn open_input_stream(
    config: &CaptureConfig,
    running: &Arc<AtomicBool>,
    counters: &PipelineCounters,
    producer: &Arc<parking_lot::Mutex<AudioProducer>>,
) -> Result<(cpal::Stream, DeviceConfig), AudioError> {
    let (device, default) = crate::quiet_probe(|| -> Result<_, AudioError> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| AudioError::Fatal(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::InputDeviceNotFound {
                    name: Some(name.clone()),
                })?,
            None => host
                .default_input_device()
                .ok_or(AudioError::InputDeviceNotFound { name: None })?,
        };
        let default =
            device
                .default_input_config()
                .map_err(|e| AudioError::FormatNotSupported {
                    format: e.to_string(),
                })?;
        Ok((device, default))
    })?;
    if let Ok(name) = device.name() {
        info!(device = %name, "Selected input device");
    }

    // Preference order: the requested rate in the device's native format,
    // then whatever the device offers by default.
    let candidates = [
        StreamConfig {
            channels: default.channels(),
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        },
        StreamConfig {
            channels: default.channels(),
            sample_rate: default.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        },
    ];

    let mut last_err: Option<AudioError> = None;
    for stream_config in candidates {
        match build_input_stream(
            &device,
            &stream_config,
            default.sample_format(),
            running,
            counters,
            producer,
        ) {
            Ok(stream) => {
                stream.play()?;
                let dev_cfg = DeviceConfig {
                    sample_rate: stream_config.sample_rate,
                    channels: stream_config.channels,
                };
                info!(
                    rate = dev_cfg.sample_rate,
                    channels = dev_cfg.channels,
                    "Opened input stream"
                );
                return Ok((stream, dev_cfg));
            }
            Err(e) => {
                debug!(rate = stream_config.sample_rate, error = %e, "Input config rejected");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(AudioError::NoUsableConfig { attempts: 2 }))
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    running: &Arc<AtomicBool>,
    counters: &PipelineCounters,
    producer: &Arc<parking_lot::Mutex<AudioProducer>>,
) -> Result<cpal::Stream, AudioError> {
    let channels = config.channels as usize;
    let running = running.clone();
    let counters = counters.clone();
    let producer = producer.clone();
    let err_fn = |err: cpal::StreamError| warn!("Input stream error: {err}");

    // Mono downmix + PCM16 conversion with callback-owned scratch storage.
    let ingest = move |mono: &[i16]| {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        if producer.lock().write(mono).is_ok() {
            counters.incr_capture_frames();
        } else {
            counters.incr_capture_dropped();
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    downmix_i16(data, channels, &mut scratch);
                    ingest(&scratch);
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::F32 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.reserve(data.len() / channels);
                    for frame in data.chunks_exact(channels) {
                        let avg = frame.iter().sum::<f32>() / channels as f32;
                        scratch.push((avg.clamp(-1.0, 1.0) * 32767.0).round() as i16);
                    }
                    ingest(&scratch);
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let mut scratch: Vec<i16> = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.reserve(data.len() / channels);
                    for frame in data.chunks_exact(channels) {
                        let sum: i32 = frame.iter().map(|&s| s as i32 - 32768).sum();
                        scratch.push((sum / channels as i32) as i16);
                    }
                    ingest(&scratch);
                },
                err_fn,
                None,
            )?
        }
        other => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{other:?}"),
            });
        }
    };

    Ok(stream)
}

fn downmix_i16(data: &[i16], channels: usize, out: &mut Vec<i16>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    out.reserve(data.len() / channels);
    for frame in data.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        out.push((sum / channels as i32) as i16);
    }
}
