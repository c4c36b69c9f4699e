//! End-to-end tests over the public façade: mock adapters, the null
//! output sink and a ring-fed capture source. No audio hardware needed.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use voxloop::{
    CaptureSource, CloneVoice, OutputMode, PlayerConfig, SpeakOptions, VoiceManager, VoiceMode,
    VoiceRuntimeConfig,
};
use voxloop_audio::ring_buffer::{AudioProducer, AudioRingBuffer};
use voxloop_clone::MockCloneEngine;
use voxloop_stt::MockSttAdapter;
use voxloop_tts::MockTtsAdapter;
use voxloop_vad::{EnergyVad, VadConfig, VadEngine};

/// Opt-in test logging: `RUST_LOG=voxloop=debug cargo test -- --nocapture`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    manager: VoiceManager,
    tts: Arc<MockTtsAdapter>,
    stt: Arc<MockSttAdapter>,
    producer: AudioProducer,
}

fn fixture(config: VoiceRuntimeConfig) -> Fixture {
    init_logging();
    let tts = Arc::new(MockTtsAdapter::new(16_000));
    let stt = Arc::new(MockSttAdapter::fixed("hello runtime"));
    let (producer, consumer) = AudioRingBuffer::new(1 << 17).split();

    let manager = VoiceManager::builder(config)
        .with_tts_adapter(tts.clone())
        .with_stt_adapter(stt.clone())
        .with_player_config(PlayerConfig {
            mode: OutputMode::Null,
            device_name: None,
        })
        .with_vad_factory(Box::new(|cfg| {
            Ok(Box::new(EnergyVad::new(cfg)?) as Box<dyn VadEngine>)
        }))
        .with_capture_source(CaptureSource::Ring {
            consumer,
            sample_rate: 16_000,
        })
        .build();

    Fixture {
        manager,
        tts,
        stt,
        producer,
    }
}

fn wait_until(ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(ms) {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// Push `ms` milliseconds of audio into the fake microphone.
fn push_audio(producer: &mut AudioProducer, ms: u32, amplitude: i16) {
    let total = (16_000 * ms as usize) / 1000;
    let samples: Vec<i16> = (0..total)
        .map(|i| ((i as f32 * 0.7).sin() * amplitude as f32) as i16)
        .collect();
    for chunk in samples.chunks(2048) {
        // The worker drains continuously; retry briefly on a full ring.
        for _ in 0..50 {
            if producer.write(chunk).is_ok() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn push_utterance(producer: &mut AudioProducer) {
    push_audio(producer, 800, 12_000); // speech
    push_audio(producer, 1_700, 0); // trailing silence
}

#[test]
fn listen_transcribes_an_utterance_from_the_ring() {
    let mut fx = fixture(VoiceRuntimeConfig::default());
    let transcripts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = transcripts.clone();

    assert!(fx
        .manager
        .listen(Arc::new(move |t| sink.lock().push(t)), None)
        .unwrap());
    assert!(fx.manager.is_listening());

    push_utterance(&mut fx.producer);

    assert!(wait_until(5_000, || !transcripts.lock().is_empty()));
    assert_eq!(transcripts.lock().clone(), vec!["hello runtime"]);

    assert!(fx.manager.stop_listening());
    assert!(!fx.manager.is_listening());
    assert!(!fx.manager.stop_listening(), "second stop is a no-op");
}

#[test]
fn listen_twice_reports_already_running() {
    let fx = fixture(VoiceRuntimeConfig::default());
    assert!(fx.manager.listen(Arc::new(|_| {}), None).unwrap());
    assert!(!fx.manager.listen(Arc::new(|_| {}), None).unwrap());
    fx.manager.stop_listening();
}

#[test]
fn wait_mode_discards_speech_during_playback_and_stop_restores_listening() {
    let mut fx = fixture(VoiceRuntimeConfig::default());
    assert_eq!(fx.manager.voice_mode(), VoiceMode::Wait);

    let transcripts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = transcripts.clone();
    fx.manager
        .listen(Arc::new(move |t| sink.lock().push(t)), None)
        .unwrap();

    // ~4.8 s of synthesized audio keeps playback busy well past the test.
    let long_text = "word ".repeat(60);
    fx.manager.speak(&long_text).unwrap();
    assert!(wait_until(3_000, || fx.manager.is_speaking()));
    // Give the pause routing a moment to land on the recognizer.
    thread::sleep(Duration::from_millis(200));

    // Speech while paused must be ignored entirely.
    push_utterance(&mut fx.producer);
    thread::sleep(Duration::from_millis(500));
    assert_eq!(fx.stt.call_count(), 0, "paused listening must not transcribe");
    assert!(transcripts.lock().is_empty());

    // An abrupt stop skips the natural drain; the manager must still
    // restore listening for WAIT mode.
    assert!(fx.manager.stop_speaking());
    assert!(!fx.manager.is_speaking());

    push_utterance(&mut fx.producer);
    assert!(wait_until(5_000, || !transcripts.lock().is_empty()));
    assert_eq!(transcripts.lock().clone(), vec!["hello runtime"]);

    fx.manager.stop_listening();
}

#[test]
fn speak_records_metrics_and_callback_fires_on_drain() {
    let fx = fixture(VoiceRuntimeConfig::default());
    let done = Arc::new(AtomicUsize::new(0));
    let done_clone = done.clone();

    fx.manager
        .speak_with(
            "short",
            SpeakOptions {
                callback: Some(Arc::new(move || {
                    done_clone.fetch_add(1, Ordering::SeqCst);
                })),
                ..Default::default()
            },
        )
        .unwrap();

    assert!(wait_until(5_000, || done.load(Ordering::SeqCst) == 1));
    let metrics = fx.manager.pop_last_tts_metrics().expect("metrics");
    assert_eq!(metrics.engine, "tts");
    assert_eq!(metrics.sample_rate, Some(16_000));
    assert!(fx.manager.pop_last_tts_metrics().is_none());
    assert_eq!(fx.tts.synthesized(), vec!["short"]);
}

#[test]
fn cloned_speech_streams_and_a_new_utterance_cancels_the_old_one() {
    let tts = Arc::new(MockTtsAdapter::new(16_000));
    let clone_engine = Arc::new(MockCloneEngine::new(24_000));
    clone_engine.set_chunk_delay(Duration::from_millis(15));

    let manager = VoiceManager::builder(VoiceRuntimeConfig::default())
        .with_tts_adapter(tts)
        .with_clone_engine(clone_engine.clone())
        .with_player_config(PlayerConfig {
            mode: OutputMode::Null,
            device_name: None,
        })
        .build();

    manager.register_cloned_voice(CloneVoice {
        id: "narrator".into(),
        name: None,
        reference_paths: vec!["narrator.wav".into()],
        reference_text: Some("reference transcript".into()),
    });

    // Long enough to split into several streaming batches, so the second
    // utterance arrives while the first is still mid-stream.
    let many_sentences =
        "The quick brown fox jumps over the lazy dog near the river bank today. ".repeat(20);
    manager
        .speak_with(
            &many_sentences,
            SpeakOptions {
                voice: Some("narrator".into()),
                ..Default::default()
            },
        )
        .unwrap();
    thread::sleep(Duration::from_millis(40));

    manager
        .speak_with(
            "Replacement.",
            SpeakOptions {
                voice: Some("narrator".into()),
                ..Default::default()
            },
        )
        .unwrap();

    assert!(wait_until(5_000, || !manager.is_speaking()));
    let produced = clone_engine.chunks_produced();
    thread::sleep(Duration::from_millis(100));
    assert!(
        clone_engine.chunks_produced() <= produced + 1,
        "cancelled worker kept producing"
    );

    let metrics = manager.pop_last_tts_metrics().expect("metrics");
    assert_eq!(metrics.engine, "clone");
    assert_eq!(metrics.streaming, Some(true));
}

#[test]
fn speaking_an_unregistered_voice_fails() {
    let manager = VoiceManager::builder(VoiceRuntimeConfig::default())
        .with_clone_engine(Arc::new(MockCloneEngine::default()))
        .with_player_config(PlayerConfig {
            mode: OutputMode::Null,
            device_name: None,
        })
        .build();

    let err = manager
        .speak_with(
            "hello",
            SpeakOptions {
                voice: Some("ghost".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn transcribe_helpers_route_through_the_stt_adapter() {
    let fx = fixture(VoiceRuntimeConfig::default());
    let text = fx.manager.transcribe_bytes(&[0u8; 64], None).unwrap();
    assert_eq!(text, "hello runtime");

    let with_lang = fx.manager.transcribe_bytes(&[0u8; 64], Some("fr")).unwrap();
    assert_eq!(with_lang, "hello runtime");
    let calls = fx.stt.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].language.as_deref(), Some("fr"));
}

#[test]
fn speak_to_file_writes_a_decodable_wav() {
    let fx = fixture(VoiceRuntimeConfig::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speech.wav");

    let written = fx
        .manager
        .speak_to_file("# File **output**", &path, None, None, true)
        .unwrap();
    assert_eq!(written, path);

    let audio = voxloop_audio::wav::read_wav_to_mono(&path).unwrap();
    assert_eq!(audio.sample_rate, 16_000);
    assert!(!audio.samples.is_empty());
    assert_eq!(fx.tts.synthesized(), vec!["File output"]);
}

#[test]
fn cleanup_is_idempotent() {
    let fx = fixture(VoiceRuntimeConfig::default());
    fx.manager.listen(Arc::new(|_| {}), None).unwrap();
    assert!(fx.manager.cleanup());
    assert!(fx.manager.cleanup());
    assert!(!fx.manager.is_listening());
}
