//! WAV PCM16 encode/decode used at adapter boundaries.

use crate::AudioBuffer;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use voxloop_foundation::AudioError;

/// Encode mono float32 audio as 16-bit PCM WAV bytes.
pub fn encode_wav_pcm16(audio: &AudioBuffer) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| AudioError::Wav(e.to_string()))?;
        for &sample in &audio.samples {
            let s = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
            writer
                .write_sample(s)
                .map_err(|e| AudioError::Wav(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Wav(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Write mono float32 audio to a 16-bit PCM WAV file.
pub fn write_wav_pcm16(audio: &AudioBuffer, path: &Path) -> Result<(), AudioError> {
    let bytes = encode_wav_pcm16(audio)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Decode WAV bytes to mono float32. Multi-channel input is downmixed by
/// averaging; int and float sample formats are both accepted.
pub fn decode_wav_to_mono(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    let mut reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Wav(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Wav(e.to_string()))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Wav(e.to_string()))?,
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioBuffer::new(samples, spec.sample_rate))
}

/// Read a WAV file to mono float32.
pub fn read_wav_to_mono(path: &Path) -> Result<AudioBuffer, AudioError> {
    let bytes = std::fs::read(path)?;
    decode_wav_to_mono(&bytes)
}
