//! Best-effort pitch-preserving time stretch.
//!
//! Overlap-add with a Hann window: good enough for speech-rate changes in
//! the [0.5, 2.0] range without dragging in a DSP stack. Out-of-range or
//! degenerate requests return the input unchanged; callers treat speed as
//! advisory.

const FRAME: usize = 1024;
const HOP_OUT: usize = FRAME / 4;

fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let x = std::f32::consts::PI * i as f32 / n as f32;
            x.sin() * x.sin()
        })
        .collect()
}

/// Time-stretch mono audio by `speed` (2.0 = twice as fast) keeping pitch.
///
/// Output length is approximately `len / speed`. Inputs shorter than one
/// frame, speed 1.0, and speeds outside [0.5, 2.0] pass through.
pub fn apply_speed_preserving_pitch(samples: &[f32], speed: f32) -> Vec<f32> {
    if !(0.5..=2.0).contains(&speed) {
        tracing::debug!(speed, "Speed outside stretchable range, audio unchanged");
        return samples.to_vec();
    }
    if (speed - 1.0).abs() < 1e-3 || samples.len() < FRAME * 2 {
        return samples.to_vec();
    }

    let hop_in = (HOP_OUT as f32 * speed).round().max(1.0) as usize;
    let window = hann(FRAME);
    let out_len = (samples.len() as f32 / speed).round() as usize;
    let mut out = vec![0.0f32; out_len + FRAME];
    let mut norm = vec![0.0f32; out_len + FRAME];

    let mut in_pos = 0usize;
    let mut out_pos = 0usize;
    while in_pos + FRAME <= samples.len() && out_pos + FRAME <= out.len() {
        for i in 0..FRAME {
            let w = window[i];
            out[out_pos + i] += samples[in_pos + i] * w;
            norm[out_pos + i] += w;
        }
        in_pos += hop_in;
        out_pos += HOP_OUT;
    }

    out.truncate(out_len);
    for (sample, weight) in out.iter_mut().zip(norm.iter()) {
        if *weight > 1e-6 {
            *sample /= weight;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * std::f32::consts::TAU * freq / rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn faster_speech_is_shorter() {
        let input = tone(22_050, 220.0, 22_050.0);
        let out = apply_speed_preserving_pitch(&input, 2.0);
        let expected = input.len() / 2;
        assert!(
            (out.len() as i64 - expected as i64).unsigned_abs() < FRAME as u64,
            "len {} vs {}",
            out.len(),
            expected
        );
    }

    #[test]
    fn slower_speech_is_longer() {
        let input = tone(22_050, 220.0, 22_050.0);
        let out = apply_speed_preserving_pitch(&input, 0.5);
        assert!(out.len() > input.len() + input.len() / 2);
    }

    #[test]
    fn unit_and_out_of_range_speeds_pass_through() {
        let input = tone(4_096, 220.0, 22_050.0);
        assert_eq!(apply_speed_preserving_pitch(&input, 1.0), input);
        assert_eq!(apply_speed_preserving_pitch(&input, 3.0), input);
        assert_eq!(apply_speed_preserving_pitch(&input, 0.1), input);
    }

    #[test]
    fn short_input_passes_through() {
        let input = tone(512, 220.0, 22_050.0);
        assert_eq!(apply_speed_preserving_pitch(&input, 1.5), input);
    }

    #[test]
    fn output_stays_in_range() {
        let input = tone(22_050, 440.0, 22_050.0);
        let out = apply_speed_preserving_pitch(&input, 1.3);
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }
}
