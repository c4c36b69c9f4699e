//! Linear-interpolation mono resampling.
//!
//! Linear interpolation is intentionally the only quality level offered:
//! every conversion in this pipeline is speech headed for a speaker, a VAD
//! or an echo canceller, and none of those care about stopband attenuation.

/// Resample mono float32 audio from `src_hz` to `dst_hz`.
///
/// Returns the input unchanged when either rate is nonpositive, the rates
/// are equal, or the input is shorter than two samples. Output length is
/// `round(len * dst_hz / src_hz)`.
pub fn linear_resample(input: &[f32], src_hz: u32, dst_hz: u32) -> Vec<f32> {
    if src_hz == 0 || dst_hz == 0 || src_hz == dst_hz || input.len() < 2 {
        return input.to_vec();
    }

    let ratio = dst_hz as f64 / src_hz as f64;
    let new_len = ((input.len() as f64 * ratio).round() as usize).max(1);
    let last = (input.len() - 1) as f64;

    let mut out = Vec::with_capacity(new_len);
    if new_len == 1 {
        out.push(input[0]);
        return out;
    }
    let step = last / (new_len - 1) as f64;
    for i in 0..new_len {
        let pos = i as f64 * step;
        let idx = pos.floor() as usize;
        if idx >= input.len() - 1 {
            out.push(input[input.len() - 1]);
        } else {
            let frac = (pos - idx as f64) as f32;
            out.push(input[idx] + (input[idx + 1] - input[idx]) * frac);
        }
    }
    out
}

/// PCM16 variant used on the capture path; converts through f32 internally.
pub fn linear_resample_i16(input: &[i16], src_hz: u32, dst_hz: u32) -> Vec<i16> {
    if src_hz == 0 || dst_hz == 0 || src_hz == dst_hz || input.len() < 2 {
        return input.to_vec();
    }
    let as_f32: Vec<f32> = input.iter().map(|&s| s as f32 / 32768.0).collect();
    linear_resample(&as_f32, src_hz, dst_hz)
        .into_iter()
        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(samples: &[f32]) -> f64 {
        samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len().max(1) as f64
    }

    #[test]
    fn output_length_scales_with_rate_ratio() {
        let input = vec![0.0f32; 22050];
        let out = linear_resample(&input, 22050, 48000);
        assert!((out.len() as i64 - 48000).abs() <= 1, "got {}", out.len());
    }

    #[test]
    fn passthrough_cases_return_input_unchanged() {
        let input = vec![0.1f32, -0.2, 0.3];
        assert_eq!(linear_resample(&input, 16000, 16000), input);
        assert_eq!(linear_resample(&input, 0, 16000), input);
        assert_eq!(linear_resample(&input, 16000, 0), input);
        let short = vec![0.5f32];
        assert_eq!(linear_resample(&short, 8000, 16000), short);
    }

    #[test]
    fn round_trip_preserves_length_and_energy() {
        // A low-frequency tone survives linear interpolation well; bound
        // the round-trip energy loss at 5%.
        let n = 4800;
        let input: Vec<f32> = (0..n)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 200.0 / 48000.0).sin() * 0.5)
            .collect();
        let down = linear_resample(&input, 48000, 16000);
        let back = linear_resample(&down, 16000, 48000);
        assert!((back.len() as i64 - n as i64).abs() <= 1);
        let (e_in, e_out) = (energy(&input), energy(&back));
        assert!(
            (e_out - e_in).abs() / e_in < 0.05,
            "energy drifted: {e_in} -> {e_out}"
        );
    }

    #[test]
    fn upsampled_constant_stays_constant() {
        let input = vec![0.25f32; 160];
        let out = linear_resample(&input, 16000, 48000);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn i16_variant_matches_rounding() {
        let input = vec![1000i16; 320];
        let out = linear_resample_i16(&input, 16000, 8000);
        assert!((out.len() as i64 - 160).abs() <= 1);
        assert!(out.iter().all(|&s| (s - 1000).abs() <= 1));
    }
}
