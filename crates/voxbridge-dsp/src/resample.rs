//! Linear-interpolation resampling.
//!
//! The single corrective stage between the engine's declared output rate
//! and the wire rate. Anything fancier (band limiting, polyphase) belongs
//! in the conversion engine itself.

/// Resample between two rates with linear interpolation.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }
    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    resample_to_len(samples, out_len)
}

/// Resample to an exact output length, independent of rate bookkeeping.
pub fn resample_to_len(samples: &[f32], out_len: usize) -> Vec<f32> {
    if samples.is_empty() || out_len == 0 {
        return vec![0.0; out_len];
    }
    if samples.len() == out_len {
        return samples.to_vec();
    }

    let ratio = samples.len() as f64 / out_len as f64;
    (0..out_len)
        .map(|i| {
            let src_idx = i as f64 * ratio;
            let idx = src_idx.floor() as usize;
            let frac = src_idx.fract() as f32;

            if idx + 1 < samples.len() {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            } else {
                samples[samples.len() - 1]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![1.0, -2.0, 3.0];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_upsample_doubles_length() {
        let samples = vec![0.0f32; 1000];
        assert_eq!(resample_linear(&samples, 24_000, 48_000).len(), 2000);
    }

    #[test]
    fn test_downsample_halves_length() {
        let samples = vec![0.0f32; 2000];
        assert_eq!(resample_linear(&samples, 48_000, 24_000).len(), 1000);
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let samples = vec![500.0f32; 960];
        for s in resample_linear(&samples, 24_000, 16_000) {
            assert!((s - 500.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_exact_target_length() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(resample_to_len(&samples, 37).len(), 37);
        assert_eq!(resample_to_len(&samples, 250).len(), 250);
        // Monotone input stays monotone under linear interpolation
        let up = resample_to_len(&samples, 250);
        for pair in up.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }
}
