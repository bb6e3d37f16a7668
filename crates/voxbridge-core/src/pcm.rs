//! PCM sample conversions for the 16-bit little-endian mono wire format.
//!
//! The pipeline works on `f32` samples in the raw i16 value range; clipping
//! and quantization back to i16 happen only at the wire boundary.

/// Decode little-endian 16-bit PCM bytes into samples.
///
/// A trailing odd byte is ignored; callers frame their input to whole
/// samples before decoding.
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as little-endian 16-bit PCM bytes.
pub fn bytes_from_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Widen to f32 without rescaling — crossfade and gating operate on the
/// raw sample magnitudes.
pub fn to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32).collect()
}

/// Clip and quantize float samples back to i16 for the wire.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| s.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// RMS energy of a frame. Empty frames have zero energy.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}
