//! Overlap-add crossfade over independently converted frames.
//!
//! Each chunk is converted (or bypassed) on its own, so adjacent outputs
//! meet with phase and amplitude discontinuities that are audible as
//! clicks. The blender smooths every boundary by fading the tail of the
//! previous frame into the head of the current one, at the cost of exactly
//! one frame of pipeline delay.

use std::f32::consts::PI;

/// Split-Hann crossfade state.
///
/// Holds the full previous frame in float form plus the precomputed fade
/// windows. The two window halves are complementary — `fade_in[i] +
/// fade_out[i] == 1` for every `i` — so blending two identical signals
/// reproduces the signal unchanged.
pub struct ContinuityBlender {
    overlap: usize,
    fade_in: Vec<f32>,
    fade_out: Vec<f32>,
    previous: Option<Vec<f32>>,
}

impl ContinuityBlender {
    /// `overlap` is the boundary length in samples; must not exceed the
    /// frame length fed to [`push`](Self::push).
    pub fn new(overlap: usize) -> Self {
        // Periodic Hann of length 2*overlap, split at the midpoint.
        let window: Vec<f32> = (0..overlap * 2)
            .map(|k| 0.5 * (1.0 - (PI * k as f32 / overlap as f32).cos()))
            .collect();
        let fade_in = window[..overlap].to_vec();
        let fade_out = window[overlap..].to_vec();
        debug_assert_eq!(fade_in.len(), overlap);
        debug_assert_eq!(fade_out.len(), overlap);

        Self {
            overlap,
            fade_in,
            fade_out,
            previous: None,
        }
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Absorb the next frame and emit the previous one with its trailing
    /// edge blended into this frame's head.
    ///
    /// The first frame is held back and `None` is returned; output lags
    /// input by exactly one frame from then on. The state updates on every
    /// frame, converted and bypassed alike.
    pub fn push(&mut self, frame: Vec<f32>) -> Option<Vec<f32>> {
        debug_assert!(frame.len() >= self.overlap);

        let prev = match self.previous.take() {
            None => {
                self.previous = Some(frame);
                return None;
            }
            Some(prev) => prev,
        };

        let split = prev.len() - self.overlap;
        let mut out = Vec::with_capacity(prev.len());
        out.extend_from_slice(&prev[..split]);
        for i in 0..self.overlap {
            out.push(prev[split + i] * self.fade_out[i] + frame[i] * self.fade_in[i]);
        }

        self.previous = Some(frame);
        Some(out)
    }
}
