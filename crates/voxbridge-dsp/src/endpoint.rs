//! Utterance endpointing — onset detection, trailing-silence cutoff,
//! duration cap.

use voxbridge_core::pcm;

/// Detector phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for the first frame whose energy clears the threshold.
    Idle,
    /// Accumulating frames until silence or the duration cap ends the take.
    Recording,
}

/// Energy-threshold utterance endpoint detector.
///
/// Feed fixed-size capture frames in order; when a complete utterance is
/// bounded, its concatenated bytes come back and the detector returns to
/// `Idle`. The onset frame is part of the recording, as is the trailing
/// silence run up to the cutoff decision.
pub struct EndpointDetector {
    threshold: f64,
    /// Consecutive silent frames beyond which the recording ends.
    silence_frames: usize,
    /// Hard cap on recorded frames; recording ends exactly here.
    max_frames: usize,
    state: EndpointState,
    recorded: Vec<u8>,
    frame_count: usize,
    silent_count: usize,
}

impl EndpointDetector {
    pub fn new(threshold: f64, silence_frames: usize, max_frames: usize) -> Self {
        Self {
            threshold,
            silence_frames,
            max_frames,
            state: EndpointState::Idle,
            recorded: Vec::new(),
            frame_count: 0,
            silent_count: 0,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Frames recorded so far in the current take.
    pub fn recorded_frames(&self) -> usize {
        self.frame_count
    }

    /// Process one capture frame. Returns the finished utterance payload
    /// when this frame ends the recording.
    pub fn push(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let energy = pcm::rms(&pcm::samples_from_bytes(frame));
        let loud = energy > self.threshold;

        match self.state {
            EndpointState::Idle => {
                if !loud {
                    return None;
                }
                // Onset: this frame opens the recording and is retained.
                self.state = EndpointState::Recording;
                self.recorded.extend_from_slice(frame);
                self.frame_count = 1;
                self.silent_count = 0;
                if self.frame_count >= self.max_frames {
                    return Some(self.finalize());
                }
                None
            }
            EndpointState::Recording => {
                self.recorded.extend_from_slice(frame);
                self.frame_count += 1;
                if loud {
                    self.silent_count = 0;
                } else {
                    self.silent_count += 1;
                }

                if self.silent_count > self.silence_frames || self.frame_count >= self.max_frames {
                    return Some(self.finalize());
                }
                None
            }
        }
    }

    /// End of input: emit whatever take is in progress, if any.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        match self.state {
            EndpointState::Recording => Some(self.finalize()),
            EndpointState::Idle => None,
        }
    }

    /// Abandon any partial recording and wait for a fresh onset.
    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.recorded.clear();
        self.frame_count = 0;
        self.silent_count = 0;
    }

    fn finalize(&mut self) -> Vec<u8> {
        let payload = std::mem::take(&mut self.recorded);
        self.state = EndpointState::Idle;
        self.frame_count = 0;
        self.silent_count = 0;
        payload
    }
}
