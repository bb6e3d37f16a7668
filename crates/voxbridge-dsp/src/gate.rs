//! Speech/silence gating.

use tracing::warn;

use voxbridge_core::pcm;

/// Classification result for a frame or utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Speech,
    Silence,
}

impl Activity {
    /// Fold an external VAD verdict into a classification, failing open.
    ///
    /// A VAD failure must never silently drop audio, so any error counts
    /// as speech and the conversion path runs.
    pub fn from_vad<E: std::fmt::Display>(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => Activity::Speech,
            Ok(false) => Activity::Silence,
            Err(e) => {
                warn!(%e, "external VAD failed, treating frame as speech");
                Activity::Speech
            }
        }
    }
}

/// RMS energy gate.
///
/// A `Silence` verdict means the frame skips conversion entirely and passes
/// through untouched, preserving natural background audio at zero model
/// cost.
pub struct EnergyGate {
    threshold: f64,
}

impl EnergyGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn classify(&self, samples: &[i16]) -> Activity {
        if pcm::rms(samples) < self.threshold {
            Activity::Silence
        } else {
            Activity::Speech
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_gate_thresholding() {
        let gate = EnergyGate::new(150.0);
        assert_eq!(gate.classify(&[0i16; 2048]), Activity::Silence);
        assert_eq!(gate.classify(&[100i16; 2048]), Activity::Silence);
        assert_eq!(gate.classify(&[1000i16; 2048]), Activity::Speech);
    }

    #[test]
    fn test_threshold_is_exclusive_below() {
        // rms == threshold counts as speech (only strictly quieter bypasses)
        let gate = EnergyGate::new(100.0);
        assert_eq!(gate.classify(&[100i16; 64]), Activity::Speech);
    }

    #[test]
    fn test_vad_verdicts_and_fail_open() {
        assert_eq!(Activity::from_vad::<String>(Ok(true)), Activity::Speech);
        assert_eq!(Activity::from_vad::<String>(Ok(false)), Activity::Silence);
        assert_eq!(
            Activity::from_vad(Err("model exploded".to_string())),
            Activity::Speech
        );
    }
}
