//! Identity engine for development and tests.

use async_trait::async_trait;

use voxbridge_core::pcm;

use crate::{ConversionEngine, EngineError};

/// Voices the passthrough engine will resolve.
const KNOWN_VOICES: &[&str] = &["default", "identity"];

/// VAD threshold when the configuration does not set one.
pub const DEFAULT_VAD_THRESHOLD: f64 = 150.0;

/// Engine that returns its input unchanged and gates on RMS energy.
///
/// Exercises the full relay path — target resolution, conversion calls,
/// VAD verdicts — without any model behind it.
#[derive(Debug)]
pub struct PassthroughEngine {
    sample_rate: u32,
    vad_threshold: f64,
}

impl PassthroughEngine {
    /// Resolve the target voice at construction; an unknown identifier is
    /// the same contract breach a real engine would report.
    pub fn new(target_voice: &str, sample_rate: u32, vad_threshold: f64) -> Result<Self, EngineError> {
        if !KNOWN_VOICES.contains(&target_voice) {
            return Err(EngineError::UnknownTarget(target_voice.to_string()));
        }
        Ok(Self {
            sample_rate,
            vad_threshold,
        })
    }
}

#[async_trait]
impl ConversionEngine for PassthroughEngine {
    async fn convert(&self, pcm: &[u8]) -> Result<Vec<u8>, EngineError> {
        Ok(pcm.to_vec())
    }

    async fn is_speech(&self, pcm: &[u8], _sample_rate: u32) -> Result<bool, EngineError> {
        let samples = pcm::samples_from_bytes(pcm);
        Ok(pcm::rms(&samples) > self.vad_threshold)
    }

    fn output_sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxbridge_core::pcm::bytes_from_samples;

    #[test]
    fn test_unknown_voice_rejected_at_construction() {
        assert!(PassthroughEngine::new("default", 16_000, DEFAULT_VAD_THRESHOLD).is_ok());
        let err = PassthroughEngine::new("zundamon", 16_000, DEFAULT_VAD_THRESHOLD).unwrap_err();
        assert!(matches!(err, EngineError::UnknownTarget(v) if v == "zundamon"));
    }

    #[tokio::test]
    async fn test_convert_is_identity() {
        let engine = PassthroughEngine::new("default", 16_000, DEFAULT_VAD_THRESHOLD).unwrap();
        let input = bytes_from_samples(&[1, -2, 3, -4]);
        assert_eq!(engine.convert(&input).await.unwrap(), input);
    }

    #[tokio::test]
    async fn test_is_speech_uses_energy() {
        let engine = PassthroughEngine::new("default", 16_000, DEFAULT_VAD_THRESHOLD).unwrap();
        let quiet = bytes_from_samples(&vec![0i16; 1024]);
        let loud = bytes_from_samples(&vec![3000i16; 1024]);
        assert!(!engine.is_speech(&quiet, 16_000).await.unwrap());
        assert!(engine.is_speech(&loud, 16_000).await.unwrap());
    }

    #[tokio::test]
    async fn test_vad_threshold_is_tunable() {
        let strict = PassthroughEngine::new("default", 16_000, 5000.0).unwrap();
        let loud = bytes_from_samples(&vec![3000i16; 1024]);
        assert!(!strict.is_speech(&loud, 16_000).await.unwrap());
    }
}
