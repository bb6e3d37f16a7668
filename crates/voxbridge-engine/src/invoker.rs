//! Call boundary between the session loop and the conversion engine.

use std::sync::Arc;

use voxbridge_core::{pcm, Result, VoxError};
use voxbridge_dsp::gate::Activity;
use voxbridge_dsp::resample;

use crate::{ConversionEngine, EngineError};

/// Wraps the engine with the relay-side contract checks.
///
/// At most one conversion is in flight per session: the session loop holds
/// the invoker and awaits each call to completion, since interleaving
/// converted and raw output order is not permitted. The invoker also
/// enforces the output-length contract — a converted frame must carry the
/// engine's declared frame duration, bridged to the wire rate by at most
/// one corrective resample stage.
pub struct ConversionInvoker {
    engine: Arc<dyn ConversionEngine>,
    wire_rate: u32,
}

impl ConversionInvoker {
    pub fn new(engine: Arc<dyn ConversionEngine>, wire_rate: u32) -> Self {
        Self { engine, wire_rate }
    }

    /// Convert one fixed-size frame, returning float samples at the wire
    /// rate with exactly `expected_samples` entries.
    pub async fn convert_frame(&self, frame: &[u8], expected_samples: usize) -> Result<Vec<f32>> {
        let converted = self.engine.convert(frame).await.map_err(map_engine_error)?;
        if converted.len() % 2 != 0 {
            return Err(VoxError::Conversion(format!(
                "engine returned {} bytes, not whole 16-bit samples",
                converted.len()
            )));
        }

        let samples = pcm::samples_from_bytes(&converted);
        let engine_rate = self.engine.output_sample_rate();

        // Duration contract: the converted frame must span the same time as
        // the input frame at the engine's declared rate.
        let got = samples.len() as u64 * self.wire_rate as u64;
        let want = expected_samples as u64 * engine_rate as u64;
        if got != want {
            return Err(VoxError::Conversion(format!(
                "engine returned {} samples at {} Hz, expected frame duration of {} samples at {} Hz",
                samples.len(),
                engine_rate,
                expected_samples,
                self.wire_rate
            )));
        }

        let floats = pcm::to_float(&samples);
        if engine_rate == self.wire_rate {
            Ok(floats)
        } else {
            Ok(resample::resample_to_len(&floats, expected_samples))
        }
    }

    /// Convert a whole utterance. Output length is free; only the sample
    /// rate is corrected to the wire rate.
    pub async fn convert_utterance(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let converted = self.engine.convert(payload).await.map_err(map_engine_error)?;
        if converted.len() % 2 != 0 {
            return Err(VoxError::Conversion(format!(
                "engine returned {} bytes, not whole 16-bit samples",
                converted.len()
            )));
        }

        let engine_rate = self.engine.output_sample_rate();
        if engine_rate == self.wire_rate {
            return Ok(converted);
        }

        let floats = pcm::to_float(&pcm::samples_from_bytes(&converted));
        let resampled = resample::resample_linear(&floats, engine_rate, self.wire_rate);
        Ok(pcm::bytes_from_samples(&pcm::quantize(&resampled)))
    }

    /// Classify a whole utterance via the engine VAD, failing open to
    /// speech so audio is never dropped on a VAD error.
    pub async fn gate_utterance(&self, payload: &[u8], sample_rate: u32) -> Activity {
        Activity::from_vad(self.engine.is_speech(payload, sample_rate).await)
    }
}

fn map_engine_error(err: EngineError) -> VoxError {
    match err {
        EngineError::UnknownTarget(voice) => VoxError::UnknownTarget(voice),
        EngineError::Failed(msg) => VoxError::Conversion(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use voxbridge_core::pcm::bytes_from_samples;

    /// Engine that returns a fixed payload regardless of input.
    #[derive(Debug)]
    struct FixedEngine {
        output: Vec<u8>,
        rate: u32,
    }

    #[async_trait]
    impl ConversionEngine for FixedEngine {
        async fn convert(&self, _pcm: &[u8]) -> std::result::Result<Vec<u8>, EngineError> {
            Ok(self.output.clone())
        }

        async fn is_speech(
            &self,
            _pcm: &[u8],
            _sample_rate: u32,
        ) -> std::result::Result<bool, EngineError> {
            Err(EngineError::Failed("vad unavailable".into()))
        }

        fn output_sample_rate(&self) -> u32 {
            self.rate
        }
    }

    #[tokio::test]
    async fn test_frame_round_trip_at_wire_rate() {
        let engine = Arc::new(FixedEngine {
            output: bytes_from_samples(&vec![1000i16; 2048]),
            rate: 16_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);

        let out = invoker.convert_frame(&[0u8; 4096], 2048).await.unwrap();
        assert_eq!(out.len(), 2048);
        assert!(out.iter().all(|&s| s == 1000.0));
    }

    #[tokio::test]
    async fn test_short_frame_is_contract_breach() {
        let engine = Arc::new(FixedEngine {
            output: bytes_from_samples(&vec![0i16; 1000]),
            rate: 16_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);

        let err = invoker.convert_frame(&[0u8; 4096], 2048).await.unwrap_err();
        assert!(matches!(err, VoxError::Conversion(_)));
    }

    #[tokio::test]
    async fn test_odd_byte_output_is_contract_breach() {
        let engine = Arc::new(FixedEngine {
            output: vec![0u8; 4097],
            rate: 16_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);

        let err = invoker.convert_frame(&[0u8; 4096], 2048).await.unwrap_err();
        assert!(matches!(err, VoxError::Conversion(_)));
    }

    #[tokio::test]
    async fn test_rate_mismatch_gets_one_corrective_resample() {
        // Engine speaks 24kHz: a 2048-sample wire frame is 3072 samples there.
        let engine = Arc::new(FixedEngine {
            output: bytes_from_samples(&vec![800i16; 3072]),
            rate: 24_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);

        let out = invoker.convert_frame(&[0u8; 4096], 2048).await.unwrap();
        assert_eq!(out.len(), 2048);
        for &s in &out {
            assert!((s - 800.0).abs() < 1e-2);
        }
    }

    #[tokio::test]
    async fn test_rate_mismatch_with_wrong_duration_still_fails() {
        // 24kHz engine returning 2048 samples does not span one wire frame.
        let engine = Arc::new(FixedEngine {
            output: bytes_from_samples(&vec![0i16; 2048]),
            rate: 24_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);
        assert!(invoker.convert_frame(&[0u8; 4096], 2048).await.is_err());
    }

    #[tokio::test]
    async fn test_utterance_resampled_to_wire_rate() {
        let engine = Arc::new(FixedEngine {
            output: bytes_from_samples(&vec![500i16; 4800]),
            rate: 48_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);

        let out = invoker.convert_utterance(&[0u8; 100]).await.unwrap();
        // 4800 samples at 48kHz -> 1600 samples at 16kHz -> 3200 bytes
        assert_eq!(out.len(), 3200);
    }

    #[tokio::test]
    async fn test_gate_fails_open_on_vad_error() {
        let engine = Arc::new(FixedEngine {
            output: Vec::new(),
            rate: 16_000,
        });
        let invoker = ConversionInvoker::new(engine, 16_000);
        assert_eq!(invoker.gate_utterance(&[0u8; 64], 16_000).await, Activity::Speech);
    }
}
