//! Conversion engine boundary.
//!
//! The neural models live behind [`ConversionEngine`]; this crate only
//! knows the black-box contract — PCM in, PCM out, speech verdicts, and
//! the two ways an engine can fail. Engines are explicitly constructed
//! capability objects with an init/shutdown lifecycle; there are no
//! module-level handles.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use voxbridge_core::config::EngineConfig;

pub mod http;
pub mod invoker;
pub mod passthrough;

pub use invoker::ConversionInvoker;

/// Engine-side failure taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configured target-voice identifier does not resolve.
    #[error("unknown target voice: {0}")]
    UnknownTarget(String),

    /// Any internal engine failure.
    #[error("engine failure: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Failed(err.to_string())
    }
}

/// Opaque voice-conversion and VAD capability.
///
/// The engine is stateless per call from the relay's perspective; any
/// model state lives behind this boundary. Callers never issue more than
/// one `convert` per session at a time.
#[async_trait]
pub trait ConversionEngine: Send + Sync + std::fmt::Debug {
    /// Convert 16-bit mono PCM into the target voice.
    async fn convert(&self, pcm: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Whether the given PCM contains speech. Implementations should not
    /// fail for well-formed input; callers fail open regardless.
    async fn is_speech(&self, pcm: &[u8], sample_rate: u32) -> Result<bool, EngineError>;

    /// Sample rate of the PCM this engine emits.
    fn output_sample_rate(&self) -> u32;

    /// Release engine resources. Default is a no-op.
    async fn shutdown(&self) {}
}

/// Construct the engine selected by configuration.
pub fn build(config: &EngineConfig, wire_rate: u32) -> Result<Arc<dyn ConversionEngine>, EngineError> {
    match config.kind.as_str() {
        "passthrough" => {
            let threshold = config
                .vad_threshold
                .unwrap_or(passthrough::DEFAULT_VAD_THRESHOLD);
            let engine =
                passthrough::PassthroughEngine::new(&config.target_voice, wire_rate, threshold)?;
            Ok(Arc::new(engine))
        }
        "http" => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| EngineError::Failed("http engine requires base_url".into()))?;
            let output_rate = config.output_sample_rate.unwrap_or(wire_rate);
            Ok(Arc::new(http::HttpEngine::new(
                base_url,
                config.target_voice.clone(),
                output_rate,
            )))
        }
        other => Err(EngineError::Failed(format!("unknown engine kind: {other}"))),
    }
}

/// Run dummy conversions through the engine so the first real request does
/// not pay cold-start latency. Warmup failures are logged, never fatal.
pub async fn warm_up(engine: &dyn ConversionEngine, rounds: u32, chunk_bytes: usize) {
    if rounds == 0 {
        return;
    }
    info!(rounds, "warming up conversion engine");
    let dummy = vec![0u8; chunk_bytes];
    for round in 1..=rounds {
        if let Err(e) = engine.convert(&dummy).await {
            warn!(round, %e, "engine warmup round failed");
            return;
        }
    }
    info!("engine warmup complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_passthrough_engine() {
        let config = EngineConfig::default();
        let engine = build(&config, 16_000).unwrap();
        assert_eq!(engine.output_sample_rate(), 16_000);
    }

    #[test]
    fn test_build_rejects_unknown_kind() {
        let config = EngineConfig {
            kind: "quantum".into(),
            ..Default::default()
        };
        assert!(build(&config, 16_000).is_err());
    }

    #[test]
    fn test_build_rejects_unknown_voice() {
        let config = EngineConfig {
            target_voice: "nonexistent-voice".into(),
            ..Default::default()
        };
        let err = build(&config, 16_000).unwrap_err();
        assert!(matches!(err, EngineError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn test_build_threads_vad_threshold() {
        let config = EngineConfig {
            vad_threshold: Some(5000.0),
            ..Default::default()
        };
        let engine = build(&config, 16_000).unwrap();
        let loud = voxbridge_core::pcm::bytes_from_samples(&vec![3000i16; 512]);
        assert!(!engine.is_speech(&loud, 16_000).await.unwrap());
    }

    #[tokio::test]
    async fn test_warm_up_runs_through_passthrough() {
        let config = EngineConfig::default();
        let engine = build(&config, 16_000).unwrap();
        // Must complete without error or panic.
        warm_up(engine.as_ref(), 3, 4096).await;
    }
}
