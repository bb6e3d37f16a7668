//! Configuration loading and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxError};

/// Operating mode for a relay instance.
///
/// The two modes share a port assumption but are never active on the same
/// connection; the mode is fixed by configuration on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fixed-size chunks relayed with crossfade continuity.
    Continuous,
    /// Length-prefixed whole-utterance round trips.
    Utterance,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Continuous
    }
}

impl std::str::FromStr for Mode {
    type Err = VoxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continuous" => Ok(Self::Continuous),
            "utterance" => Ok(Self::Utterance),
            other => Err(VoxError::Config(format!("unknown mode: {other}"))),
        }
    }
}

/// Top-level Voxbridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listener: ListenerConfig,
    pub audio: AudioConfig,
    pub continuous: ContinuousConfig,
    pub utterance: UtteranceConfig,
    pub engine: EngineConfig,
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Connection-level audio contract, fixed on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Wire sample rate (16-bit signed mono, little-endian).
    pub sample_rate: u32,
    /// Fixed chunk size in bytes for continuous mode.
    pub chunk_bytes: usize,
    /// Crossfade overlap length in samples.
    pub overlap_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_bytes: 4096,
            overlap_samples: 256,
        }
    }
}

impl AudioConfig {
    /// Samples per fixed chunk.
    pub fn chunk_samples(&self) -> usize {
        self.chunk_bytes / 2
    }
}

/// Continuous-mode tuning. Gating here is coarser and faster than
/// utterance-mode endpointing; the thresholds are deliberately independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousConfig {
    /// RMS threshold below which a chunk bypasses conversion.
    pub vad_threshold: f64,
    /// Bounded socket read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Consecutive read timeouts before the session is declared dead.
    pub max_idle_timeouts: u32,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 150.0,
            read_timeout_ms: 1000,
            max_idle_timeouts: 5,
        }
    }
}

/// Utterance-mode tuning (endpointing and framed round trips).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtteranceConfig {
    /// RMS threshold for endpoint onset/offset detection.
    pub vad_threshold: f64,
    /// Trailing silence that ends a recording, in milliseconds.
    pub trailing_silence_ms: u64,
    /// Hard cap on a single utterance, in milliseconds.
    pub max_utterance_ms: u64,
    /// Capture frame size in bytes for the endpoint detector.
    pub frame_bytes: usize,
    /// Bounded socket read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Consecutive read timeouts before the session is declared dead.
    pub max_idle_timeouts: u32,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 300.0,
            trailing_silence_ms: 1000,
            max_utterance_ms: 10_000,
            frame_bytes: 2048,
            read_timeout_ms: 1000,
            max_idle_timeouts: 30,
        }
    }
}

impl UtteranceConfig {
    /// Consecutive silent frames that end a recording.
    pub fn silence_frames(&self, sample_rate: u32) -> usize {
        let frame_samples = self.frame_bytes / 2;
        let silence_samples = self.trailing_silence_ms as usize * sample_rate as usize / 1000;
        (silence_samples / frame_samples.max(1)).max(1)
    }

    /// Maximum recorded frames before the duration cap fires.
    pub fn max_frames(&self, sample_rate: u32) -> usize {
        let frame_samples = self.frame_bytes / 2;
        let cap_samples = self.max_utterance_ms as usize * sample_rate as usize / 1000;
        (cap_samples / frame_samples.max(1)).max(1)
    }
}

/// Conversion engine selection and lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine kind: "passthrough" or "http".
    pub kind: String,
    /// Base URL of the remote conversion service (http kind).
    pub base_url: Option<String>,
    /// Target-voice identifier handed to the engine.
    pub target_voice: String,
    /// Sample rate the engine declares for its output. Differences from the
    /// wire rate are bridged by one corrective resample stage.
    pub output_sample_rate: Option<u32>,
    /// RMS threshold for engines that gate on energy (passthrough). Remote
    /// engines carry their own VAD models and ignore this.
    pub vad_threshold: Option<f64>,
    /// Dummy conversions to run at startup so the first real request does
    /// not pay cold-start latency.
    pub warmup: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: "passthrough".to_string(),
            base_url: None,
            target_voice: "default".to_string(),
            output_sample_rate: None,
            vad_threshold: None,
            warmup: 0,
        }
    }
}

impl Config {
    /// Load configuration from a JSON5 file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VoxError::Config(format!("{}: {e}", path.display())))?;
        let config: Config =
            json5::from_str(&raw).map_err(|e| VoxError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the session loop relies on.
    pub fn validate(&self) -> Result<()> {
        if self.audio.chunk_bytes == 0 || self.audio.chunk_bytes % 2 != 0 {
            return Err(VoxError::Config(
                "audio.chunk_bytes must be a positive even number".into(),
            ));
        }
        if self.audio.overlap_samples == 0
            || self.audio.overlap_samples > self.audio.chunk_samples()
        {
            return Err(VoxError::Config(format!(
                "audio.overlap_samples must be in 1..={}",
                self.audio.chunk_samples()
            )));
        }
        if self.utterance.frame_bytes == 0 || self.utterance.frame_bytes % 2 != 0 {
            return Err(VoxError::Config(
                "utterance.frame_bytes must be a positive even number".into(),
            ));
        }
        if self.utterance.max_utterance_ms <= self.utterance.trailing_silence_ms {
            return Err(VoxError::Config(
                "utterance.max_utterance_ms must exceed trailing_silence_ms".into(),
            ));
        }
        if self.continuous.max_idle_timeouts == 0 || self.utterance.max_idle_timeouts == 0 {
            return Err(VoxError::Config("max_idle_timeouts must be at least 1".into()));
        }
        if self.engine.kind == "http" && self.engine.base_url.is_none() {
            return Err(VoxError::Config("engine.base_url required for http engine".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.chunk_samples(), 2048);
        assert_eq!(config.mode, Mode::Continuous);
    }

    #[test]
    fn test_validation_rejects_bad_overlap() {
        let mut config = Config::default();
        config.audio.overlap_samples = 5000; // larger than one chunk
        assert!(config.validate().is_err());

        config.audio.overlap_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_requires_engine_url_for_http() {
        let mut config = Config::default();
        config.engine.kind = "http".into();
        assert!(config.validate().is_err());
        config.engine.base_url = Some("http://127.0.0.1:9000".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_silence_and_cap_frame_math() {
        let utt = UtteranceConfig::default();
        // 1s of silence at 16kHz over 1024-sample frames
        assert_eq!(utt.silence_frames(16_000), 15);
        // 10s cap
        assert_eq!(utt.max_frames(16_000), 156);
    }

    #[test]
    fn test_load_json5_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxbridge.json5");
        std::fs::write(
            &path,
            r#"{
                // inline comments are fine in JSON5
                listener: { port: 9100 },
                mode: "utterance",
                continuous: { vad_threshold: 200.0 },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.listener.port, 9100);
        assert_eq!(config.mode, Mode::Utterance);
        assert_eq!(config.continuous.vad_threshold, 200.0);
        // untouched sections keep defaults
        assert_eq!(config.audio.chunk_bytes, 4096);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/voxbridge.json5")).unwrap();
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("continuous".parse::<Mode>().unwrap(), Mode::Continuous);
        assert_eq!("utterance".parse::<Mode>().unwrap(), Mode::Utterance);
        assert!("batch".parse::<Mode>().is_err());
    }
}
