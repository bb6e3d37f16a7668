//! Remote conversion engine over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{ConversionEngine, EngineError};

/// Engine that relays PCM to a remote conversion service.
///
/// `POST {base}/convert?voice={id}` with a raw PCM body returns converted
/// PCM; `POST {base}/vad?rate={hz}` returns a JSON speech verdict. A 404
/// from the convert endpoint means the target voice does not resolve.
#[derive(Debug)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    target_voice: String,
    output_rate: u32,
}

#[derive(Debug, Deserialize)]
struct VadResponse {
    speech: bool,
}

impl HttpEngine {
    pub fn new(base_url: String, target_voice: String, output_rate: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            target_voice,
            output_rate,
        }
    }

    fn convert_url(&self) -> String {
        format!("{}/convert?voice={}", self.base_url, self.target_voice)
    }

    fn vad_url(&self, sample_rate: u32) -> String {
        format!("{}/vad?rate={sample_rate}", self.base_url)
    }
}

#[async_trait]
impl ConversionEngine for HttpEngine {
    async fn convert(&self, pcm: &[u8]) -> Result<Vec<u8>, EngineError> {
        debug!(bytes = pcm.len(), voice = %self.target_voice, "sending conversion request");

        let resp = self
            .client
            .post(self.convert_url())
            .header("Content-Type", "application/octet-stream")
            .body(pcm.to_vec())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EngineError::UnknownTarget(self.target_voice.clone()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Failed(format!("convert returned {status}: {body}")));
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn is_speech(&self, pcm: &[u8], sample_rate: u32) -> Result<bool, EngineError> {
        let resp = self
            .client
            .post(self.vad_url(sample_rate))
            .header("Content-Type", "application/octet-stream")
            .body(pcm.to_vec())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EngineError::Failed(format!("vad returned {}", resp.status())));
        }

        let verdict: VadResponse = resp.json().await?;
        Ok(verdict.speech)
    }

    fn output_sample_rate(&self) -> u32 {
        self.output_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let engine = HttpEngine::new(
            "http://127.0.0.1:9000/".into(),
            "zundamon001".into(),
            24_000,
        );
        assert_eq!(
            engine.convert_url(),
            "http://127.0.0.1:9000/convert?voice=zundamon001"
        );
        assert_eq!(engine.vad_url(16_000), "http://127.0.0.1:9000/vad?rate=16000");
        assert_eq!(engine.output_sample_rate(), 24_000);
    }
}
