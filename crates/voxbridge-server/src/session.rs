//! Per-connection session state machine.
//!
//! One session owns one socket and runs one strictly sequential pipeline:
//! read → gate → convert → blend → write. Ordering is a correctness
//! requirement — frame N's context must exist before frame N+1 can be
//! blended, and at most one conversion is ever in flight — so there is no
//! internal parallelism to exploit.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};
use uuid::Uuid;

use voxbridge_core::config::{Config, Mode};
use voxbridge_core::{pcm, Result, VoxError};
use voxbridge_dsp::assembler::FrameAssembler;
use voxbridge_dsp::crossfade::ContinuityBlender;
use voxbridge_dsp::gate::{Activity, EnergyGate};
use voxbridge_engine::{ConversionEngine, ConversionInvoker};

/// Controller for one accepted connection.
///
/// Generic over the stream so tests can drive it with in-memory duplex
/// pipes instead of real sockets.
pub struct SessionController<S> {
    stream: S,
    conn_id: Uuid,
    config: Config,
    invoker: ConversionInvoker,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> SessionController<S> {
    pub fn new(stream: S, conn_id: Uuid, config: Config, engine: Arc<dyn ConversionEngine>) -> Self {
        let invoker = ConversionInvoker::new(engine, config.audio.sample_rate);
        Self {
            stream,
            conn_id,
            config,
            invoker,
        }
    }

    /// Drive the session to completion. `Ok(())` means the peer closed
    /// cleanly; every error is local to this session.
    pub async fn run(mut self) -> Result<()> {
        match self.config.mode {
            Mode::Continuous => self.run_continuous().await,
            Mode::Utterance => self.run_utterance().await,
        }
    }

    /// Continuous mode: symmetric fixed-size chunks with crossfade
    /// continuity. Conversion errors are fatal here — once a frame is
    /// lost, positional input/output correspondence cannot be recovered.
    async fn run_continuous(&mut self) -> Result<()> {
        let chunk_bytes = self.config.audio.chunk_bytes;
        let chunk_samples = self.config.audio.chunk_samples();
        let read_timeout = Duration::from_millis(self.config.continuous.read_timeout_ms);
        let max_idle = self.config.continuous.max_idle_timeouts;

        let mut assembler = FrameAssembler::new(chunk_bytes);
        let mut blender = ContinuityBlender::new(self.config.audio.overlap_samples);
        let gate = EnergyGate::new(self.config.continuous.vad_threshold);
        let mut buf = vec![0u8; chunk_bytes];

        loop {
            let n = self.read_some(&mut buf, read_timeout, max_idle).await?;
            if n == 0 {
                // Peer closed; any partial frame in the assembler is dropped.
                debug!(conn_id = %self.conn_id, pending = assembler.pending(), "peer closed stream");
                return Ok(());
            }

            for frame in assembler.feed(&buf[..n]) {
                let samples = pcm::samples_from_bytes(&frame);
                let floats = match gate.classify(&samples) {
                    // Bypass: silence passes through untouched, no model cost.
                    Activity::Silence => pcm::to_float(&samples),
                    Activity::Speech => self.invoker.convert_frame(&frame, chunk_samples).await?,
                };

                if let Some(blended) = blender.push(floats) {
                    let out = pcm::bytes_from_samples(&pcm::quantize(&blended));
                    self.stream.write_all(&out).await?;
                }
            }
        }
    }

    /// Utterance mode: length-prefixed request/response round trips. The
    /// connection survives silent and failed utterances; only transport
    /// faults, malformed framing, and idle exhaustion end it.
    async fn run_utterance(&mut self) -> Result<()> {
        let sample_rate = self.config.audio.sample_rate;
        let read_timeout = Duration::from_millis(self.config.utterance.read_timeout_ms);
        let max_idle = self.config.utterance.max_idle_timeouts;
        let max_request = self.config.utterance.max_frames(sample_rate)
            * self.config.utterance.frame_bytes;

        loop {
            let declared = match self.read_request_len(read_timeout, max_idle).await? {
                None => {
                    debug!(conn_id = %self.conn_id, "peer closed between utterances");
                    return Ok(());
                }
                Some(len) => len as usize,
            };

            if declared == 0 {
                // Zero-length requests are still answered so the peer never hangs.
                self.write_response(&[]).await?;
                continue;
            }
            if declared > max_request {
                warn!(conn_id = %self.conn_id, declared, max_request, "request exceeds utterance cap");
                return Err(VoxError::MalformedFrameLength {
                    declared,
                    received: 0,
                });
            }

            let mut payload = vec![0u8; declared];
            self.read_exact_idle(&mut payload, read_timeout, max_idle).await?;
            debug!(conn_id = %self.conn_id, bytes = declared, "utterance received");

            if self.invoker.gate_utterance(&payload, sample_rate).await == Activity::Silence {
                // Skip sentinel: tell the peer not to play anything.
                debug!(conn_id = %self.conn_id, "no speech detected, sending skip sentinel");
                self.write_response(&[]).await?;
                continue;
            }

            match self.invoker.convert_utterance(&payload).await {
                Ok(converted) => {
                    debug!(conn_id = %self.conn_id, bytes = converted.len(), "utterance converted");
                    self.write_response(&converted).await?;
                }
                Err(e) if e.utterance_recoverable() => {
                    warn!(conn_id = %self.conn_id, %e, "conversion failed, answering with skip sentinel");
                    self.write_response(&[]).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the 4-byte big-endian request length. `None` means the peer
    /// closed cleanly at a request boundary; closing mid-header is
    /// malformed framing.
    async fn read_request_len(
        &mut self,
        read_timeout: Duration,
        max_idle: u32,
    ) -> Result<Option<u32>> {
        let mut header = [0u8; 4];
        let mut filled = 0;

        while filled < header.len() {
            let n = self
                .read_some(&mut header[filled..], read_timeout, max_idle)
                .await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(VoxError::MalformedFrameLength {
                    declared: header.len(),
                    received: filled,
                });
            }
            filled += n;
        }

        Ok(Some(u32::from_be_bytes(header)))
    }

    /// Fill `buf` completely; a peer close before that is malformed framing
    /// for the declared length.
    async fn read_exact_idle(
        &mut self,
        buf: &mut [u8],
        read_timeout: Duration,
        max_idle: u32,
    ) -> Result<()> {
        let declared = buf.len();
        let mut filled = 0;

        while filled < declared {
            let n = self
                .read_some(&mut buf[filled..], read_timeout, max_idle)
                .await?;
            if n == 0 {
                return Err(VoxError::MalformedFrameLength {
                    declared,
                    received: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// One bounded read. Consecutive timeouts accumulate towards the idle
    /// budget; any received data resets it. Returns 0 on peer close.
    async fn read_some(
        &mut self,
        buf: &mut [u8],
        read_timeout: Duration,
        max_idle: u32,
    ) -> Result<usize> {
        let mut idle = 0u32;
        loop {
            match timeout(read_timeout, self.stream.read(buf)).await {
                Ok(result) => return result.map_err(VoxError::from),
                Err(_elapsed) => {
                    idle += 1;
                    if idle >= max_idle {
                        return Err(VoxError::IdleTimeout { timeouts: idle });
                    }
                }
            }
        }
    }

    /// Length-prefixed response; an empty body is the skip sentinel.
    async fn write_response(&mut self, body: &[u8]) -> Result<()> {
        self.stream.write_all(&(body.len() as u32).to_be_bytes()).await?;
        if !body.is_empty() {
            self.stream.write_all(body).await?;
        }
        Ok(())
    }
}
