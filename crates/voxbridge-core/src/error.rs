use thiserror::Error;

/// Session-level error taxonomy.
///
/// Every variant is local to one session; the listener and other sessions
/// are never affected.
#[derive(Debug, Error)]
pub enum VoxError {
    /// Reset / broken-pipe class conditions. Always fatal to the session.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The connection stayed silent past the idle budget. Fatal but clean —
    /// not an error condition towards the peer.
    #[error("idle budget exhausted after {timeouts} consecutive read timeouts")]
    IdleTimeout { timeouts: u32 },

    /// The conversion engine failed, or violated its output-length contract.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The configured target-voice identifier could not be resolved.
    #[error("unknown target voice: {0}")]
    UnknownTarget(String),

    /// A length-prefixed request declared more bytes than the peer delivered
    /// before closing.
    #[error("malformed frame length: declared {declared} bytes, received {received}")]
    MalformedFrameLength { declared: usize, received: usize },

    #[error("config error: {0}")]
    Config(String),
}

impl VoxError {
    /// Whether the utterance-mode session may answer with the zero-length
    /// sentinel and keep the connection instead of closing it.
    ///
    /// Continuous mode has no recoverable errors: mid-stream ordering cannot
    /// be re-established once a conversion is lost.
    pub fn utterance_recoverable(&self) -> bool {
        matches!(self, VoxError::Conversion(_) | VoxError::UnknownTarget(_))
    }
}

pub type Result<T> = std::result::Result<T, VoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability_split() {
        assert!(VoxError::Conversion("engine died".into()).utterance_recoverable());
        assert!(VoxError::UnknownTarget("zundamon".into()).utterance_recoverable());
        assert!(!VoxError::IdleTimeout { timeouts: 5 }.utterance_recoverable());
        assert!(!VoxError::MalformedFrameLength {
            declared: 4096,
            received: 100
        }
        .utterance_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(!VoxError::from(io).utterance_recoverable());
    }
}
