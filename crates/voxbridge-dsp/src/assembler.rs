//! Byte stream to fixed-size frame assembly.

/// Accumulates raw socket bytes and yields complete fixed-size frames.
///
/// Frames come out in arrival order, never split or reordered. Whatever is
/// left when the peer closes stays in the internal buffer and is dropped
/// with the assembler — a useful frame is exactly one chunk long, so a
/// trailing partial frame is never emitted.
pub struct FrameAssembler {
    frame_bytes: usize,
    buffer: Vec<u8>,
}

impl FrameAssembler {
    pub fn new(frame_bytes: usize) -> Self {
        Self {
            frame_bytes,
            buffer: Vec::with_capacity(frame_bytes * 2),
        }
    }

    /// Append incoming bytes and pull out every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while self.buffer.len() >= self.frame_bytes {
            let frame: Vec<u8> = self.buffer.drain(..self.frame_bytes).collect();
            frames.push(frame);
        }
        frames
    }

    /// Bytes currently held back waiting for a full frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
