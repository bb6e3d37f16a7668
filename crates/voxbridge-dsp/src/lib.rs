//! Stream DSP primitives — framing, crossfade continuity, activity gating,
//! utterance endpointing.

pub mod assembler;
pub mod crossfade;
pub mod endpoint;
pub mod gate;
pub mod resample;
