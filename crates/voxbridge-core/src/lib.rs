//! Shared types for Voxbridge — config, error taxonomy, PCM helpers.

pub mod config;
pub mod error;
pub mod pcm;

pub use error::{Result, VoxError};
