//! TCP relay server — accept loop and per-connection session state machine.

pub mod listener;
pub mod session;

pub use listener::{run, serve};
pub use session::SessionController;
