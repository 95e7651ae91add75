//! Fixed-duration push-to-talk recording

pub mod controller;
pub mod session;

pub use controller::{capture, RecordingOutcome};
pub use session::RecordingSession;
