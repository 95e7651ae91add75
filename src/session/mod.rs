//! Session management
//!
//! This module provides the `Session` state machine that manages:
//! - Mode transitions (idle, detecting, recording) and their mutual exclusion
//! - Capture device ownership for each mode
//! - The observable store read by the presentation layer

mod config;
mod orchestrator;
mod state;
mod store;

pub use config::SessionConfig;
pub use orchestrator::{RecordingTask, Session};
pub use state::SessionState;
pub use store::{ChatTurn, MoodDisplay, Notice, SessionSnapshot, SessionStore, Speaker};
