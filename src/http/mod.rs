//! HTTP control API for a presentation layer
//!
//! This module provides a REST API over a single session:
//! - GET /session - Snapshot of every observable slot
//! - POST /detection/toggle - Start or stop mood detection
//! - POST /recording - Start a push-to-talk recording
//! - POST /recording/stop - Cancel the active recording
//! - POST /chat - Send a text message
//! - POST /history/toggle - Show or hide the mood history
//! - POST /audio/play - Play the last reply audio
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
