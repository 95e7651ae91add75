pub mod client;
pub mod messages;

pub use client::{HttpBackend, MoodBackend};
pub use messages::{ChatReply, MoodLogEntry, MoodReading, VoicePayload, VoiceReply};
