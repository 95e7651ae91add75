use serde::{Deserialize, Serialize};

/// Response from `POST /detect_mood`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodReading {
    pub mood: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Response from `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// URL of the synthesized reply; the backend sends "" when synthesis failed
    #[serde(default)]
    pub audio: Option<String>,
}

/// Response from `POST /voice_chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceReply {
    /// What the backend recognised from the uploaded audio
    #[serde(default)]
    pub transcript: Option<String>,
    pub response: String,
    #[serde(default)]
    pub audio: Option<String>,
}

/// One row of `GET /mood_log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodLogEntry {
    pub time: String,
    pub mood: String,
}

/// Finalized recording, ready for upload
#[derive(Debug, Clone)]
pub struct VoicePayload {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: &'static str,
}

/// Treat missing and empty strings alike
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
