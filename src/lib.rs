pub mod backend;
pub mod capture;
pub mod config;
pub mod conversation;
pub mod detection;
pub mod error;
pub mod http;
pub mod playback;
pub mod recording;
pub mod session;

pub use backend::{
    ChatReply, HttpBackend, MoodBackend, MoodLogEntry, MoodReading, VoicePayload, VoiceReply,
};
pub use capture::{
    AudioFrame, CaptureHandle, CaptureManager, DetectionSample, DeviceKind, DeviceStream,
    FileDevices, FrameFormat, MediaDevices,
};
pub use config::Config;
pub use conversation::{ConversationController, CHAT_FALLBACK, HISTORY_FAILED, VOICE_FALLBACK};
pub use detection::StalePolicy;
pub use error::{BackendError, CaptureError, SessionError};
pub use http::{create_router, AppState};
pub use playback::{AudioPlayer, LogPlayer};
pub use recording::RecordingSession;
pub use session::{
    ChatTurn, MoodDisplay, Notice, RecordingTask, Session, SessionConfig, SessionSnapshot,
    SessionState, SessionStore, Speaker,
};
