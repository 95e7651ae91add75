//! Text and voice exchanges with the backend

mod controller;

pub use controller::{ConversationController, CHAT_FALLBACK, HISTORY_FAILED, VOICE_FALLBACK};
