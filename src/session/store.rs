//! Observable session state.
//!
//! Every slot is a `watch` channel so a presentation layer can either poll the current
//! value or subscribe to changes. Blocking alerts go out on a broadcast channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::state::SessionState;
use crate::backend::{MoodLogEntry, MoodReading};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Bot,
}

/// One message in the transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub sender: Speaker,
    pub text: String,
    pub audio_url: Option<String>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Speaker::User,
            text: text.into(),
            audio_url: None,
        }
    }

    pub fn bot(text: impl Into<String>, audio_url: Option<String>) -> Self {
        Self {
            sender: Speaker::Bot,
            text: text.into(),
            audio_url,
        }
    }
}

/// What the mood panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodDisplay {
    pub label: String,
    /// Style class, `mood-<mood>`; absent for status messages
    pub mood_class: Option<String>,
    pub suggestion: String,
}

impl MoodDisplay {
    pub fn from_reading(reading: &MoodReading) -> Self {
        let mood = reading.mood.trim();
        let mut chars = mood.chars();
        let label = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };

        Self {
            label,
            mood_class: Some(format!("mood-{}", mood.to_lowercase())),
            suggestion: reading.suggestion.clone().unwrap_or_default(),
        }
    }

    pub fn status(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mood_class: None,
            suggestion: String::new(),
        }
    }
}

impl Default for MoodDisplay {
    fn default() -> Self {
        Self::status("Not detecting")
    }
}

/// A blocking alert for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub message: String,
}

/// Point-in-time copy of every slot
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub mood: MoodDisplay,
    pub transcript: Vec<ChatTurn>,
    pub pending_replies: usize,
    pub last_audio_url: Option<String>,
    pub history_visible: bool,
    pub history: Vec<MoodLogEntry>,
}

struct Slots {
    state: watch::Sender<SessionState>,
    mood: watch::Sender<MoodDisplay>,
    transcript: watch::Sender<Vec<ChatTurn>>,
    pending: watch::Sender<usize>,
    last_audio_url: watch::Sender<Option<String>>,
    history_visible: watch::Sender<bool>,
    history: watch::Sender<Vec<MoodLogEntry>>,
    notices: broadcast::Sender<Notice>,
}

/// Shared session state, cheap to clone
#[derive(Clone)]
pub struct SessionStore {
    slots: Arc<Slots>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(16);

        Self {
            slots: Arc::new(Slots {
                state: watch::Sender::new(SessionState::Idle),
                mood: watch::Sender::new(MoodDisplay::default()),
                transcript: watch::Sender::new(Vec::new()),
                pending: watch::Sender::new(0),
                last_audio_url: watch::Sender::new(None),
                history_visible: watch::Sender::new(false),
                history: watch::Sender::new(Vec::new()),
                notices,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.slots.state.borrow()
    }

    pub fn mood(&self) -> MoodDisplay {
        self.slots.mood.borrow().clone()
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.slots.transcript.borrow().clone()
    }

    pub fn pending_replies(&self) -> usize {
        *self.slots.pending.borrow()
    }

    pub fn last_audio_url(&self) -> Option<String> {
        self.slots.last_audio_url.borrow().clone()
    }

    pub fn history_visible(&self) -> bool {
        *self.slots.history_visible.borrow()
    }

    pub fn history(&self) -> Vec<MoodLogEntry> {
        self.slots.history.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            mood: self.mood(),
            transcript: self.transcript(),
            pending_replies: self.pending_replies(),
            last_audio_url: self.last_audio_url(),
            history_visible: self.history_visible(),
            history: self.history(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.slots.state.subscribe()
    }

    pub fn subscribe_mood(&self) -> watch::Receiver<MoodDisplay> {
        self.slots.mood.subscribe()
    }

    pub fn subscribe_transcript(&self) -> watch::Receiver<Vec<ChatTurn>> {
        self.slots.transcript.subscribe()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<usize> {
        self.slots.pending.subscribe()
    }

    pub fn subscribe_last_audio_url(&self) -> watch::Receiver<Option<String>> {
        self.slots.last_audio_url.subscribe()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Vec<MoodLogEntry>> {
        self.slots.history.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.slots.notices.subscribe()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let previous = self.slots.state.send_replace(state);
        debug!("Session state {} -> {}", previous, state);
    }

    pub(crate) fn set_mood(&self, mood: MoodDisplay) {
        self.slots.mood.send_replace(mood);
    }

    pub(crate) fn append_turn(&self, turn: ChatTurn) {
        self.slots.transcript.send_modify(|turns| turns.push(turn));
    }

    pub(crate) fn begin_pending(&self) {
        self.slots.pending.send_modify(|n| *n += 1);
    }

    pub(crate) fn end_pending(&self) {
        self.slots.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub(crate) fn set_last_audio_url(&self, url: Option<String>) {
        self.slots.last_audio_url.send_replace(url);
    }

    pub(crate) fn set_history_visible(&self, visible: bool) {
        self.slots.history_visible.send_replace(visible);
    }

    pub(crate) fn replace_history(&self, rows: Vec<MoodLogEntry>) {
        self.slots.history.send_replace(rows);
    }

    pub(crate) fn notify(&self, message: impl Into<String>) {
        let notice = Notice {
            message: message.into(),
        };
        warn!("Notice: {}", notice.message);
        // No subscribers just means nobody is showing alerts
        let _ = self.slots.notices.send(notice);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
