use std::sync::Arc;

use tracing::{error, info};

use crate::backend::messages::non_empty;
use crate::backend::{MoodBackend, VoicePayload};
use crate::playback::AudioPlayer;
use crate::session::{ChatTurn, SessionStore};

pub const CHAT_FALLBACK: &str = "Sorry, I'm having trouble connecting to the server.";
pub const VOICE_FALLBACK: &str = "Sorry, there was a problem processing your voice.";
pub const HISTORY_FAILED: &str = "Could not load mood history.";

/// Sends text and voice messages and applies replies to the session store.
///
/// Never touches capture devices. Every store update happens after the full response
/// has been received.
#[derive(Clone)]
pub struct ConversationController {
    backend: Arc<dyn MoodBackend>,
    player: Arc<dyn AudioPlayer>,
    store: SessionStore,
}

impl ConversationController {
    pub fn new(
        backend: Arc<dyn MoodBackend>,
        player: Arc<dyn AudioPlayer>,
        store: SessionStore,
    ) -> Self {
        Self {
            backend,
            player,
            store,
        }
    }

    /// Send a text message. Blank input is ignored and no request is made.
    pub async fn send_text(&self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        self.store.append_turn(ChatTurn::user(message));
        self.store.begin_pending();

        let result = self.backend.chat(message).await;
        self.store.end_pending();

        match result {
            Ok(reply) => {
                let audio = non_empty(reply.audio.as_deref()).map(str::to_string);
                self.store
                    .append_turn(ChatTurn::bot(reply.response, audio.clone()));
                self.store.set_last_audio_url(audio);
            }
            Err(e) => {
                error!("Chat error: {}", e);
                self.store.append_turn(ChatTurn::bot(CHAT_FALLBACK, None));
            }
        }
    }

    /// Send a finalized recording
    pub async fn send_voice(&self, payload: VoicePayload) {
        match self.backend.voice_chat(payload).await {
            Ok(reply) => {
                if let Some(transcript) = non_empty(reply.transcript.as_deref()) {
                    self.store.append_turn(ChatTurn::user(transcript));
                }

                let audio = non_empty(reply.audio.as_deref()).map(str::to_string);
                self.store
                    .append_turn(ChatTurn::bot(reply.response, audio.clone()));
                if audio.is_some() {
                    self.store.set_last_audio_url(audio);
                }
            }
            Err(e) => {
                error!("Voice chat error: {}", e);
                self.voice_failed();
            }
        }
    }

    /// Show the voice fallback turn without a request (e.g. the recording could not be encoded)
    pub(crate) fn voice_failed(&self) {
        self.store.append_turn(ChatTurn::bot(VOICE_FALLBACK, None));
    }

    /// Show or hide the mood history. Only showing it touches the network.
    pub async fn toggle_history(&self) {
        if self.store.history_visible() {
            self.store.set_history_visible(false);
        } else {
            self.fetch_history().await;
        }
    }

    /// Fetch the mood log and replace the displayed rows
    pub async fn fetch_history(&self) {
        match self.backend.mood_log().await {
            Ok(rows) => {
                info!("Loaded {} mood history rows", rows.len());
                self.store.replace_history(rows);
                self.store.set_history_visible(true);
            }
            Err(e) => {
                error!("Mood history error: {}", e);
                self.store.notify(HISTORY_FAILED);
            }
        }
    }

    /// Hand the last reply audio to the player. Returns whether anything was played.
    pub fn play_last_audio(&self) -> bool {
        match self.store.last_audio_url() {
            Some(url) => {
                self.player.play(&url);
                true
            }
            None => false,
        }
    }
}
