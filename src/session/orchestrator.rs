use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::state::SessionState;
use super::store::{MoodDisplay, SessionStore};
use crate::backend::MoodBackend;
use crate::capture::{CaptureManager, DeviceKind, MediaDevices};
use crate::conversation::ConversationController;
use crate::detection::{DetectionLoop, DetectionRun, TickSequencer};
use crate::error::{CaptureError, SessionError};
use crate::playback::AudioPlayer;
use crate::recording::{self, RecordingOutcome};

/// Resources owned by the active mode
enum ActiveMode {
    Idle,
    Detecting(DetectionRun),
    Recording(RecordingRun),
}

impl ActiveMode {
    fn state(&self) -> SessionState {
        match self {
            ActiveMode::Idle => SessionState::Idle,
            ActiveMode::Detecting(_) => SessionState::Detecting,
            ActiveMode::Recording(_) => SessionState::Recording,
        }
    }
}

struct RecordingRun {
    id: Uuid,
    cancel: CancellationToken,
    /// Cancelled once the recording has left the active mode
    finished: CancellationToken,
}

/// Background part of a recording: capture, return to idle, submit
pub struct RecordingTask {
    id: Uuid,
    task: JoinHandle<()>,
}

impl RecordingTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait until the recording has been captured and its voice exchange has finished
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!("Recording task {} failed: {}", self.id, e);
        }
    }
}

struct SessionInner {
    config: SessionConfig,
    capture: CaptureManager,
    backend: Arc<dyn MoodBackend>,
    store: SessionStore,
    conversation: ConversationController,
    sequencer: Arc<TickSequencer>,
    mode: Mutex<ActiveMode>,
}

/// The session state machine.
///
/// Owns the active mode and its resources. Entering a mode acquires its device first;
/// leaving a mode releases devices and timers before the state reads Idle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        devices: Arc<dyn MediaDevices>,
        backend: Arc<dyn MoodBackend>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        Self::with_store(config, devices, backend, player, SessionStore::new())
    }

    /// Build a session that publishes into an existing store
    pub fn with_store(
        config: SessionConfig,
        devices: Arc<dyn MediaDevices>,
        backend: Arc<dyn MoodBackend>,
        player: Arc<dyn AudioPlayer>,
        store: SessionStore,
    ) -> Self {
        let conversation =
            ConversationController::new(Arc::clone(&backend), player, store.clone());

        Self {
            inner: Arc::new(SessionInner {
                config,
                capture: CaptureManager::new(devices),
                backend,
                store,
                conversation,
                sequencer: Arc::new(TickSequencer::new()),
                mode: Mutex::new(ActiveMode::Idle),
            }),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn capture(&self) -> &CaptureManager {
        &self.inner.capture
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.inner.conversation
    }

    pub fn state(&self) -> SessionState {
        self.inner.store.state()
    }

    /// Start detection from Idle, stop it from Detecting. Rejected while recording.
    pub async fn toggle_detection(&self) -> Result<SessionState, SessionError> {
        let mut mode = self.inner.mode.lock().await;

        match mode.state() {
            SessionState::Recording => Err(self.reject(SessionState::Recording)),
            SessionState::Detecting => {
                self.stop_detection(&mut mode).await;
                Ok(SessionState::Idle)
            }
            SessionState::Idle => {
                let handle = match self.inner.capture.acquire(DeviceKind::Camera).await {
                    Ok(handle) => handle,
                    Err(e) => {
                        error!("Error accessing webcam: {}", e);
                        self.inner
                            .store
                            .set_mood(MoodDisplay::status("Webcam access denied"));
                        return Err(e.into());
                    }
                };

                let run = DetectionLoop::new(
                    self.inner.config.detection_interval,
                    self.inner.config.stale_policy,
                    Arc::clone(&self.inner.backend),
                    self.inner.store.clone(),
                    Arc::clone(&self.inner.sequencer),
                )
                .spawn(handle);

                let id = run.id();
                let exited = run.exited();
                let session = self.clone();
                tokio::spawn(async move {
                    exited.cancelled().await;
                    session.detection_exited(id).await;
                });

                info!("Detection started ({})", id);
                *mode = ActiveMode::Detecting(run);
                self.inner.store.set_state(SessionState::Detecting);
                Ok(SessionState::Detecting)
            }
        }
    }

    /// Record one push-to-talk message. Only allowed from Idle.
    ///
    /// Returns once the microphone is capturing; the returned task completes after the
    /// recording has been submitted.
    pub async fn request_recording(&self) -> Result<RecordingTask, SessionError> {
        let mut mode = self.inner.mode.lock().await;

        let active = mode.state();
        if active != SessionState::Idle {
            return Err(self.reject(active));
        }

        if !self.inner.capture.supports_recording() {
            let err = CaptureError::UnsupportedEnvironment(
                "audio recording is not available".to_string(),
            );
            error!("{}", err);
            self.inner
                .store
                .notify("Audio recording is not supported in this environment.");
            return Err(err.into());
        }

        let mut handle = match self.inner.capture.acquire(DeviceKind::Microphone).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Error accessing microphone: {}", e);
                self.inner.store.notify("Microphone access denied.");
                return Err(e.into());
            }
        };

        let started = match handle.microphone() {
            Some(mic) => mic.start().await,
            None => Err(CaptureError::Capture(
                "handle does not hold a microphone".to_string(),
            )),
        };
        let frames = match started {
            Ok(frames) => frames,
            Err(e) => {
                handle.release();
                error!("Failed to start microphone capture: {}", e);
                self.inner.store.notify("Microphone access denied.");
                return Err(e.into());
            }
        };

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let duration = self.inner.config.recording_duration;
        let session = self.clone();
        let capture_cancel = cancel.clone();
        let finished_guard = finished.clone().drop_guard();

        let task = tokio::spawn(async move {
            // Separate task so a panic during capture still returns the session to Idle
            let capture = tokio::spawn(recording::capture(
                id,
                handle,
                frames,
                duration,
                capture_cancel,
            ));
            let outcome = match capture.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("Recording {} capture failed: {}", id, e);
                    None
                }
            };

            session.finish_recording(id).await;
            drop(finished_guard);

            match outcome {
                Some(RecordingOutcome::Completed(recording)) => {
                    let config = &session.inner.config;
                    match recording.finalize(config.sample_rate, config.channels) {
                        Ok(payload) => session.inner.conversation.send_voice(payload).await,
                        Err(e) => {
                            error!("Recording {}: {}", id, e);
                            session.inner.conversation.voice_failed();
                        }
                    }
                }
                Some(RecordingOutcome::Cancelled) => {}
                None => session.inner.conversation.voice_failed(),
            }
        });

        info!("Recording {} started ({:?})", id, duration);
        *mode = ActiveMode::Recording(RecordingRun {
            id,
            cancel,
            finished,
        });
        self.inner.store.set_state(SessionState::Recording);

        Ok(RecordingTask { id, task })
    }

    /// Cancel an active recording. The audio is discarded and nothing is sent.
    ///
    /// Returns once the microphone is released and the session is Idle, or false when no
    /// recording is active.
    pub async fn stop_recording(&self) -> bool {
        let finished = {
            let mode = self.inner.mode.lock().await;
            match &*mode {
                ActiveMode::Recording(run) => {
                    info!("Stopping recording {}", run.id);
                    run.cancel.cancel();
                    run.finished.clone()
                }
                _ => return false,
            }
        };

        // The recording task needs the mode lock to return to Idle
        finished.cancelled().await;
        true
    }

    /// Stop whatever mode is active and wait until the session is Idle
    pub async fn shutdown(&self) {
        let mut mode = self.inner.mode.lock().await;
        let active = mode.state();
        match active {
            SessionState::Detecting => self.stop_detection(&mut mode).await,
            SessionState::Recording => {
                drop(mode);
                self.stop_recording().await;
            }
            SessionState::Idle => {}
        }
    }

    /// Send a text message. See [`ConversationController::send_text`].
    pub async fn send_text(&self, message: &str) {
        self.inner.conversation.send_text(message).await;
    }

    /// Show or hide the mood history
    pub async fn toggle_history(&self) {
        self.inner.conversation.toggle_history().await;
    }

    /// Play the last reply audio, if any
    pub fn play_last_audio(&self) -> bool {
        self.inner.conversation.play_last_audio()
    }

    async fn stop_detection(&self, mode: &mut ActiveMode) {
        if let ActiveMode::Detecting(run) = std::mem::replace(mode, ActiveMode::Idle) {
            let id = run.id();
            run.stop().await;
            info!("Detection stopped ({})", id);
        }

        self.inner
            .store
            .set_mood(MoodDisplay::status("Detection stopped"));
        self.inner.store.set_state(SessionState::Idle);
    }

    /// Return to Idle when a detection loop ended without being stopped
    async fn detection_exited(&self, id: Uuid) {
        let mut mode = self.inner.mode.lock().await;
        let current = matches!(&*mode, ActiveMode::Detecting(run) if run.id() == id);
        if !current {
            debug!("Detection {} already left the active mode", id);
            return;
        }

        if let ActiveMode::Detecting(run) = std::mem::replace(&mut *mode, ActiveMode::Idle) {
            run.stop().await;
        }
        error!("Detection loop {} ended unexpectedly", id);
        self.inner
            .store
            .set_mood(MoodDisplay::status("Detection error"));
        self.inner.store.set_state(SessionState::Idle);
    }

    async fn finish_recording(&self, id: Uuid) {
        let mut mode = self.inner.mode.lock().await;
        let current = matches!(&*mode, ActiveMode::Recording(run) if run.id == id);
        if current {
            *mode = ActiveMode::Idle;
            self.inner.store.set_state(SessionState::Idle);
            info!("Recording {} finished", id);
        } else {
            debug!("Recording {} already left the active mode", id);
        }
    }

    fn reject(&self, active: SessionState) -> SessionError {
        warn!("Rejected mode change while {}", active);
        self.inner
            .store
            .notify(format!("Not available while {}.", active));
        SessionError::ModeBusy { active }
    }
}
