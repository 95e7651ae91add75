// Shared fakes for integration tests
//
// ScriptedDevices stands in for the platform camera and microphone, ScriptedBackend for
// the remote service, RecordingPlayer for audio playback.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moodchat_client::backend::{ChatReply, MoodLogEntry, MoodReading, VoicePayload, VoiceReply};
use moodchat_client::capture::{
    AudioFrame, CameraStream, DetectionSample, DeviceKind, DeviceStream, FrameFormat,
    MediaDevices, MicrophoneStream,
};
use moodchat_client::{
    AudioPlayer, BackendError, CaptureError, MoodBackend, Session, SessionConfig, StalePolicy,
};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Devices
// ============================================================================

#[derive(Default)]
pub struct DeviceCounters {
    pub camera_opens: AtomicUsize,
    pub camera_stops: AtomicUsize,
    pub microphone_opens: AtomicUsize,
    pub microphone_stops: AtomicUsize,
    pub frames_grabbed: AtomicUsize,
}

pub struct ScriptedDevices {
    pub counters: Arc<DeviceCounters>,
    pub camera_error: Option<CaptureError>,
    pub microphone_error: Option<CaptureError>,
    /// Grab numbers (0-based) that fail
    pub failing_grabs: Vec<usize>,
    /// Grab numbers (0-based) that panic inside the camera driver
    pub panicking_grabs: Vec<usize>,
    /// The microphone driver panics when stopped
    pub microphone_panics_on_stop: bool,
    /// Fragments the microphone emits as soon as it starts
    pub microphone_fragments: Vec<AudioFrame>,
    pub recording_supported: bool,
}

impl ScriptedDevices {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(DeviceCounters::default()),
            camera_error: None,
            microphone_error: None,
            failing_grabs: Vec::new(),
            panicking_grabs: Vec::new(),
            microphone_panics_on_stop: false,
            microphone_fragments: vec![fragment(1, 0), fragment(2, 100), fragment(3, 200)],
            recording_supported: true,
        }
    }
}

pub fn fragment(value: i16, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 160],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

#[async_trait::async_trait]
impl MediaDevices for ScriptedDevices {
    async fn open(&self, kind: DeviceKind) -> Result<DeviceStream, CaptureError> {
        match kind {
            DeviceKind::Camera => {
                self.counters.camera_opens.fetch_add(1, Ordering::SeqCst);
                if let Some(err) = &self.camera_error {
                    return Err(err.clone());
                }
                Ok(DeviceStream::Camera(Box::new(FakeCamera {
                    counters: Arc::clone(&self.counters),
                    failing_grabs: self.failing_grabs.clone(),
                    panicking_grabs: self.panicking_grabs.clone(),
                    stopped: false,
                })))
            }
            DeviceKind::Microphone => {
                self.counters.microphone_opens.fetch_add(1, Ordering::SeqCst);
                if let Some(err) = &self.microphone_error {
                    return Err(err.clone());
                }
                Ok(DeviceStream::Microphone(Box::new(FakeMicrophone {
                    counters: Arc::clone(&self.counters),
                    fragments: self.microphone_fragments.clone(),
                    panic_on_stop: self.microphone_panics_on_stop,
                    tx: None,
                    stopped: false,
                })))
            }
        }
    }

    fn supports_recording(&self) -> bool {
        self.recording_supported
    }

    fn name(&self) -> &str {
        "scripted devices"
    }
}

struct FakeCamera {
    counters: Arc<DeviceCounters>,
    failing_grabs: Vec<usize>,
    panicking_grabs: Vec<usize>,
    stopped: bool,
}

#[async_trait::async_trait]
impl CameraStream for FakeCamera {
    async fn grab_frame(&mut self) -> Result<DetectionSample, CaptureError> {
        let n = self.counters.frames_grabbed.fetch_add(1, Ordering::SeqCst);
        if self.panicking_grabs.contains(&n) {
            panic!("camera driver crashed on grab {}", n);
        }
        if self.failing_grabs.contains(&n) {
            return Err(CaptureError::Capture(format!("grab {} failed", n)));
        }
        Ok(DetectionSample {
            data: vec![n as u8],
            format: FrameFormat::Jpeg,
        })
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.camera_stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeMicrophone {
    counters: Arc<DeviceCounters>,
    fragments: Vec<AudioFrame>,
    panic_on_stop: bool,
    tx: Option<mpsc::Sender<AudioFrame>>,
    stopped: bool,
}

#[async_trait::async_trait]
impl MicrophoneStream for FakeMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let (tx, rx) = mpsc::channel(64);
        for fragment in &self.fragments {
            tx.try_send(fragment.clone())
                .map_err(|e| CaptureError::Capture(e.to_string()))?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.tx = None;
        if !self.stopped {
            self.stopped = true;
            self.counters.microphone_stops.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_stop {
                panic!("microphone driver crashed while stopping");
            }
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

pub fn server_error(endpoint: &'static str) -> BackendError {
    BackendError::Status {
        endpoint,
        status: 500,
    }
}

pub fn reading(mood: &str) -> MoodReading {
    MoodReading {
        mood: mood.to_string(),
        suggestion: Some(format!("{} suggestion", mood)),
    }
}

/// A detect-mood request waiting for the test to answer it
pub struct PendingDetection {
    pub frame: u8,
    pub respond: oneshot::Sender<Result<MoodReading, BackendError>>,
}

#[derive(Default)]
pub struct BackendCalls {
    pub detect: AtomicUsize,
    pub chat: AtomicUsize,
    pub voice: AtomicUsize,
    pub mood_log: AtomicUsize,
}

pub struct ScriptedBackend {
    pub calls: Arc<BackendCalls>,
    chat_replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    voice_reply: Mutex<Option<Result<VoiceReply, BackendError>>>,
    mood_log: Mutex<Option<Result<Vec<MoodLogEntry>, BackendError>>>,
    pub voice_payloads: Mutex<Vec<VoicePayload>>,
    /// When set, detect-mood requests are handed to the test instead of answered
    detect_gate: Option<mpsc::UnboundedSender<PendingDetection>>,
    detect_fails: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(BackendCalls::default()),
            chat_replies: Mutex::new(VecDeque::new()),
            voice_reply: Mutex::new(None),
            mood_log: Mutex::new(None),
            voice_payloads: Mutex::new(Vec::new()),
            detect_gate: None,
            detect_fails: AtomicBool::new(false),
        }
    }

    /// Backend whose detect-mood answers are controlled by the returned receiver
    pub fn gated() -> (Self, mpsc::UnboundedReceiver<PendingDetection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut backend = Self::new();
        backend.detect_gate = Some(tx);
        (backend, rx)
    }

    pub fn failing_detection(self) -> Self {
        self.detect_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn push_chat(&self, reply: Result<ChatReply, BackendError>) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_voice(&self, reply: Result<VoiceReply, BackendError>) {
        *self.voice_reply.lock().unwrap() = Some(reply);
    }

    pub fn set_mood_log(&self, rows: Result<Vec<MoodLogEntry>, BackendError>) {
        *self.mood_log.lock().unwrap() = Some(rows);
    }
}

#[async_trait::async_trait]
impl MoodBackend for ScriptedBackend {
    async fn detect_mood(&self, sample: DetectionSample) -> Result<MoodReading, BackendError> {
        self.calls.detect.fetch_add(1, Ordering::SeqCst);
        let frame = sample.data.first().copied().unwrap_or_default();

        if let Some(gate) = &self.detect_gate {
            let (respond, answer) = oneshot::channel();
            gate.send(PendingDetection { frame, respond })
                .map_err(|_| server_error("/detect_mood"))?;
            return match answer.await {
                Ok(result) => result,
                // Never answered: stay in flight
                Err(_) => std::future::pending().await,
            };
        }

        if self.detect_fails.load(Ordering::SeqCst) {
            return Err(server_error("/detect_mood"));
        }
        Ok(reading("happy"))
    }

    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        self.calls.chat.fetch_add(1, Ordering::SeqCst);
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ChatReply {
                    response: format!("echo: {}", message),
                    audio: None,
                })
            })
    }

    async fn voice_chat(&self, payload: VoicePayload) -> Result<VoiceReply, BackendError> {
        self.calls.voice.fetch_add(1, Ordering::SeqCst);
        self.voice_payloads.lock().unwrap().push(payload);
        self.voice_reply.lock().unwrap().take().unwrap_or_else(|| {
            Ok(VoiceReply {
                transcript: None,
                response: "heard you".to_string(),
                audio: None,
            })
        })
    }

    async fn mood_log(&self) -> Result<Vec<MoodLogEntry>, BackendError> {
        self.calls.mood_log.fetch_add(1, Ordering::SeqCst);
        self.mood_log
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Default)]
pub struct RecordingPlayer {
    pub played: Mutex<Vec<String>>,
}

impl AudioPlayer for RecordingPlayer {
    fn play(&self, url: &str) {
        self.played.lock().unwrap().push(url.to_string());
    }
}

// ============================================================================
// Session wiring
// ============================================================================

pub fn fast_config() -> SessionConfig {
    SessionConfig {
        detection_interval: Duration::from_millis(20),
        stale_policy: StalePolicy::ApplyInArrivalOrder,
        recording_duration: Duration::from_millis(100),
        ..SessionConfig::default()
    }
}

pub struct Harness {
    pub session: Session,
    pub devices: Arc<DeviceCounters>,
    pub backend: Arc<ScriptedBackend>,
    pub player: Arc<RecordingPlayer>,
}

pub fn harness_with(
    config: SessionConfig,
    devices: ScriptedDevices,
    backend: ScriptedBackend,
) -> Harness {
    let counters = Arc::clone(&devices.counters);
    let backend = Arc::new(backend);
    let player = Arc::new(RecordingPlayer::default());

    let session = Session::new(
        config,
        Arc::new(devices),
        Arc::clone(&backend) as Arc<dyn MoodBackend>,
        Arc::clone(&player) as Arc<dyn AudioPlayer>,
    );

    Harness {
        session,
        devices: counters,
        backend,
        player,
    }
}

pub fn harness() -> Harness {
    harness_with(fast_config(), ScriptedDevices::new(), ScriptedBackend::new())
}

// ============================================================================
// Waiting helpers
// ============================================================================

/// Wait until a store slot satisfies `pred`, returning the matching value
pub async fn wait_until<T: Clone>(
    rx: &mut tokio::sync::watch::Receiver<T>,
    pred: impl Fn(&T) -> bool,
) -> T {
    let wait = async {
        loop {
            {
                let value = rx.borrow_and_update();
                if pred(&value) {
                    return value.clone();
                }
            }
            rx.changed().await.expect("store dropped");
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition not reached within 5s")
}

/// Wait until a counter reaches at least `n`
pub async fn wait_for_count(counter: &AtomicUsize, n: usize) {
    let wait = async {
        while counter.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("counter not reached within 5s");
}
