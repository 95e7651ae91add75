use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::MoodBackend;
use crate::capture::CaptureHandle;
use crate::error::CaptureError;
use crate::session::{MoodDisplay, SessionStore};

/// How responses from overlapping ticks are applied to the mood display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Whichever response arrives last wins, even if its tick was older
    #[default]
    ApplyInArrivalOrder,
    /// Responses older than the newest applied tick are dropped, as are responses
    /// arriving after detection stopped
    LatestTickWins,
}

/// Tick sequence numbers shared across detection runs
#[derive(Debug, Default)]
pub struct TickSequencer {
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl TickSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run `apply` only if `seq` is newer than everything applied so far
    fn apply_if_newer(&self, seq: u64, apply: impl FnOnce()) -> bool {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        if seq <= *applied {
            return false;
        }
        *applied = seq;
        apply();
        true
    }

    /// Mark every tick issued so far as stale
    fn invalidate(&self) {
        let issued = self.issued.load(Ordering::SeqCst);
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        *applied = (*applied).max(issued);
    }
}

/// Applies tick results to the mood slot according to the stale policy
#[derive(Clone)]
struct MoodApplier {
    store: SessionStore,
    sequencer: Arc<TickSequencer>,
    policy: StalePolicy,
}

impl MoodApplier {
    fn apply(&self, seq: u64, display: MoodDisplay) {
        match self.policy {
            StalePolicy::ApplyInArrivalOrder => self.store.set_mood(display),
            StalePolicy::LatestTickWins => {
                let store = &self.store;
                let label = display.label.clone();
                if !self
                    .sequencer
                    .apply_if_newer(seq, move || store.set_mood(display))
                {
                    debug!("Discarding stale result from tick {} ({})", seq, label);
                }
            }
        }
    }
}

/// Periodic frame capture and upload while detecting
pub struct DetectionLoop {
    interval: Duration,
    backend: Arc<dyn MoodBackend>,
    applier: MoodApplier,
}

impl DetectionLoop {
    pub fn new(
        interval: Duration,
        policy: StalePolicy,
        backend: Arc<dyn MoodBackend>,
        store: SessionStore,
        sequencer: Arc<TickSequencer>,
    ) -> Self {
        Self {
            interval,
            backend,
            applier: MoodApplier {
                store,
                sequencer,
                policy,
            },
        }
    }

    /// Start ticking with the given camera. The loop owns the handle and releases it on exit.
    pub fn spawn(self, handle: CaptureHandle) -> DetectionRun {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let exited = CancellationToken::new();
        let sequencer = Arc::clone(&self.applier.sequencer);
        let policy = self.applier.policy;

        let loop_cancel = cancel.clone();
        // Fires however the loop ends, including a panic
        let exit_guard = exited.clone().drop_guard();
        let task = tokio::spawn(async move {
            let _exit_guard = exit_guard;
            self.run(id, handle, loop_cancel).await;
        });

        DetectionRun {
            id,
            cancel,
            exited,
            task,
            sequencer,
            policy,
        }
    }

    async fn run(self, id: Uuid, mut handle: CaptureHandle, cancel: CancellationToken) {
        info!("Detection loop {} started ({:?} interval)", id, self.interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let seq = self.applier.sequencer.next();
            ticks += 1;

            let grab = async {
                match handle.camera() {
                    Some(camera) => camera.grab_frame().await,
                    None => Err(CaptureError::Capture("camera handle released".to_string())),
                }
            };
            let sample = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sample = grab => sample,
            };

            match sample {
                Ok(sample) => {
                    debug!("Tick {}: uploading {} byte frame", seq, sample.data.len());
                    let backend = Arc::clone(&self.backend);
                    let applier = self.applier.clone();
                    // Not awaited: a slow upload must not delay the next tick
                    tokio::spawn(async move {
                        match backend.detect_mood(sample).await {
                            Ok(reading) => {
                                debug!("Tick {}: mood {}", seq, reading.mood);
                                applier.apply(seq, MoodDisplay::from_reading(&reading));
                            }
                            Err(e) => {
                                error!("Mood detection failed on tick {}: {}", seq, e);
                                applier.apply(seq, MoodDisplay::status("Detection error"));
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Frame capture failed on tick {}: {}", seq, e);
                    self.applier.apply(seq, MoodDisplay::status("Detection error"));
                }
            }
        }

        handle.release();
        info!("Detection loop {} stopped after {} ticks", id, ticks);
    }
}

/// A running detection loop
pub struct DetectionRun {
    id: Uuid,
    cancel: CancellationToken,
    exited: CancellationToken,
    task: JoinHandle<()>,
    sequencer: Arc<TickSequencer>,
    policy: StalePolicy,
}

impl DetectionRun {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancelled once the loop has exited, whether stopped or crashed
    pub fn exited(&self) -> CancellationToken {
        self.exited.clone()
    }

    /// Cancel the timer and wait until the loop has exited and released the camera.
    ///
    /// Uploads already in flight are not cancelled.
    pub async fn stop(self) {
        self.cancel.cancel();

        if let Err(e) = self.task.await {
            // A panicking loop still released the camera while unwinding
            error!("Detection loop {} panicked: {}", self.id, e);
        }

        if self.policy == StalePolicy::LatestTickWins {
            self.sequencer.invalidate();
        }
    }
}
