use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::session::RecordingSession;
use crate::capture::{AudioFrame, CaptureHandle};

/// How the capture phase of a recording ended
#[derive(Debug)]
pub enum RecordingOutcome {
    /// The timer expired; the buffered audio should be submitted
    Completed(RecordingSession),
    /// Stopped early; the audio is discarded
    Cancelled,
}

/// Buffer microphone fragments until `duration` elapses or `cancel` fires.
///
/// The handle is released before this returns, on every path.
pub async fn capture(
    id: Uuid,
    mut handle: CaptureHandle,
    mut frames: mpsc::Receiver<AudioFrame>,
    duration: Duration,
    cancel: CancellationToken,
) -> RecordingOutcome {
    let mut session = RecordingSession::new(id);
    let timer = tokio::time::sleep(duration);
    tokio::pin!(timer);
    let mut device_open = true;

    let completed = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break false,
            _ = &mut timer => break true,
            frame = frames.recv(), if device_open => match frame {
                Some(frame) => session.push(frame),
                None => {
                    info!("Recording {}: microphone closed early", id);
                    device_open = false;
                }
            },
        }
    };

    handle.release();

    // Fragments flushed by the device while stopping still belong to this recording
    while let Ok(frame) = frames.try_recv() {
        session.push(frame);
    }

    if completed {
        info!(
            "Recording {} captured {} fragments ({} samples)",
            id,
            session.chunks().len(),
            session.sample_count()
        );
        RecordingOutcome::Completed(session)
    } else {
        info!("Recording {} cancelled", id);
        RecordingOutcome::Cancelled
    }
}
