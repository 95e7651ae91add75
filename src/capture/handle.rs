use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::device::{CameraStream, DeviceKind, DeviceStream, MicrophoneStream};
use super::manager::LiveHandles;

/// Exclusively held capture device.
///
/// The platform stream is stopped and cleared by [`CaptureHandle::release`], which may be
/// called any number of times. A handle that goes out of scope unreleased (early return,
/// panic unwinding a capture task) is released on drop.
pub struct CaptureHandle {
    id: Uuid,
    kind: DeviceKind,
    stream: Option<DeviceStream>,
    acquired_at: DateTime<Utc>,
    live: Arc<LiveHandles>,
}

impl CaptureHandle {
    pub(crate) fn new(stream: DeviceStream, live: Arc<LiveHandles>) -> Self {
        let kind = stream.kind();
        live.increment(kind);

        Self {
            id: Uuid::new_v4(),
            kind,
            stream: Some(stream),
            acquired_at: Utc::now(),
            live,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }

    /// Camera stream, if this handle holds a live camera
    pub fn camera(&mut self) -> Option<&mut dyn CameraStream> {
        match self.stream.as_mut() {
            Some(DeviceStream::Camera(stream)) => Some(stream.as_mut()),
            _ => None,
        }
    }

    /// Microphone stream, if this handle holds a live microphone
    pub fn microphone(&mut self) -> Option<&mut dyn MicrophoneStream> {
        match self.stream.as_mut() {
            Some(DeviceStream::Microphone(stream)) => Some(stream.as_mut()),
            _ => None,
        }
    }

    /// Stop the stream and clear the reference. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // The stream is gone once taken, even if stopping it panics
            self.live.decrement(self.kind);
            stream.stop();
            debug!(
                "Released {} handle {} (held {}ms)",
                self.kind,
                self.id,
                Utc::now()
                    .signed_duration_since(self.acquired_at)
                    .num_milliseconds()
            );
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("{} handle {} dropped while live; releasing", self.kind, self.id);
            self.release();
        }
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("released", &self.is_released())
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
