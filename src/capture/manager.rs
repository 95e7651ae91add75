use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, info};

use super::device::{DeviceKind, MediaDevices};
use super::handle::CaptureHandle;
use crate::error::CaptureError;

/// Live handle counters, shared with every handle the manager hands out
#[derive(Debug, Default)]
pub(crate) struct LiveHandles {
    camera: AtomicUsize,
    microphone: AtomicUsize,
}

impl LiveHandles {
    fn counter(&self, kind: DeviceKind) -> &AtomicUsize {
        match kind {
            DeviceKind::Camera => &self.camera,
            DeviceKind::Microphone => &self.microphone,
        }
    }

    pub(crate) fn increment(&self, kind: DeviceKind) {
        self.counter(kind).fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn decrement(&self, kind: DeviceKind) {
        self.counter(kind).fetch_sub(1, Ordering::SeqCst);
    }

    fn get(&self, kind: DeviceKind) -> usize {
        self.counter(kind).load(Ordering::SeqCst)
    }
}

/// Hands out exclusive capture handles.
///
/// Single ownership per kind is guaranteed by the session's mode exclusion; the manager
/// does not re-check it.
#[derive(Clone)]
pub struct CaptureManager {
    devices: Arc<dyn MediaDevices>,
    live: Arc<LiveHandles>,
}

impl CaptureManager {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            live: Arc::new(LiveHandles::default()),
        }
    }

    /// Request exclusive access to a device
    pub async fn acquire(&self, kind: DeviceKind) -> Result<CaptureHandle, CaptureError> {
        info!("Requesting {} from {}", kind, self.devices.name());

        let stream = self.devices.open(kind).await.map_err(|e| {
            error!("Failed to acquire {}: {}", kind, e);
            e
        })?;

        let handle = CaptureHandle::new(stream, Arc::clone(&self.live));
        info!("Acquired {} handle {}", kind, handle.id());

        Ok(handle)
    }

    /// Release a handle. Idempotent.
    pub fn release(&self, handle: &mut CaptureHandle) {
        handle.release();
    }

    pub fn supports_recording(&self) -> bool {
        self.devices.supports_recording()
    }

    pub fn live_handles(&self, kind: DeviceKind) -> usize {
        self.live.get(kind)
    }

    pub fn total_live_handles(&self) -> usize {
        self.live.get(DeviceKind::Camera) + self.live.get(DeviceKind::Microphone)
    }
}
