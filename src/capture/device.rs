use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Kind of capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => f.write_str("camera"),
            DeviceKind::Microphone => f.write_str("microphone"),
        }
    }
}

/// Encoding of a still frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Jpeg,
    Png,
}

impl FrameFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "image/jpeg",
            FrameFormat::Png => "image/png",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "frame.jpg",
            FrameFormat::Png => "frame.png",
        }
    }
}

/// One still frame grabbed from the camera. Uploaded once, then dropped.
#[derive(Debug, Clone)]
pub struct DetectionSample {
    pub data: Vec<u8>,
    pub format: FrameFormat,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// A granted camera stream
#[async_trait::async_trait]
pub trait CameraStream: Send {
    /// Grab the current frame
    async fn grab_frame(&mut self) -> Result<DetectionSample, CaptureError>;

    /// Stop all tracks. Must tolerate repeated calls.
    fn stop(&mut self);
}

/// A granted microphone stream
#[async_trait::async_trait]
pub trait MicrophoneStream: Send {
    /// Start recording
    ///
    /// Returns a channel receiver that will receive audio fragments in arrival order
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop recording and all tracks. Must tolerate repeated calls.
    fn stop(&mut self);
}

/// Platform stream behind a capture handle
pub enum DeviceStream {
    Camera(Box<dyn CameraStream>),
    Microphone(Box<dyn MicrophoneStream>),
}

impl DeviceStream {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceStream::Camera(_) => DeviceKind::Camera,
            DeviceStream::Microphone(_) => DeviceKind::Microphone,
        }
    }

    pub(crate) fn stop(&mut self) {
        match self {
            DeviceStream::Camera(stream) => stream.stop(),
            DeviceStream::Microphone(stream) => stream.stop(),
        }
    }
}

/// Platform media devices
///
/// Implementations:
/// - File: replays an image file and a WAV file (see `capture::file`)
/// - Tests: scripted fakes
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request access to a device, suspending until the platform grants or denies it
    async fn open(&self, kind: DeviceKind) -> Result<DeviceStream, CaptureError>;

    /// Whether the platform can record audio at all
    fn supports_recording(&self) -> bool {
        true
    }

    /// Get backend name for logging
    fn name(&self) -> &str;
}
