pub mod device;
pub mod file;
pub mod handle;
pub mod manager;

pub use device::{
    AudioFrame, CameraStream, DetectionSample, DeviceKind, DeviceStream, FrameFormat,
    MediaDevices, MicrophoneStream,
};
pub use file::{AudioFile, FileDevices};
pub use handle::CaptureHandle;
pub use manager::CaptureManager;
