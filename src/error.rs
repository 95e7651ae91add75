//! Error types for capture, backend exchanges and session transitions.

use thiserror::Error;

use crate::capture::DeviceKind;
use crate::session::SessionState;

/// Errors raised while acquiring or reading a capture device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or platform policy) refused access to the device.
    #[error("{0} access denied")]
    PermissionDenied(DeviceKind),

    /// The platform reports no usable device of this kind.
    #[error("{kind} unavailable: {reason}")]
    DeviceUnavailable { kind: DeviceKind, reason: String },

    /// The platform lacks a required capability (e.g. audio recording).
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// Reading a frame or fragment from a held device failed.
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Failures talking to the backend. All variants count as a network failure.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint} returned a malformed body: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

/// Errors returned by session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Another mode is active; the request was rejected, not queued.
    #[error("session is busy ({active})")]
    ModeBusy { active: SessionState },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The recorded audio could not be encoded into a payload.
    #[error("failed to encode recording: {0}")]
    Encode(String),
}
