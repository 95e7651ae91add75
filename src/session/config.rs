use std::time::Duration;

use crate::detection::StalePolicy;

/// Timing and format settings for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period between detection ticks
    /// Default: 1 second
    pub detection_interval: Duration,

    /// How overlapping detection responses are applied
    pub stale_policy: StalePolicy,

    /// Length of a push-to-talk recording
    /// Default: 3 seconds
    pub recording_duration: Duration,

    /// Sample rate used when a recording captured no fragments
    pub sample_rate: u32,

    /// Channel count used when a recording captured no fragments
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detection_interval: Duration::from_secs(1),
            stale_policy: StalePolicy::default(),
            recording_duration: Duration::from_secs(3),
            sample_rate: 16000,
            channels: 1,
        }
    }
}
