use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::detection::StalePolicy;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    pub devices: DevicesConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the mood/chat backend (e.g. "http://127.0.0.1:5000")
    pub base_url: String,
    /// Optional request timeout; unset means the client default
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub interval_ms: u64,
    pub stale_policy: StalePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            stale_policy: StalePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            duration_ms: 3000,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// File-backed capture devices used by the binary
#[derive(Debug, Deserialize)]
pub struct DevicesConfig {
    /// Still image served by the camera on every tick
    pub camera_image: String,
    /// WAV file replayed by the microphone
    pub microphone_wav: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MOODCHAT").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.detection.interval_ms == 0 {
            bail!("detection.interval_ms must be greater than zero");
        }
        if self.recording.duration_ms == 0 {
            bail!("recording.duration_ms must be greater than zero");
        }
        if self.recording.sample_rate == 0 || self.recording.channels == 0 {
            bail!("recording.sample_rate and recording.channels must be greater than zero");
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            detection_interval: Duration::from_millis(self.detection.interval_ms),
            stale_policy: self.detection.stale_policy,
            recording_duration: Duration::from_millis(self.recording.duration_ms),
            sample_rate: self.recording.sample_rate,
            channels: self.recording.channels,
        }
    }
}
