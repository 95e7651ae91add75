// File-backed capture devices
//
// The camera serves the same still image on every grab; the microphone replays a WAV
// file in real time, 100ms per fragment, looping until stopped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hound::WavReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::device::{
    AudioFrame, CameraStream, DetectionSample, DeviceKind, DeviceStream, FrameFormat,
    MediaDevices, MicrophoneStream,
};
use crate::error::CaptureError;

const FRAGMENT_MS: u64 = 100;

/// WAV file decoded for replay
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open microphone WAV {}", path.display()))?;

        let spec = reader.spec();
        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode microphone samples")?;

        let frames = samples.len() as f64 / spec.channels.max(1) as f64;
        let duration_seconds = frames / spec.sample_rate.max(1) as f64;

        debug!(
            "Replay source {}: {:.2}s at {}Hz x{}",
            path.display(),
            duration_seconds,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into fragments of `fragment_ms` each, timestamped from zero
    pub fn fragments(&self, fragment_ms: u64) -> Vec<AudioFrame> {
        let per_fragment = ((self.sample_rate as u64 * fragment_ms / 1000) as usize
            * self.channels as usize)
            .max(self.channels as usize);

        self.samples
            .chunks(per_fragment)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * fragment_ms,
            })
            .collect()
    }
}

/// Media devices backed by files on disk
pub struct FileDevices {
    camera_image: PathBuf,
    microphone_wav: PathBuf,
}

impl FileDevices {
    pub fn new(camera_image: impl Into<PathBuf>, microphone_wav: impl Into<PathBuf>) -> Self {
        Self {
            camera_image: camera_image.into(),
            microphone_wav: microphone_wav.into(),
        }
    }
}

fn unavailable(kind: DeviceKind, path: &Path, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::DeviceUnavailable {
        kind,
        reason: format!("{}: {}", path.display(), err),
    }
}

#[async_trait::async_trait]
impl MediaDevices for FileDevices {
    async fn open(&self, kind: DeviceKind) -> Result<DeviceStream, CaptureError> {
        match kind {
            DeviceKind::Camera => {
                let data = tokio::fs::read(&self.camera_image)
                    .await
                    .map_err(|e| unavailable(kind, &self.camera_image, e))?;
                let format = match self.camera_image.extension().and_then(|e| e.to_str()) {
                    Some(ext) if ext.eq_ignore_ascii_case("png") => FrameFormat::Png,
                    _ => FrameFormat::Jpeg,
                };
                Ok(DeviceStream::Camera(Box::new(FileCamera {
                    data,
                    format,
                    live: true,
                })))
            }
            DeviceKind::Microphone => {
                let path = self.microphone_wav.clone();
                let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
                    .await
                    .map_err(|e| unavailable(kind, &self.microphone_wav, e))?
                    .map_err(|e| unavailable(kind, &self.microphone_wav, e))?;
                Ok(DeviceStream::Microphone(Box::new(FileMicrophone {
                    fragments: audio.fragments(FRAGMENT_MS),
                    cancel: None,
                })))
            }
        }
    }

    fn name(&self) -> &str {
        "file devices"
    }
}

struct FileCamera {
    data: Vec<u8>,
    format: FrameFormat,
    live: bool,
}

#[async_trait::async_trait]
impl CameraStream for FileCamera {
    async fn grab_frame(&mut self) -> Result<DetectionSample, CaptureError> {
        if !self.live {
            return Err(CaptureError::Capture("camera stream stopped".to_string()));
        }
        Ok(DetectionSample {
            data: self.data.clone(),
            format: self.format,
        })
    }

    fn stop(&mut self) {
        self.live = false;
    }
}

struct FileMicrophone {
    fragments: Vec<AudioFrame>,
    cancel: Option<CancellationToken>,
}

#[async_trait::async_trait]
impl MicrophoneStream for FileMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.cancel.is_some() {
            return Err(CaptureError::Capture("already recording".to_string()));
        }
        if self.fragments.is_empty() {
            return Err(CaptureError::Capture("WAV file has no samples".to_string()));
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(64);
        let fragments = self.fragments.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(FRAGMENT_MS));
            let mut elapsed_ms = 0;
            for fragment in fragments.iter().cycle() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let mut fragment = fragment.clone();
                fragment.timestamp_ms = elapsed_ms;
                elapsed_ms += FRAGMENT_MS;
                if tx.send(fragment).await.is_err() {
                    break;
                }
            }
            debug!("File microphone replay stopped after {}ms", elapsed_ms);
        });

        self.cancel = Some(cancel);
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}
