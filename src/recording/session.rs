use std::io::Cursor;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::VoicePayload;
use crate::capture::AudioFrame;
use crate::error::SessionError;

/// Fragments buffered during one push-to-talk recording
#[derive(Debug)]
pub struct RecordingSession {
    id: Uuid,
    chunks: Vec<AudioFrame>,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            chunks: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn chunks(&self) -> &[AudioFrame] {
        &self.chunks
    }

    /// Append a fragment. Empty fragments are skipped.
    pub fn push(&mut self, frame: AudioFrame) {
        if !frame.samples.is_empty() {
            self.chunks.push(frame);
        }
    }

    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(|c| c.samples.len()).sum()
    }

    /// Encode every fragment, in arrival order, into one WAV payload.
    ///
    /// `sample_rate` and `channels` are only used when no fragment arrived. Every fragment
    /// must share the format of the first one.
    pub fn finalize(self, sample_rate: u32, channels: u16) -> Result<VoicePayload, SessionError> {
        let (sample_rate, channels) = self
            .chunks
            .first()
            .map(|c| (c.sample_rate, c.channels))
            .unwrap_or((sample_rate, channels));

        if let Some(chunk) = self
            .chunks
            .iter()
            .find(|c| c.sample_rate != sample_rate || c.channels != channels)
        {
            warn!(
                "Recording {}: fragment at {}ms is {}Hz/{}ch, expected {}Hz/{}ch",
                self.id, chunk.timestamp_ms, chunk.sample_rate, chunk.channels, sample_rate, channels
            );
            return Err(SessionError::Encode(format!(
                "fragment at {}ms changes format from {}Hz/{}ch to {}Hz/{}ch",
                chunk.timestamp_ms, sample_rate, channels, chunk.sample_rate, chunk.channels
            )));
        }

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let encode_err = |e: hound::Error| SessionError::Encode(e.to_string());

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode_err)?;
            for chunk in &self.chunks {
                for &sample in &chunk.samples {
                    writer.write_sample(sample).map_err(encode_err)?;
                }
            }
            writer.finalize().map_err(encode_err)?;
        }

        let data = cursor.into_inner();
        info!(
            "Recording {} finalized: {} fragments, {} bytes",
            self.id,
            self.chunks.len(),
            data.len()
        );

        Ok(VoicePayload {
            data,
            mime_type: "audio/wav",
            file_name: "recording.wav",
        })
    }
}
