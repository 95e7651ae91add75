use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::messages::{ChatReply, MoodLogEntry, MoodReading, VoicePayload, VoiceReply};
use crate::capture::DetectionSample;
use crate::error::BackendError;

/// Remote mood / conversation service
#[async_trait::async_trait]
pub trait MoodBackend: Send + Sync {
    /// Classify the mood shown in one frame
    async fn detect_mood(&self, sample: DetectionSample) -> Result<MoodReading, BackendError>;

    /// Send a text message
    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError>;

    /// Send a recorded voice message
    async fn voice_chat(&self, payload: VoicePayload) -> Result<VoiceReply, BackendError>;

    /// Fetch the mood log, oldest first
    async fn mood_log(&self) -> Result<Vec<MoodLogEntry>, BackendError>;
}

/// `MoodBackend` over HTTP multipart requests
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        form: Form,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|source| BackendError::Request { endpoint, source })?;

        decode(endpoint, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| BackendError::Request { endpoint, source })?;

    debug!("{} returned {} bytes", endpoint, body.len());

    serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

fn file_part(
    endpoint: &'static str,
    data: Vec<u8>,
    file_name: &'static str,
    mime: &'static str,
) -> Result<Part, BackendError> {
    Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|source| BackendError::Request { endpoint, source })
}

#[async_trait::async_trait]
impl MoodBackend for HttpBackend {
    async fn detect_mood(&self, sample: DetectionSample) -> Result<MoodReading, BackendError> {
        let endpoint = "/detect_mood";
        let part = file_part(
            endpoint,
            sample.data,
            sample.format.file_name(),
            sample.format.mime_type(),
        )?;
        let form = Form::new().part("video_frame", part);
        self.post_form(endpoint, form).await
    }

    async fn chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        info!("Sending chat message ({} chars)", message.len());
        let form = Form::new().text("user_input", message.to_string());
        self.post_form("/chat", form).await
    }

    async fn voice_chat(&self, payload: VoicePayload) -> Result<VoiceReply, BackendError> {
        info!("Sending voice message ({} bytes)", payload.data.len());
        let endpoint = "/voice_chat";
        let part = file_part(endpoint, payload.data, payload.file_name, payload.mime_type)?;
        let form = Form::new().part("voice", part);
        self.post_form(endpoint, form).await
    }

    async fn mood_log(&self) -> Result<Vec<MoodLogEntry>, BackendError> {
        let endpoint = "/mood_log";
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|source| BackendError::Request { endpoint, source })?;

        decode(endpoint, response).await
    }
}
