use super::state::AppState;
use crate::error::{CaptureError, SessionError};
use crate::session::{SessionSnapshot, SessionState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub recording_id: String,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub stopped: bool,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct PlayAudioResponse {
    pub played: bool,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::ModeBusy { .. } => StatusCode::CONFLICT,
        SessionError::Capture(CaptureError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        SessionError::Capture(CaptureError::DeviceUnavailable { .. })
        | SessionError::Capture(CaptureError::UnsupportedEnvironment(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Capture(CaptureError::Capture(_)) | SessionError::Encode(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Current value of every observable slot
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.store().snapshot())
}

/// POST /detection/toggle
/// Start detection when idle, stop it when detecting
pub async fn toggle_detection(State(state): State<AppState>) -> Response {
    match state.session.toggle_detection().await {
        Ok(new_state) => {
            info!("Detection toggled, session is {}", new_state);
            (StatusCode::OK, Json(TransitionResponse { state: new_state })).into_response()
        }
        Err(e) => {
            error!("Failed to toggle detection: {}", e);
            error_response(e)
        }
    }
}

/// POST /recording
/// Start a push-to-talk recording; returns once capture is running
pub async fn start_recording(State(state): State<AppState>) -> Response {
    match state.session.request_recording().await {
        Ok(task) => {
            let recording_id = task.id().to_string();
            // The recording finishes and submits itself
            tokio::spawn(task.wait());
            (
                StatusCode::ACCEPTED,
                Json(RecordingResponse {
                    recording_id,
                    state: state.session.state(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(e)
        }
    }
}

/// POST /recording/stop
/// Cancel the active recording without sending it; responds once the session is Idle
pub async fn stop_recording(State(state): State<AppState>) -> Json<StopRecordingResponse> {
    let stopped = state.session.stop_recording().await;
    Json(StopRecordingResponse {
        stopped,
        state: state.session.state(),
    })
}

/// POST /chat
/// Send a text message and return the session once the reply is applied
pub async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Json<SessionSnapshot> {
    state.session.send_text(&req.message).await;
    Json(state.session.store().snapshot())
}

/// POST /history/toggle
/// Show (fetching the mood log) or hide the history
pub async fn toggle_history(State(state): State<AppState>) -> Json<SessionSnapshot> {
    state.session.toggle_history().await;
    Json(state.session.store().snapshot())
}

/// POST /audio/play
/// Play the last reply audio
pub async fn play_audio(State(state): State<AppState>) -> Json<PlayAudioResponse> {
    let url = state.session.store().last_audio_url();
    let played = state.session.play_last_audio();
    Json(PlayAudioResponse { played, url })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
