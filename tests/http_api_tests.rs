// Integration tests for the control API
//
// Requests are driven through the router directly, without binding a socket.

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{fast_config, harness, harness_with, ScriptedBackend, ScriptedDevices};
use moodchat_client::{create_router, AppState, CaptureError, DeviceKind, Session};
use serde_json::Value;
use tower::ServiceExt;

fn router(session: &Session) -> Router {
    create_router(AppState::new(session.clone()))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let h = harness();

    let (status, body) = send(router(&h.session), "GET", "/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_session_snapshot_starts_idle() -> Result<()> {
    let h = harness();

    let (status, body) = send(router(&h.session), "GET", "/session", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["mood"]["label"], "Not detecting");
    assert_eq!(body["transcript"], Value::Array(Vec::new()));
    assert_eq!(body["history_visible"], false);
    Ok(())
}

#[tokio::test]
async fn test_chat_returns_updated_transcript() -> Result<()> {
    let h = harness();

    let (status, body) = send(
        router(&h.session),
        "POST",
        "/chat",
        Some(serde_json::json!({ "message": "hello" })),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    let transcript = body["transcript"].as_array().cloned().unwrap_or_default();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["sender"], "user");
    assert_eq!(transcript[0]["text"], "hello");
    assert_eq!(transcript[1]["sender"], "bot");
    assert_eq!(transcript[1]["text"], "echo: hello");
    Ok(())
}

#[tokio::test]
async fn test_detection_toggle_and_busy_recording() -> Result<()> {
    let h = harness();

    let (status, body) = send(router(&h.session), "POST", "/detection/toggle", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "detecting");

    let (status, body) = send(router(&h.session), "POST", "/recording", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap_or_default().contains("detecting"));

    let (status, body) = send(router(&h.session), "POST", "/detection/toggle", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    Ok(())
}

#[tokio::test]
async fn test_camera_denied_is_forbidden() -> Result<()> {
    let mut devices = ScriptedDevices::new();
    devices.camera_error = Some(CaptureError::PermissionDenied(DeviceKind::Camera));
    let h = harness_with(fast_config(), devices, ScriptedBackend::new());

    let (status, _) = send(router(&h.session), "POST", "/detection/toggle", None).await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_recording_accepted_then_stopped() -> Result<()> {
    let mut config = fast_config();
    config.recording_duration = std::time::Duration::from_secs(30);
    let h = harness_with(config, ScriptedDevices::new(), ScriptedBackend::new());

    let (status, body) = send(router(&h.session), "POST", "/recording", None).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "recording");
    assert!(body["recording_id"].is_string());

    let (status, body) = send(router(&h.session), "POST", "/recording/stop", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);
    assert_eq!(body["state"], "idle");

    let (status, body) = send(router(&h.session), "POST", "/detection/toggle", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "detecting");
    Ok(())
}

#[tokio::test]
async fn test_play_audio_without_url() -> Result<()> {
    let h = harness();

    let (status, body) = send(router(&h.session), "POST", "/audio/play", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["played"], false);
    assert_eq!(body["url"], Value::Null);
    Ok(())
}
