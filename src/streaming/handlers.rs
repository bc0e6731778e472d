use crate::analyzer::codec::{frame_from_jpeg, jpeg_bytes};
use crate::classifier::ModeId;
use crate::error::{AnalysisError, FitcamError};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::server::ServerState;

/// Uploads smaller than this on either side are rejected
const MIN_UPLOAD_DIMENSION: u32 = 10;

const FEEDBACK_HEADER: &str = "x-feedback";

/// `?mode=` query; a missing mode means squat
#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    mode: Option<String>,
}

impl ModeQuery {
    fn mode(&self) -> Result<ModeId, FitcamError> {
        match self.mode.as_deref() {
            None => Ok(ModeId::Squat),
            Some(mode) => mode.parse(),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn squat_feed_handler(State(state): State<ServerState>) -> Response {
    mode_feed(state, ModeId::Squat).await
}

pub async fn jump_feed_handler(State(state): State<ServerState>) -> Response {
    mode_feed(state, ModeId::Jump).await
}

/// Activate `mode` on the camera and stream its annotated frames as MJPEG.
///
/// The stream ends once another mode takes the camera, the arbiter stops or
/// the server shuts down.
async fn mode_feed(state: ServerState, mode: ModeId) -> Response {
    if !state.arbiter.activate(mode).await {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Camera unavailable for {} mode", mode),
        );
    }
    info!("New {} feed client connected", mode);

    let stream = async_stream::stream! {
        let mut frame_interval = interval(state.target_frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_sent: Option<(u64, Bytes)> = None;
        let mut frames_streamed = 0u64;

        loop {
            frame_interval.tick().await;

            if state.shutdown.is_cancelled() {
                debug!("{} feed closing for shutdown", mode);
                break;
            }
            if state.arbiter.active_mode() != Some(mode) {
                info!("{} feed ended after {} frames", mode, frames_streamed);
                break;
            }

            let Some(frame) = state.arbiter.latest_frame() else {
                trace!("No {} frame available yet", mode);
                continue;
            };

            let cached = last_sent
                .as_ref()
                .filter(|(id, _)| *id == frame.id)
                .map(|(_, jpeg)| jpeg.clone());
            let jpeg = match cached {
                Some(jpeg) => jpeg,
                None => {
                    let frame_id = frame.id;
                    match tokio::task::spawn_blocking(move || jpeg_bytes(&frame)).await {
                        Ok(Ok(data)) => {
                            let jpeg = Bytes::from(data.as_ref().clone());
                            last_sent = Some((frame_id, jpeg.clone()));
                            jpeg
                        }
                        Ok(Err(e)) => {
                            error!("Failed to encode {} frame {}: {}", mode, frame_id, e);
                            continue;
                        }
                        Err(e) => {
                            error!("Encoding task for {} frame {} failed: {}", mode, frame_id, e);
                            continue;
                        }
                    }
                }
            };

            frames_streamed += 1;
            yield Ok::<_, axum::Error>(Bytes::from_static(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
            yield Ok(jpeg);
            yield Ok(Bytes::from_static(b"\r\n"));
        }
    };

    (
        [
            (header::CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame"),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Analyse one uploaded JPEG with the mode's accumulated session.
///
/// Responds with the annotated JPEG and the classifier feedback in the
/// `X-Feedback` header.
pub async fn process_frame_handler(
    State(state): State<ServerState>,
    Query(query): Query<ModeQuery>,
    body: Bytes,
) -> Response {
    let mode = match query.mode() {
        Ok(mode) => mode,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No image data");
    }

    let id = state.uploads.fetch_add(1, Ordering::Relaxed);
    let frame = match frame_from_jpeg(id, body.to_vec()) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Rejected {} upload {}: {}", mode, id, e);
            return error_response(StatusCode::BAD_REQUEST, format!("Failed to decode image: {}", e));
        }
    };
    if frame.width < MIN_UPLOAD_DIMENSION || frame.height < MIN_UPLOAD_DIMENSION {
        return error_response(StatusCode::BAD_REQUEST, "Image too small");
    }

    let sessions = Arc::clone(&state.sessions);
    let result = tokio::task::spawn_blocking(move || {
        let analyzed = sessions.process_one(mode, &frame)?;
        let jpeg = jpeg_bytes(&analyzed.frame)?;
        Ok::<_, AnalysisError>((jpeg, analyzed.feedback))
    })
    .await;

    match result {
        Ok(Ok((jpeg, feedback))) => {
            let feedback = feedback.unwrap_or_default();
            let feedback = HeaderValue::from_str(&feedback).unwrap_or_else(|_| {
                warn!("Feedback {:?} is not a valid header value", feedback);
                HeaderValue::from_static("")
            });
            (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
                    (HeaderName::from_static(FEEDBACK_HEADER), feedback),
                ],
                Body::from(jpeg.as_ref().clone()),
            )
                .into_response()
        }
        Ok(Err(e)) => {
            error!("Processing {} upload {} failed: {}", mode, id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Processing task for {} upload {} failed: {}", mode, id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed")
        }
    }
}

/// Clear the counters of one upload session
pub async fn reset_analyzer_handler(
    State(state): State<ServerState>,
    Query(query): Query<ModeQuery>,
) -> Response {
    match query.mode() {
        Ok(mode) => {
            state.sessions.reset(mode);
            Json(serde_json::json!({ "status": "ok" })).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Release the camera
pub async fn stop_handler(State(state): State<ServerState>) -> impl IntoResponse {
    state.arbiter.stop().await;
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health_info = serde_json::json!({
        "status": "healthy",
        "camera_running": state.arbiter.is_running(),
        "analyzer_type": state.arbiter.active_mode().map(|mode| mode.as_str()),
        "frames_published": state.arbiter.frames_published(),
        "upload_sessions": state
            .sessions
            .modes()
            .iter()
            .map(|mode| mode.as_str())
            .collect::<Vec<_>>(),
    });

    (StatusCode::OK, Json(health_info))
}

/// Minimal page with both live feeds
pub async fn index_handler() -> impl IntoResponse {
    Html(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Fitcam</title>
    <style>
        :root { color-scheme: dark; }
        body {
            margin: 0;
            background: #000;
            color: #eee;
            font-family: sans-serif;
            text-align: center;
        }
        nav a { color: #8cf; margin: 0 1em; }
        img.stream {
            display: block;
            margin: 1em auto;
            max-width: 100vw;
            max-height: 85vh;
            object-fit: contain;
            background: #000;
        }
    </style>
</head>
<body>
    <nav>
        <a href="#" onclick="show('/squat_feed')">Squat</a>
        <a href="#" onclick="show('/jump_feed')">Jump</a>
        <a href="#" onclick="fetch('/stop', {method: 'POST'}); show('')">Stop</a>
    </nav>
    <img id="feed" class="stream" alt="Fitcam feed">
    <script>
        function show(src) { document.getElementById('feed').src = src; }
    </script>
</body>
</html>
"##,
    )
}
