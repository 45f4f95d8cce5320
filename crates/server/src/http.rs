//! HTTP Endpoints
//!
//! REST API for voice, chat, corrections, history and health.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use assistant_agent::VoiceReply;
use assistant_core::{CorrectionRequest, SpeakerMatch};

use crate::metrics::{metrics_handler, track_metrics};
use crate::state::AppState;
use crate::ServerError;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";
/// Header alternative to the cookie for non-browser clients
pub const SESSION_HEADER: &str = "x-session-id";

const SESSION_COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let max_upload_bytes = server.max_upload_bytes;
    let request_timeout = server.request_timeout();

    Router::new()
        .route("/voice", post(process_voice))
        .route("/chat", post(chat))
        .route("/learn", post(learn))
        .route("/history", get(history))
        .route("/history/clear", post(clear_history))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, no cross-origin requests are allowed
/// - If cors_origins is empty, any origin is allowed without credentials
/// - Otherwise, the configured origins are allowed with credentials
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        return CorsLayer::new();
    }

    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if origins.is_empty() {
        tracing::info!("No CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)])
        .allow_credentials(true)
}

/// Session id from the `session_id` cookie, else the `x-session-id` header
fn requested_session_id(headers: &HeaderMap) -> String {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        })
        .unwrap_or_default()
}

fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
        SESSION_COOKIE, id, SESSION_COOKIE_MAX_AGE_SECS
    ))
    .ok()
}

/// Attach `Set-Cookie` when the session was created for this request,
/// error responses included
fn with_session_cookie(mut response: Response, id: &str, is_new: bool) -> Response {
    if is_new {
        if let Some(cookie) = session_cookie(id) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

fn require_user_id(state: &AppState, user_id: &str) -> Result<(), ServerError> {
    if user_id.is_empty() {
        return Err(ServerError::invalid("user_id is required"));
    }
    if !state.settings.is_valid_user_id(user_id) {
        tracing::warn!(user_id = %user_id, "Rejected unknown user_id");
        return Err(ServerError::invalid_with_detail(
            "invalid user_id",
            format!(
                "user_id must be one of: {}",
                state.settings.valid_user_ids.join(", ")
            ),
        ));
    }
    Ok(())
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::warn!(error = %rejection, "Failed to parse request body");
        ServerError::invalid_with_detail("invalid request body", rejection.body_text())
    })
}

/// `POST /voice`: multipart upload with a `file` part
async fn process_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ServerError> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::invalid_with_detail("invalid multipart form", e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                ServerError::invalid_with_detail("failed to read audio file", e.body_text())
            })?;
            audio = Some(bytes.to_vec());
            break;
        }
    }
    let audio = audio.ok_or_else(|| ServerError::invalid("file is required"))?;
    if audio.is_empty() {
        return Err(ServerError::invalid("audio is empty"));
    }

    let requested = requested_session_id(&headers);
    let session = state.pipeline.open_session(&requested);
    let is_new = session.id != requested;

    tracing::info!(
        session_id = %session.id,
        size_bytes = audio.len(),
        "Processing voice request"
    );

    let outcome = match state.pipeline.process_voice(&session.id, audio).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return Ok(with_session_cookie(
                ServerError::from(e).into_response(),
                &session.id,
                is_new,
            ))
        }
    };

    let body = match outcome {
        VoiceReply::NoSpeech => json!({ "status": "no_speech" }),
        VoiceReply::Rejected { confidence } => json!({
            "status": "rejected",
            "confidence": confidence,
        }),
        VoiceReply::Answered(answered) => json!({
            "status": assistant_core::VoiceStatus::from(answered.speaker_match),
            "user_id": answered.speaker_id,
            "confidence": answered.confidence,
            "transcript": answered.transcript,
            "response": answered.response,
            "model_used": answered.model_used,
            "fallback": answered.speaker_match == SpeakerMatch::Fallback,
            "memories_used": answered.memories_used,
            "session_id": session.id,
        }),
    };

    Ok(with_session_cookie(
        Json(body).into_response(),
        &session.id,
        is_new,
    ))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// `POST /chat`
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let request = parse_body(body)?;
    require_user_id(&state, &request.user_id)?;
    if request.message.trim().is_empty() {
        return Err(ServerError::invalid("message is required"));
    }

    let requested = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| requested_session_id(&headers));
    let session = state.pipeline.open_session(&requested);
    let is_new = session.id != requested;

    let reply = match state
        .pipeline
        .process_chat(&session.id, &request.user_id, &request.message)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            return Ok(with_session_cookie(
                ServerError::from(e).into_response(),
                &session.id,
                is_new,
            ))
        }
    };

    let body = json!({
        "response": reply.response,
        "model_used": reply.model_used,
        "memories_used": reply.memories_used,
        "user_id": reply.speaker_id,
        "session_id": session.id,
    });

    Ok(with_session_cookie(
        Json(body).into_response(),
        &session.id,
        is_new,
    ))
}

#[derive(Debug, Deserialize)]
struct LearnRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    source: String,
}

/// `POST /learn`: forward a correction for review
async fn learn(
    State(state): State<AppState>,
    body: Result<Json<LearnRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let request = parse_body(body)?;
    require_user_id(&state, &request.user_id)?;
    if request.content.trim().is_empty() {
        return Err(ServerError::invalid("content is required"));
    }
    if request.source.trim().is_empty() {
        return Err(ServerError::invalid("source is required"));
    }

    tracing::info!(
        user_id = %request.user_id,
        source = %request.source,
        "Submitting correction"
    );

    let receipt = state
        .corrections
        .submit_correction(&CorrectionRequest {
            speaker_id: request.user_id,
            content: request.content,
            source: request.source,
        })
        .await?;

    Ok(Json(json!({
        "id": receipt.id,
        "status": receipt.status,
    })))
}

/// `GET /history`
async fn history(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let id = requested_session_id(&headers);
    let history = state.pipeline.history(&id);

    Json(json!({
        "session_id": id,
        "history": history,
    }))
}

/// `POST /history/clear`
async fn clear_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let id = requested_session_id(&headers);
    state.pipeline.clear_history(&id);

    Json(json!({ "status": "ok" }))
}

/// `GET /health`: always 200, backend failures are reported in the body
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.health.check().await;

    let sidecars: serde_json::Map<String, serde_json::Value> = health
        .backends
        .iter()
        .map(|result| {
            let mut entry = json!({ "status": result.status });
            if let Some(latency) = result.latency {
                entry["latency_ms"] = json!(latency.as_millis() as u64);
            }
            (result.backend_name.clone(), entry)
        })
        .collect();

    Json(json!({
        "status": health.status,
        "sidecars": sidecars,
    }))
}
