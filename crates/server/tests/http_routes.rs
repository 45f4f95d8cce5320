//! Router tests driving the request surface with fake backends

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use assistant_agent::{HealthAggregator, InteractionPipeline, NamedHealthCheck, SessionStore};
use assistant_config::Settings;
use assistant_core::{
    Backend, BackendError, CorrectionBackend, CorrectionReceipt, CorrectionRequest, HealthCheck,
    RecognizedSpeech, Reply, ReplyBackend, ReplyRequest, SpeechBackend, VoiceOutcome,
};
use assistant_server::{create_router, AppState};

struct FakeSpeech(Result<VoiceOutcome, BackendError>);

#[async_trait]
impl SpeechBackend for FakeSpeech {
    async fn process_speech(&self, _audio: Vec<u8>) -> Result<VoiceOutcome, BackendError> {
        self.0.clone()
    }
}

struct FakeReply {
    fail: bool,
}

#[async_trait]
impl ReplyBackend for FakeReply {
    async fn generate_reply(&self, request: &ReplyRequest) -> Result<Reply, BackendError> {
        if self.fail {
            return Err(BackendError::Unavailable {
                backend: Backend::Llm,
                reason: "connection refused".to_string(),
            });
        }
        Ok(Reply {
            text: format!("reply to {} after {}", request.message, request.history.len()),
            model_used: "llama3".to_string(),
            memories_used: Vec::new(),
        })
    }
}

struct FakeCorrections;

#[async_trait]
impl CorrectionBackend for FakeCorrections {
    async fn submit_correction(
        &self,
        request: &CorrectionRequest,
    ) -> Result<CorrectionReceipt, BackendError> {
        Ok(CorrectionReceipt {
            id: format!("c-{}", request.speaker_id),
            status: "pending_review".to_string(),
        })
    }
}

struct FakeProbe(bool);

#[async_trait]
impl HealthCheck for FakeProbe {
    async fn check_health(&self) -> Result<Duration, BackendError> {
        if self.0 {
            Ok(Duration::from_millis(2))
        } else {
            Err(BackendError::Timeout {
                backend: Backend::Learning,
            })
        }
    }
}

struct Fixture {
    speech: Result<VoiceOutcome, BackendError>,
    reply_fails: bool,
    healthy: [bool; 3],
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            speech: Ok(VoiceOutcome::Identified(RecognizedSpeech {
                speaker_id: "mom".to_string(),
                confidence: 0.92,
                transcript: "hello".to_string(),
            })),
            reply_fails: false,
            healthy: [true, true, true],
        }
    }
}

impl Fixture {
    fn router(self) -> Router {
        self.router_with_sessions().0
    }

    fn router_with_sessions(self) -> (Router, Arc<SessionStore>) {
        let sessions = Arc::new(SessionStore::new(20));
        let pipeline = InteractionPipeline::new(
            Arc::new(FakeSpeech(self.speech)),
            Arc::new(FakeReply {
                fail: self.reply_fails,
            }),
            Arc::clone(&sessions),
        );
        let probes = ["voice", "llm", "learning"]
            .into_iter()
            .zip(self.healthy)
            .map(|(name, ok)| NamedHealthCheck::new(name, Arc::new(FakeProbe(ok))))
            .collect();
        let health = HealthAggregator::new(probes, Duration::from_secs(1));

        let router = create_router(AppState::new(
            Settings::default(),
            pipeline,
            health,
            Arc::new(FakeCorrections),
        ));
        (router, sessions)
    }
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn voice_request(audio: &[u8], session_id: Option<&str>) -> Request<Body> {
    let boundary = "assistant-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\nContent-Type: audio/wav\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/voice")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        );
    if let Some(id) = session_id {
        builder = builder.header(header::COOKIE, format!("session_id={}", id));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_voice_identified_sets_cookie_and_records_history() {
    let app = Fixture::default().router();

    let response = app
        .clone()
        .oneshot(voice_request(b"RIFF....WAVE", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_id="));

    let body = read_json(response).await;
    assert_eq!(body["status"], "identified");
    assert_eq!(body["user_id"], "mom");
    assert_eq!(body["transcript"], "hello");
    assert_eq!(body["response"], "reply to hello after 0");
    assert_eq!(body["fallback"], false);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let history = app
        .oneshot(
            Request::builder()
                .uri("/history")
                .header("x-session-id", &session_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history = read_json(history).await;
    assert_eq!(history["history"].as_array().unwrap().len(), 2);
    assert_eq!(history["history"][0]["role"], "user");
    assert_eq!(history["history"][1]["content"], "reply to hello after 0");
}

#[tokio::test]
async fn test_voice_fallback_flag() {
    let app = Fixture {
        speech: Ok(VoiceOutcome::Fallback(RecognizedSpeech {
            speaker_id: "child".to_string(),
            confidence: 0.3,
            transcript: "snack please".to_string(),
        })),
        ..Fixture::default()
    }
    .router();

    let body = read_json(app.oneshot(voice_request(b"abc", None)).await.unwrap()).await;

    assert_eq!(body["status"], "fallback");
    assert_eq!(body["fallback"], true);
}

#[tokio::test]
async fn test_voice_no_speech_returns_only_status() {
    let app = Fixture {
        speech: Ok(VoiceOutcome::NoSpeech),
        ..Fixture::default()
    }
    .router();

    let body = read_json(app.oneshot(voice_request(b"abc", None)).await.unwrap()).await;

    assert_eq!(body, json!({ "status": "no_speech" }));
}

#[tokio::test]
async fn test_voice_rejected_returns_confidence() {
    let app = Fixture {
        speech: Ok(VoiceOutcome::Rejected { confidence: 0.41 }),
        ..Fixture::default()
    }
    .router();

    let body = read_json(app.oneshot(voice_request(b"abc", None)).await.unwrap()).await;

    assert_eq!(body, json!({ "status": "rejected", "confidence": 0.41 }));
}

#[tokio::test]
async fn test_voice_protocol_error_is_generic_500() {
    let app = Fixture {
        speech: Err(BackendError::Protocol {
            backend: Backend::Voice,
            detail: "unknown voice status 'error'".to_string(),
        }),
        ..Fixture::default()
    }
    .router();

    let response = app.oneshot(voice_request(b"abc", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "unexpected backend response");
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn test_voice_requires_file_part() {
    let app = Fixture::default().router();
    let boundary = "b";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/voice")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "file is required");
}

#[tokio::test]
async fn test_voice_empty_audio_is_bad_request() {
    let (app, sessions) = Fixture::default().router_with_sessions();

    let response = app.oneshot(voice_request(b"", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(read_json(response).await["error"], "audio is empty");
    assert_eq!(sessions.count(), 0);
}

#[tokio::test]
async fn test_voice_backend_failure_still_returns_new_session_cookie() {
    let (app, sessions) = Fixture {
        speech: Err(BackendError::Unavailable {
            backend: Backend::Voice,
            reason: "connection refused".to_string(),
        }),
        ..Fixture::default()
    }
    .router_with_sessions();

    let response = app.oneshot(voice_request(b"abc", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("new session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(sessions.count(), 1);

    let id = cookie
        .trim_start_matches("session_id=")
        .split(';')
        .next()
        .unwrap();
    assert!(sessions.contains(id));
    assert!(sessions.get_history(id).is_empty());
}

#[tokio::test]
async fn test_chat_validates_user_id() {
    let app = Fixture::default().router();

    let missing = app
        .clone()
        .oneshot(json_request("/chat", json!({ "message": "hi" })))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(missing).await["error"], "user_id is required");

    let unknown = app
        .clone()
        .oneshot(json_request(
            "/chat",
            json!({ "user_id": "guest", "message": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    let body = read_json(unknown).await;
    assert_eq!(body["error"], "invalid user_id");
    assert_eq!(body["detail"], "user_id must be one of: dad, mom, teen, child");

    let no_message = app
        .oneshot(json_request("/chat", json!({ "user_id": "dad" })))
        .await
        .unwrap();
    assert_eq!(read_json(no_message).await["error"], "message is required");
}

#[tokio::test]
async fn test_chat_malformed_body() {
    let app = Fixture::default().router();
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid request body");
}

/// Consecutive chats on one session see the earlier exchange as context
#[tokio::test]
async fn test_chat_continues_session() {
    let app = Fixture::default().router();

    let first = read_json(
        app.clone()
            .oneshot(json_request(
                "/chat",
                json!({ "user_id": "dad", "message": "weather today?" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let session_id = first["session_id"].as_str().unwrap();
    assert_eq!(first["response"], "reply to weather today? after 0");
    assert_eq!(first["user_id"], "dad");

    let second = read_json(
        app.oneshot(json_request(
            "/chat",
            json!({ "user_id": "dad", "message": "and tomorrow?", "session_id": session_id }),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(second["response"], "reply to and tomorrow? after 2");
    assert_eq!(second["session_id"], session_id);
}

#[tokio::test]
async fn test_chat_backend_down_is_503() {
    let app = Fixture {
        reply_fails: true,
        ..Fixture::default()
    }
    .router();

    let response = app
        .oneshot(json_request(
            "/chat",
            json!({ "user_id": "mom", "message": "hello" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let body = read_json(response).await;
    assert_eq!(body["error"], "llm backend unavailable");
    assert!(body["detail"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_learn_forwards_correction() {
    let app = Fixture::default().router();

    let response = app
        .clone()
        .oneshot(json_request(
            "/learn",
            json!({ "user_id": "teen", "content": "Practice is Thursday", "source": "chat" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({ "id": "c-teen", "status": "pending_review" })
    );

    let missing_source = app
        .oneshot(json_request(
            "/learn",
            json!({ "user_id": "teen", "content": "Practice is Thursday" }),
        ))
        .await
        .unwrap();
    assert_eq!(missing_source.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(missing_source).await["error"], "source is required");
}

#[tokio::test]
async fn test_clear_history() {
    let app = Fixture::default().router();
    let first = read_json(
        app.clone()
            .oneshot(json_request(
                "/chat",
                json!({ "user_id": "mom", "message": "hello" }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let cleared = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/history/clear")
                .header(header::COOKIE, format!("session_id={}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(read_json(cleared).await, json!({ "status": "ok" }));

    let history = read_json(
        app.oneshot(
            Request::builder()
                .uri("/history")
                .header(header::COOKIE, format!("session_id={}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    assert!(history["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_always_200() {
    let app = Fixture {
        healthy: [true, false, false],
        ..Fixture::default()
    }
    .router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["sidecars"]["voice"]["status"], "ok");
    assert!(body["sidecars"]["voice"]["latency_ms"].is_u64());
    assert_eq!(body["sidecars"]["llm"]["status"], "unreachable");
    assert!(body["sidecars"]["llm"].get("latency_ms").is_none());
}

#[tokio::test]
async fn test_health_all_down_is_error() {
    let app = Fixture {
        healthy: [false, false, false],
        ..Fixture::default()
    }
    .router();

    let body = read_json(
        app.oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;

    assert_eq!(body["status"], "error");
}
