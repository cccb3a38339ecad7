//! API endpoint integration tests
//!
//! Upstream services are replaced by small axum servers on local ports.

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, Path, Query},
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
    routing::post,
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{Seen, app, multipart_body, multipart_content_type, seen, spawn_server};

/// What the fake transcription API received
#[derive(Debug, Default, Clone)]
struct TranscriptionCall {
    authorization: String,
    model: String,
    file_name: Option<String>,
    mime_type: Option<String>,
    bytes: usize,
}

/// Fake transcription API answering per model; unknown models get a 404
async fn fake_transcription(
    answers: HashMap<&'static str, (StatusCode, Value)>,
    calls: Seen<TranscriptionCall>,
) -> String {
    let handler = move |headers: HeaderMap, mut multipart: Multipart| {
        let answers = answers.clone();
        let calls = calls.clone();
        async move {
            let mut call = TranscriptionCall {
                authorization: header_value(&headers, "authorization"),
                ..TranscriptionCall::default()
            };
            while let Some(field) = multipart.next_field().await.unwrap() {
                match field.name() {
                    Some("model") => call.model = field.text().await.unwrap(),
                    Some("file") => {
                        call.file_name = field.file_name().map(ToString::to_string);
                        call.mime_type = field.content_type().map(ToString::to_string);
                        call.bytes = field.bytes().await.unwrap().len();
                    }
                    _ => {}
                }
            }

            let (status, body) = answers
                .get(call.model.as_str())
                .cloned()
                .unwrap_or((StatusCode::NOT_FOUND, json!({"error": "no such model"})));
            calls.lock().unwrap().push(call);
            (status, Json(body))
        }
    };

    spawn_server(Router::new().route("/v1/audio/transcriptions", post(handler))).await
}

/// Fake chat completion API returning a fixed answer and recording request bodies
async fn fake_chat(status: StatusCode, answer: Value, calls: Seen<(String, Value)>) -> String {
    let handler = move |headers: HeaderMap, Json(body): Json<Value>| {
        let answer = answer.clone();
        let calls = calls.clone();
        async move {
            calls
                .lock()
                .unwrap()
                .push((header_value(&headers, "authorization"), body));
            (status, Json(answer))
        }
    };

    spawn_server(Router::new().route("/v1/chat/completions", post(handler))).await
}

/// What the fake synthesis API received
#[derive(Debug, Clone)]
struct SynthesisCall {
    voice: String,
    query: HashMap<String, String>,
    api_key: String,
    accept: String,
    body: Value,
}

/// Fake synthesis API returning a fixed status and body
async fn fake_synthesis(status: StatusCode, answer: &'static [u8], calls: Seen<SynthesisCall>) -> String {
    let handler = move |Path(voice): Path<String>,
                        Query(query): Query<HashMap<String, String>>,
                        headers: HeaderMap,
                        Json(body): Json<Value>| {
        let calls = calls.clone();
        async move {
            calls.lock().unwrap().push(SynthesisCall {
                voice,
                query,
                api_key: header_value(&headers, "xi-api-key"),
                accept: header_value(&headers, "accept"),
                body,
            });
            (status, [(header::CONTENT_TYPE, "audio/mpeg")], answer)
        }
    };

    spawn_server(Router::new().route("/v1/text-to-speech/{voice}", post(handler))).await
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_audio(field: &str, file_name: Option<&str>, content_type: Option<&str>, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/stt")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(field, file_name, content_type, data)))
        .unwrap()
}

fn recording() -> Request<Body> {
    post_audio("audio", Some("audio.webm"), Some("audio/webm;codecs=opus"), &[7u8; 6000])
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app(&[]).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_index_page_is_served() {
    let response = app(&[]).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = header_value(response.headers(), "content-type");
    assert!(content_type.starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Genie"));
    assert!(html.contains("/api/stt"));
}

#[tokio::test]
async fn test_capabilities_follow_credentials() {
    let json = body_json(app(&[]).oneshot(get("/api/capabilities")).await.unwrap()).await;
    assert_eq!(json["stt_available"], false);
    assert_eq!(json["chat_available"], false);
    assert_eq!(json["tts_available"], false);

    let json = body_json(
        app(&[("OPENAI_API_KEY", "sk-test"), ("ELEVENLABS_API_KEY", "el-test")])
            .oneshot(get("/api/capabilities"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["stt_available"], true);
    assert_eq!(json["chat_available"], true);
    assert_eq!(json["tts_available"], true);
    assert_eq!(json["scenarios"], json!(["At School", "At Store", "At Home"]));
    assert_eq!(json["languages"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_stt_without_key_names_credential() {
    let response = app(&[]).oneshot(recording()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Missing OPENAI_API_KEY"}));
}

#[tokio::test]
async fn test_stt_rejects_missing_audio() {
    let app = app(&[("OPENAI_API_KEY", "sk-test")]);

    let cases = [
        post_audio("other", Some("audio.webm"), Some("audio/webm"), &[1u8; 64]),
        post_audio("audio", None, None, b"just text"),
        post_audio("audio", Some("audio.webm"), Some("audio/webm"), &[]),
        post_json("/api/stt", r#"{"audio":"nope"}"#),
    ];

    for request in cases {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No audio uploaded");
    }
}

#[tokio::test]
async fn test_stt_returns_transcript() {
    let calls = seen();
    let base = fake_transcription(
        HashMap::from([(
            "gpt-4o-mini-transcribe",
            (StatusCode::OK, json!({"text": "I like apples"})),
        )]),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(recording())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"text": "I like apples"}));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].authorization, "Bearer sk-test");
    assert_eq!(calls[0].model, "gpt-4o-mini-transcribe");
    assert_eq!(calls[0].file_name.as_deref(), Some("audio.webm"));
    assert_eq!(calls[0].mime_type.as_deref(), Some("audio/webm;codecs=opus"));
    assert_eq!(calls[0].bytes, 6000);
}

#[tokio::test]
async fn test_stt_defaults_mime_type() {
    let calls = seen();
    let base = fake_transcription(
        HashMap::from([("gpt-4o-mini-transcribe", (StatusCode::OK, json!({"text": "hi"})))]),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(post_audio("audio", Some("clip"), None, &[3u8; 6000]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.lock().unwrap()[0].mime_type.as_deref(), Some("audio/webm"));
}

#[tokio::test]
async fn test_stt_empty_transcript_is_not_an_error() {
    let base = fake_transcription(
        HashMap::from([("gpt-4o-mini-transcribe", (StatusCode::OK, json!({})))]),
        seen(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(recording())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"text": ""}));
}

#[tokio::test]
async fn test_stt_falls_back_to_second_model() {
    let calls = seen();
    let base = fake_transcription(
        HashMap::from([
            (
                "gpt-4o-mini-transcribe",
                (StatusCode::BAD_REQUEST, json!({"error": "unsupported"})),
            ),
            ("whisper-1", (StatusCode::OK, json!({"text": "hello genie"}))),
        ]),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(recording())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["text"], "hello genie");

    let models: Vec<String> = calls.lock().unwrap().iter().map(|c| c.model.clone()).collect();
    assert_eq!(models, ["gpt-4o-mini-transcribe", "whisper-1"]);
}

#[tokio::test]
async fn test_stt_all_models_failing() {
    let calls = seen();
    let base = fake_transcription(HashMap::new(), calls.clone()).await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(recording())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Failed to transcribe audio"}));
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_chat_without_key_names_credential() {
    let response = app(&[])
        .oneshot(post_json("/api/chat", r#"{"message":"Hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Missing OPENAI_API_KEY");
}

#[tokio::test]
async fn test_chat_without_key_ignores_body() {
    let app = app(&[]);

    for body in [r#"{"message":"Hello","scenario":"At the Zoo"}"#, "{not json"] {
        let response = app.clone().oneshot(post_json("/api/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{body}");
        assert_eq!(body_json(response).await["error"], "Missing OPENAI_API_KEY");
    }
}

#[tokio::test]
async fn test_chat_rejects_bad_input() {
    let app = app(&[("OPENAI_API_KEY", "sk-test")]);

    for body in [
        "{not json",
        r#"{"message":"Hi","scenario":7}"#,
        r#"{"message":"Hi","language":"Klingon"}"#,
    ] {
        let response = app.clone().oneshot(post_json("/api/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert!(body_json(response).await["error"].is_string());
    }
}

#[tokio::test]
async fn test_chat_builds_roleplay_prompt() {
    let calls = seen();
    let base = fake_chat(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "  Good morning, class!  "}}]}),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(post_json(
            "/api/chat",
            r#"{"message":"Hello","scenario":"At School","language":"Spanish"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"reply": "Good morning, class!"}));

    let calls = calls.lock().unwrap();
    let (authorization, body) = &calls[0];
    assert_eq!(authorization, "Bearer sk-test");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 180);
    assert!((body["temperature"].as_f64().unwrap() - 0.6).abs() < 1e-6);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    let system = messages[0]["content"].as_str().unwrap();
    assert!(system.starts_with("You are Genie, a friendly English tutor for kids.\n"));
    assert!(system.contains("\nRoleplay mode: At School"));
    assert!(system.ends_with("\nAlways reply in Spanish."));
    assert_eq!(messages[1], json!({"role": "user", "content": "Hello"}));
}

#[tokio::test]
async fn test_chat_free_text_scenario() {
    let calls = seen();
    let base = fake_chat(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "Look, a giraffe!"}}]}),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(post_json(
            "/api/chat",
            r#"{"message":"Hello","scenario":"At the Zoo"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = calls.lock().unwrap();
    let system = calls[0].1["messages"][0]["content"].as_str().unwrap();
    assert_eq!(system.lines().last(), Some("Roleplay mode: At the Zoo"));
}

#[tokio::test]
async fn test_chat_blank_selectors_and_missing_message() {
    let calls = seen();
    let base = fake_chat(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "Hi!"}}]}),
        calls.clone(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(post_json("/api/chat", r#"{"scenario":"","language":""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = calls.lock().unwrap();
    let messages = calls[0].1["messages"].as_array().unwrap();
    let system = messages[0]["content"].as_str().unwrap();
    assert_eq!(system.lines().count(), 4);
    assert_eq!(messages[1]["content"], "");
}

#[tokio::test]
async fn test_chat_falls_back_when_reply_is_empty() {
    for answer in [
        json!({"choices": []}),
        json!({"choices": [{"message": {"content": null}}]}),
        json!({"choices": [{"message": {"content": "   "}}]}),
        json!({"choices": [{"index": 0, "finish_reason": "length"}]}),
        json!({"choices": null}),
    ] {
        let base = fake_chat(StatusCode::OK, answer, seen()).await;
        let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
            .oneshot(post_json("/api/chat", r#"{"message":"Hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["reply"],
            "I'm here! What would you like to learn today?"
        );
    }
}

#[tokio::test]
async fn test_chat_upstream_failure() {
    let base = fake_chat(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "rate limited"}}),
        seen(),
    )
    .await;

    let response = app(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", &base)])
        .oneshot(post_json("/api/chat", r#"{"message":"Hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Failed to generate response"}));
}

#[tokio::test]
async fn test_tts_requires_text() {
    let app = app(&[("ELEVENLABS_API_KEY", "el-test")]);

    for body in ["{}", r#"{"text":""}"#, r#"{"text":5}"#, "garbage"] {
        let response = app.clone().oneshot(post_json("/api/tts", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_json(response).await, json!({"error": "Missing text"}));
    }
}

#[tokio::test]
async fn test_tts_without_key_is_not_implemented() {
    let response = app(&[("OPENAI_API_KEY", "sk-test")])
        .oneshot(post_json("/api/tts", r#"{"text":"Hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body_json(response).await, json!({"error": "TTS not configured"}));
}

#[tokio::test]
async fn test_tts_returns_mpeg_audio() {
    let calls = seen();
    let base = fake_synthesis(StatusCode::OK, b"ID3fake-mp3", calls.clone()).await;

    let response = app(&[("ELEVENLABS_API_KEY", "el-test"), ("ELEVENLABS_BASE_URL", &base)])
        .oneshot(post_json("/api/tts", r#"{"text":"Great job!"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(response.headers(), "content-type"), "audio/mpeg");
    assert_eq!(body_bytes(response).await, b"ID3fake-mp3");

    let calls = calls.lock().unwrap();
    let call = &calls[0];
    assert_eq!(call.voice, "21m00Tcm4TlvDq8ikWAM");
    assert_eq!(call.query["optimize_streaming_latency"], "0");
    assert_eq!(call.query["output_format"], "mp3_44100_128");
    assert_eq!(call.api_key, "el-test");
    assert_eq!(call.accept, "audio/mpeg");
    assert_eq!(call.body["text"], "Great job!");
    assert_eq!(call.body["model_id"], "eleven_multilingual_v2");
    assert!((call.body["voice_settings"]["stability"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    assert!((call.body["voice_settings"]["similarity_boost"].as_f64().unwrap() - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn test_tts_uses_configured_voice() {
    let calls = seen();
    let base = fake_synthesis(StatusCode::OK, b"mp3", calls.clone()).await;

    let response = app(&[
        ("ELEVENLABS_API_KEY", "el-test"),
        ("ELEVENLABS_BASE_URL", &base),
        ("ELEVENLABS_VOICE_ID", "custom-voice"),
    ])
    .oneshot(post_json("/api/tts", r#"{"text":"Hi"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.lock().unwrap()[0].voice, "custom-voice");
}

#[tokio::test]
async fn test_tts_upstream_failure_carries_details() {
    let base = fake_synthesis(StatusCode::UNAUTHORIZED, b"invalid api key", seen()).await;

    let response = app(&[("ELEVENLABS_API_KEY", "el-bad"), ("ELEVENLABS_BASE_URL", &base)])
        .oneshot(post_json("/api/tts", r#"{"text":"Hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "TTS request failed", "details": "invalid api key"})
    );
}

#[tokio::test]
async fn test_tts_unreachable_upstream() {
    let response = app(&[
        ("ELEVENLABS_API_KEY", "el-test"),
        ("ELEVENLABS_BASE_URL", "http://127.0.0.1:9"),
    ])
    .oneshot(post_json("/api/tts", r#"{"text":"Hi"}"#))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Failed to synthesize speech"}));
}
