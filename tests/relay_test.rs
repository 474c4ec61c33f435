//! Relay 语法端到端测试
//!
//! gateway ─> relay_completion ─> (HTTP) ─> RelaySource ─> StreamConsumer

use chatgate::chat::relay::{RelayEvent, RelayRequest, relay_completion};
use chatgate::chat::{
    AgentRole, AgentSession, NoopObserver, RelaySource, SendOptions, SessionStatus,
    StreamConsumer,
};
use chatgate::config::{ChatConfig, NetworkConfig, ProviderConfig};
use chatgate::error::ErrorCode;
use chatgate::llm::StreamingGateway;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;

fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn gateway(base_url: &str) -> StreamingGateway {
    ensure_crypto_provider();
    StreamingGateway::new(
        ProviderConfig {
            api_url: base_url.to_string(),
            api_token: Some("sk-relay".to_string()),
            ..Default::default()
        },
        NetworkConfig {
            max_attempts: 1,
            ..Default::default()
        },
    )
    .unwrap()
}

async fn relay_frames(base_url: &str, request: RelayRequest) -> String {
    let mut out = Vec::new();
    relay_completion(&gateway(base_url), request.into_completion_request(), &mut out)
        .await
        .unwrap();
    String::from_utf8(out).unwrap()
}

fn relay_request() -> RelayRequest {
    serde_json::from_value(serde_json::json!({
        "role": "dev",
        "messages": [{"role": "user", "content": "make a button"}],
        "contextDocument": "Design: a blue button"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_relay_frames_from_openai_stream() {
    let mut upstream = Server::new_async().await;
    let _mock = upstream
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("Design: a blue button".to_string()))
        .with_status(200)
        .with_body(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"<button>\"}}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .create_async()
        .await;

    let frames = relay_frames(&upstream.url(), relay_request()).await;
    assert_eq!(
        frames,
        concat!(
            "data: {\"content\":\"<button>\",\"done\":false}\n\n",
            "data: {\"content\":\"\",\"done\":true}\n\n",
        )
    );

    let events: Vec<RelayEvent> = frames.lines().filter_map(RelayEvent::decode_line).collect();
    assert_eq!(events.len(), 2);
    assert!(events[1].is_done());
}

#[tokio::test]
async fn test_relay_error_frame_for_upstream_failure() {
    let mut upstream = Server::new_async().await;
    let _mock = upstream
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let frames = relay_frames(&upstream.url(), relay_request()).await;
    let event = RelayEvent::decode_line(frames.trim_end()).unwrap();
    assert!(event.is_done());

    let err = event.into_error().unwrap();
    assert_eq!(err.code(), Some(ErrorCode::ApiError));
    assert_eq!(err.retries_attempted(), Some(1));
    assert!(err.is_retry_error());
}

#[tokio::test]
async fn test_consumer_reads_through_relay() {
    let mut upstream = Server::new_async().await;
    let _upstream_mock = upstream
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Done \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"deal\"}}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .create_async()
        .await;
    let frames = relay_frames(&upstream.url(), relay_request()).await;

    let mut relay = Server::new_async().await;
    let relay_mock = relay
        .mock("POST", "/api/ai/stream")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "role": "dev",
            "messages": [{"role": "user", "content": "make a button"}]
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(frames)
        .create_async()
        .await;

    let source = RelaySource::new(
        format!("{}/api/ai/stream", relay.url()),
        &NetworkConfig::default(),
    )
    .unwrap();
    let consumer = StreamConsumer::new(source, &ChatConfig::default());

    let mut session = AgentSession::new(AgentRole::Dev);
    let reply = consumer
        .send_message(&mut session, "make a button", &SendOptions::default(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(reply, "Done deal");
    assert_eq!(session.status, SessionStatus::Idle);
    relay_mock.assert_async().await;
}
