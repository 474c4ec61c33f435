use reqwest::Client;
use tokio::sync::mpsc;

use super::adapter;
use super::streaming::forward_frames;
use super::transport::{TransportPolicy, build_http_client, run_with_retry, send_once};
use super::utils::{ANTHROPIC_API_SUFFIX, OPENAI_API_SUFFIX, complete_endpoint};
use super::{CompletionRequest, DeltaStream, ModelFamily};
use crate::config::{AppConfig, NetworkConfig, ProviderConfig};
use crate::error::Result;

/// Channel depth between the decoding task and the caller.
const DELTA_CHANNEL_CAPACITY: usize = 64;

/// Streams completions from either upstream family.
///
/// One call picks the family from the model id, builds the request, runs it
/// under the transport policy and decodes the accepted body on a spawned
/// task. A terminal transport failure is returned as `Err` before any delta
/// is produced.
#[derive(Debug, Clone)]
pub struct StreamingGateway {
    client: Client,
    provider: ProviderConfig,
    network: NetworkConfig,
}

impl StreamingGateway {
    pub fn new(provider: ProviderConfig, network: NetworkConfig) -> Result<Self> {
        let client = build_http_client(&network, provider.proxy_url.as_deref())?;
        Ok(Self {
            client,
            provider,
            network,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.provider.clone(), config.network.clone())
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Upstream endpoint used for `family`.
    pub fn endpoint(&self, family: ModelFamily) -> String {
        match family {
            ModelFamily::OpenAICompatible => {
                complete_endpoint(&self.provider.api_url, OPENAI_API_SUFFIX)
            }
            ModelFamily::AnthropicCompatible => {
                complete_endpoint(&self.provider.anthropic_url, ANTHROPIC_API_SUFFIX)
            }
        }
    }

    fn client_for(&self, proxy_url: Option<&str>) -> Result<Client> {
        match proxy_url {
            Some(proxy) if Some(proxy) != self.provider.proxy_url.as_deref() => {
                build_http_client(&self.network, Some(proxy))
            }
            _ => Ok(self.client.clone()),
        }
    }

    /// Streams a completion for `request`.
    pub async fn stream_completion(&self, request: CompletionRequest) -> Result<DeltaStream> {
        let token = self.provider.require_token()?;

        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.model.clone());
        let family = ModelFamily::for_model(&model);
        let temperature = request.temperature.unwrap_or(self.provider.temperature);

        let mut messages = request.messages;
        adapter::attach_reference_images(&mut messages, &request.reference_images);

        let body = adapter::build_request(family, &model, &messages, temperature);
        let headers = adapter::auth_headers(family, token);
        let endpoint = self.endpoint(family);
        let client = self.client_for(request.proxy_url.as_deref())?;

        let mut policy = TransportPolicy::for_family(family, &self.network);
        if let Some(timeout) = request.timeout {
            policy = policy.with_timeout(timeout);
        }

        tracing::info!(
            "{} request: model={}, messages={}, images={}, temperature={}, proxy={}",
            family,
            model,
            messages.len(),
            request.reference_images.len(),
            temperature,
            request.proxy_url.is_some() || self.provider.proxy_url.is_some()
        );

        let (client, endpoint, headers, body) =
            (&client, endpoint.as_str(), headers.as_slice(), &body);
        let attempted = run_with_retry(&policy, family.label(), move |_| {
            send_once(client, endpoint, headers, body)
        })
        .await?;

        tracing::debug!(
            "{} stream accepted after {} attempt(s)",
            family,
            attempted.attempts
        );

        let response = attempted.value;
        let parser = family.frame_parser();
        let (tx, rx) = mpsc::channel(DELTA_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            forward_frames(response.bytes_stream(), parser, tx).await;
        });

        Ok(DeltaStream::new(rx, attempted.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, GatewayError};
    use crate::llm::transport::ensure_crypto_provider;
    use crate::llm::{ContentDelta, Message};
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn gateway(base_url: &str, max_attempts: u32) -> StreamingGateway {
        ensure_crypto_provider();
        let provider = ProviderConfig {
            api_url: base_url.to_string(),
            anthropic_url: base_url.to_string(),
            api_token: Some("sk-test-token".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        };
        let network = NetworkConfig {
            max_attempts,
            retry_delay_ms: 10,
            ..Default::default()
        };
        StreamingGateway::new(provider, network).unwrap()
    }

    async fn drain(mut stream: DeltaStream) -> Vec<ContentDelta> {
        let mut out = Vec::new();
        while let Some(delta) = stream.recv().await {
            out.push(delta);
        }
        out
    }

    #[test]
    fn test_endpoints_are_completed_per_family() {
        let gw = gateway("http://127.0.0.1:9", 1);
        assert_eq!(
            gw.endpoint(ModelFamily::OpenAICompatible),
            "http://127.0.0.1:9/v1/chat/completions"
        );
        assert_eq!(
            gw.endpoint(ModelFamily::AnthropicCompatible),
            "http://127.0.0.1:9/v1/messages"
        );
    }

    #[tokio::test]
    async fn test_openai_stream() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test-token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "stream": true,
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
                "data: [DONE]\n\n",
            ))
            .create_async()
            .await;

        let gw = gateway(&server.url(), 3);
        let stream = gw
            .stream_completion(CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap();
        assert_eq!(stream.attempts(), 1);

        assert_eq!(
            drain(stream).await,
            vec![
                ContentDelta::text("Hello"),
                ContentDelta::text(" there"),
                ContentDelta::terminal(),
            ]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_anthropic_stream() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test-token")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "claude-3-haiku-20240307",
                "system": "Be brief",
                "max_tokens": 8192,
                "stream": true,
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .with_status(200)
            .with_body(concat!(
                "event: message_start\n",
                "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Yo\"}}\n\n",
                "event: message_stop\n",
                "data: {\"type\":\"message_stop\"}\n\n",
            ))
            .create_async()
            .await;

        let gw = gateway(&server.url(), 3);
        let request = CompletionRequest::new(vec![Message::system("Be brief"), Message::user("Hi")])
            .with_model("claude-3-haiku-20240307");
        let stream = gw.stream_completion(request).await.unwrap();

        assert_eq!(
            drain(stream).await,
            vec![ContentDelta::text("Yo"), ContentDelta::terminal()]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reference_images_reach_first_user_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messages": [
                    {"role": "user", "content": [
                        {"type": "text", "text": "first"},
                        {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}
                    ]},
                    {"role": "assistant", "content": "ok"},
                    {"role": "user", "content": "second"}
                ]
            })))
            .with_status(200)
            .with_body("data: [DONE]\n\n")
            .create_async()
            .await;

        let gw = gateway(&server.url(), 1);
        let request = CompletionRequest::new(vec![
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("second"),
        ])
        .with_reference_images(vec!["https://example.com/a.png".to_string()]);

        let stream = gw.stream_completion(request).await.unwrap();
        assert_eq!(drain(stream).await, vec![ContentDelta::terminal()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_retried_then_surfaced() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .expect(3)
            .create_async()
            .await;

        let gw = gateway(&server.url(), 3);
        let err = gw
            .stream_completion(CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::ApiError));
        assert_eq!(err.retries_attempted(), Some(3));
        assert!(err.to_string().contains("503 - upstream overloaded"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_attempt_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("Unauthorized")
            .expect(1)
            .create_async()
            .await;

        let gw = gateway(&server.url(), 1);
        let err = gw
            .stream_completion(CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Transport {
                code: ErrorCode::ApiError,
                retries_attempted: 1,
                ..
            }
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is not expected to be listening.
        let gw = gateway("http://127.0.0.1:9", 2);
        let err = gw
            .stream_completion(
                CompletionRequest::new(vec![Message::user("Hi")])
                    .with_timeout(Duration::from_secs(5)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::NetworkError));
        assert_eq!(err.retries_attempted(), Some(2));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_any_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut gw = gateway(&server.url(), 3);
        gw.provider.api_token = None;
        let err = gw
            .stream_completion(CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Config(_)));
        mock.assert_async().await;
    }
}
