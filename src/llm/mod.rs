//! Provider-agnostic chat types and the streaming gateway.
//!
//! Data flows through the submodules in this order:
//! [`adapter`] builds the upstream payload, [`transport`] issues it under the
//! retry policy, [`streaming`] decodes the SSE body, and [`gateway`] ties the
//! three together into a single [`DeltaStream`].

/// Message format conversion for both upstream families.
pub mod adapter;
/// Streaming gateway: one call, one ordered delta stream.
pub mod gateway;
/// SSE line reassembly and the two upstream frame grammars.
pub mod streaming;
/// Per-attempt deadline, failure classification and bounded retry.
pub mod transport;
/// Endpoint and logging helpers.
pub mod utils;

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::NetworkConfig;

pub use gateway::StreamingGateway;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Image reference inside a multimodal message: a `data:` URL or an external URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One part of a multimodal message (OpenAI vision wire shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message body: plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text of the message; for multimodal content the text parts joined by newlines.
    pub fn joined_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// Provider-agnostic chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One increment of streamed text.
///
/// Every gateway stream ends with exactly one delta where `done` is true and
/// `text` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDelta {
    pub text: String,
    pub done: bool,
}

impl ContentDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }

    pub fn terminal() -> Self {
        Self {
            text: String::new(),
            done: true,
        }
    }
}

/// Decodes one SSE line into at most one delta.
pub type FrameParser = fn(&str) -> Option<ContentDelta>;

/// Upstream wire family, selected once per call from the model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// OpenAI chat-completions (default).
    OpenAICompatible,
    /// Anthropic messages API, used for `claude-*` model ids.
    AnthropicCompatible,
}

impl ModelFamily {
    /// Picks the family for a model id. Case-sensitive prefix match on `claude-`.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude-") {
            ModelFamily::AnthropicCompatible
        } else {
            ModelFamily::OpenAICompatible
        }
    }

    /// Frame grammar of this family's SSE stream.
    pub fn frame_parser(&self) -> FrameParser {
        match self {
            ModelFamily::OpenAICompatible => streaming::openai::parse_openai_line,
            ModelFamily::AnthropicCompatible => streaming::anthropic::parse_anthropic_line,
        }
    }

    /// Per-attempt deadline configured for this family.
    pub fn default_timeout(&self, network: &NetworkConfig) -> Duration {
        match self {
            ModelFamily::OpenAICompatible => Duration::from_secs(network.openai_timeout_secs),
            ModelFamily::AnthropicCompatible => {
                Duration::from_secs(network.anthropic_timeout_secs)
            }
        }
    }

    /// Short name used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::OpenAICompatible => "OpenAI",
            ModelFamily::AnthropicCompatible => "Anthropic",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inbound call to the gateway.
///
/// Unset fields fall back to the gateway's configuration.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    /// Image URLs merged into the first user message.
    pub reference_images: Vec<String>,
    pub proxy_url: Option<String>,
    /// Per-attempt deadline override.
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_reference_images(mut self, images: Vec<String>) -> Self {
        self.reference_images = images;
        self
    }

    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ordered, single-pass sequence of deltas produced by one gateway call.
///
/// Wraps the receiving end of the producer task's channel. Dropping it stops
/// the producer and releases the upstream connection.
///
/// # Usage example
/// ```no_run
/// # async fn example(mut stream: chatgate::llm::DeltaStream) {
/// while let Some(delta) = stream.recv().await {
///     if delta.done {
///         break;
///     }
///     print!("{}", delta.text);
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct DeltaStream {
    receiver: mpsc::Receiver<ContentDelta>,
    attempts: u32,
}

impl DeltaStream {
    pub fn new(receiver: mpsc::Receiver<ContentDelta>, attempts: u32) -> Self {
        Self { receiver, attempts }
    }

    /// Transport attempts it took to open the stream.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub async fn recv(&mut self) -> Option<ContentDelta> {
        self.receiver.recv().await
    }

    /// Drains the stream and concatenates every non-terminal delta.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(delta) = self.receiver.recv().await {
            if delta.done {
                break;
            }
            text.push_str(&delta.text);
        }
        text
    }
}

impl Stream for DeltaStream {
    type Item = ContentDelta;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_family_selection_for_claude_models() {
        for model in [
            "claude-3-opus-20240229",
            "claude-3-haiku-20240307",
            "claude-sonnet-4-5",
            "claude-2.1",
        ] {
            assert_eq!(
                ModelFamily::for_model(model),
                ModelFamily::AnthropicCompatible,
                "{}",
                model
            );
        }
    }

    #[test]
    fn test_family_selection_defaults_to_openai() {
        for model in ["gpt-4", "GLM-4.6", "gemini-pro", "Claude-3-opus", "CLAUDE-3", "claude"] {
            assert_eq!(
                ModelFamily::for_model(model),
                ModelFamily::OpenAICompatible,
                "{}",
                model
            );
        }
    }

    #[test]
    fn test_family_timeouts() {
        let network = NetworkConfig::default();
        assert_eq!(
            ModelFamily::OpenAICompatible.default_timeout(&network),
            Duration::from_secs(30)
        );
        assert_eq!(
            ModelFamily::AnthropicCompatible.default_timeout(&network),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_message_wire_shape() {
        let text = Message::user("Hello");
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            serde_json::json!({"role": "user", "content": "Hello"})
        );

        let multimodal = Message::user(MessageContent::Parts(vec![
            ContentPart::text("Look"),
            ContentPart::image("https://example.com/a.png"),
        ]));
        assert_eq!(
            serde_json::to_value(&multimodal).unwrap(),
            serde_json::json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "Look"},
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}
                ]
            })
        );
    }

    #[test]
    fn test_joined_text_skips_images() {
        let content = MessageContent::Parts(vec![
            ContentPart::text("a"),
            ContentPart::image("https://example.com/x.png"),
            ContentPart::text("b"),
        ]);
        assert_eq!(content.joined_text(), "a\nb");
    }

    #[tokio::test]
    async fn test_delta_stream_collect_text_stops_at_terminal() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ContentDelta::text("Hel")).await.unwrap();
        tx.send(ContentDelta::text("lo")).await.unwrap();
        tx.send(ContentDelta::terminal()).await.unwrap();
        drop(tx);

        let stream = DeltaStream::new(rx, 1);
        assert_eq!(stream.collect_text().await, "Hello");
    }
}
