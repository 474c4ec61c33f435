//! Where the consumer's deltas come from.
//!
//! [`GatewaySource`] calls the upstream in-process; [`RelaySource`] reads the
//! relay grammar from a remote endpoint. Both hand back a [`StreamHandle`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;

use super::prompts::build_conversation;
use super::relay::{RelayEvent, RelayMessage, RelayRequest};
use super::session::AgentRole;
use crate::config::NetworkConfig;
use crate::error::{GatewayError, Result};
use crate::llm::streaming::LineBuffer;
use crate::llm::transport::build_http_client;
use crate::llm::{CompletionRequest, Message, StreamingGateway};

/// Streaming response event.
#[derive(Debug)]
pub enum StreamChunk {
    /// Text delta (append to existing content).
    Delta(String),
    /// Stream ended normally.
    Done,
    /// Stream terminated with an error.
    Error(GatewayError),
}

/// Handle for receiving a streaming response.
///
/// A closed channel without [`StreamChunk::Done`] is treated as a normal end.
#[derive(Debug)]
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamChunk>,
}

/// One logical turn as the consumer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub role: AgentRole,
    /// Prior user/assistant turns, ending with the new user message.
    pub history: Vec<Message>,
    pub context: Option<String>,
    pub reference_images: Vec<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl TurnRequest {
    pub fn completion_request(&self) -> CompletionRequest {
        let mut request = CompletionRequest::new(build_conversation(
            self.role,
            self.context.as_deref(),
            self.history.clone(),
        ))
        .with_reference_images(self.reference_images.clone());
        request.model = self.model.clone();
        request.temperature = self.temperature;
        request
    }

    pub fn relay_request(&self) -> RelayRequest {
        RelayRequest {
            role: self.role,
            messages: self
                .history
                .iter()
                .map(|m| RelayMessage {
                    role: m.role,
                    content: m.content.joined_text(),
                })
                .collect(),
            context_document: self.context.clone(),
            reference_images: self.reference_images.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}

/// Opens one completion stream per call.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn open(&self, request: &TurnRequest) -> Result<StreamHandle>;
}

/// In-process source backed by [`StreamingGateway`].
#[derive(Debug, Clone)]
pub struct GatewaySource {
    gateway: StreamingGateway,
}

impl GatewaySource {
    pub fn new(gateway: StreamingGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl CompletionSource for GatewaySource {
    async fn open(&self, request: &TurnRequest) -> Result<StreamHandle> {
        let mut stream = self
            .gateway
            .stream_completion(request.completion_request())
            .await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(delta) = stream.recv().await {
                let chunk = if delta.done {
                    StreamChunk::Done
                } else {
                    StreamChunk::Delta(delta.text)
                };
                let done = matches!(chunk, StreamChunk::Done);
                if tx.send(chunk).await.is_err() || done {
                    break;
                }
            }
        });
        Ok(StreamHandle { receiver: rx })
    }
}

/// Remote source speaking the relay grammar.
#[derive(Debug, Clone)]
pub struct RelaySource {
    client: Client,
    url: String,
}

impl RelaySource {
    pub fn new(url: impl Into<String>, network: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(network, None)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CompletionSource for RelaySource {
    async fn open(&self, request: &TurnRequest) -> Result<StreamHandle> {
        tracing::debug!("POST {} (role={})", self.url, request.role);
        let response = self
            .client
            .post(&self.url)
            .json(&request.relay_request())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Other(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(GatewayError::Network(e))).await;
                        return;
                    }
                };
                for line in lines.push(&chunk) {
                    if !forward_relay_line(&line, &tx).await {
                        return;
                    }
                }
            }
            if let Some(rest) = lines.finish()
                && !forward_relay_line(&rest, &tx).await
            {
                return;
            }
            let _ = tx.send(StreamChunk::Done).await;
        });

        Ok(StreamHandle { receiver: rx })
    }
}

/// Forwards one relay line; false once the stream is finished or abandoned.
async fn forward_relay_line(line: &str, tx: &mpsc::Sender<StreamChunk>) -> bool {
    let Some(event) = RelayEvent::decode_line(line) else {
        return true;
    };

    match event {
        RelayEvent::Content { content, done } => {
            if !content.is_empty() && tx.send(StreamChunk::Delta(content)).await.is_err() {
                return false;
            }
            if done {
                let _ = tx.send(StreamChunk::Done).await;
                return false;
            }
            true
        }
        error => {
            if let Some(err) = error.into_error() {
                let _ = tx.send(StreamChunk::Error(err)).await;
            }
            false
        }
    }
}
