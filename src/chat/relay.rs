//! Relay grammar
//!
//! The gateway's output re-framed for a consumer on the far side of a network
//! hop. One `data:` line per event, no `event:` lines:
//!
//! ```text
//! data: {"content":"Hel","done":false}
//!
//! data: {"content":"","done":true}
//!
//! data: {"error":"...","code":"API_ERROR","retriesAttempted":3,"isRetryError":true,"done":true}
//! ```

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::prompts::build_conversation;
use super::session::AgentRole;
use crate::error::{ErrorCode, GatewayError, Result};
use crate::llm::streaming::parse_sse_line;
use crate::llm::{CompletionRequest, ContentDelta, Message, StreamingGateway};

/// One relay event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
        #[serde(
            rename = "retriesAttempted",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        retries_attempted: Option<u32>,
        #[serde(rename = "isRetryError", default)]
        is_retry_error: bool,
        done: bool,
    },
    Content {
        #[serde(default)]
        content: String,
        #[serde(default)]
        done: bool,
    },
}

impl RelayEvent {
    pub fn from_delta(delta: &ContentDelta) -> Self {
        RelayEvent::Content {
            content: delta.text.clone(),
            done: delta.done,
        }
    }

    pub fn from_error(err: &GatewayError) -> Self {
        RelayEvent::Error {
            error: err.to_string(),
            code: err.code(),
            retries_attempted: err.retries_attempted(),
            is_retry_error: err.is_retry_error(),
            done: true,
        }
    }

    pub fn is_done(&self) -> bool {
        match self {
            RelayEvent::Error { done, .. } | RelayEvent::Content { done, .. } => *done,
        }
    }

    /// `data: <json>\n\n`
    pub fn encode(&self) -> Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }

    /// Decodes one line; anything that is not a well-formed `data:` event is `None`.
    pub fn decode_line(line: &str) -> Option<Self> {
        let data = parse_sse_line(line.trim_end_matches('\r'))?;
        match serde_json::from_str(data) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("Skipping malformed relay frame: {}", e);
                None
            }
        }
    }

    /// Error frames as a [`GatewayError::Stream`].
    pub fn into_error(self) -> Option<GatewayError> {
        match self {
            RelayEvent::Error {
                error,
                code,
                retries_attempted,
                is_retry_error,
                ..
            } => Some(GatewayError::Stream {
                message: error,
                code,
                retries_attempted,
                is_retry_error,
            }),
            RelayEvent::Content { .. } => None,
        }
    }
}

/// Message as carried in a relay request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub role: crate::llm::Role,
    pub content: String,
}

/// Body a relay client POSTs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub role: AgentRole,
    pub messages: Vec<RelayMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_document: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl RelayRequest {
    /// Gateway request with the role prompt and context merged into one system message.
    pub fn into_completion_request(self) -> CompletionRequest {
        let history = self
            .messages
            .into_iter()
            .map(|m| Message::new(m.role, m.content))
            .collect();
        let context = self.context_document.filter(|c| !c.is_empty());

        let mut request = CompletionRequest::new(build_conversation(
            self.role,
            context.as_deref(),
            history,
        ))
        .with_reference_images(self.reference_images);
        request.model = self.model;
        request.temperature = self.temperature;
        request
    }
}

/// Runs `request` through the gateway and writes relay frames to `out`.
///
/// Gateway failures become a single error frame, so only write failures
/// are returned as `Err`.
pub async fn relay_completion<W>(
    gateway: &StreamingGateway,
    request: CompletionRequest,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match gateway.stream_completion(request).await {
        Ok(mut stream) => {
            while let Some(delta) = stream.recv().await {
                out.write_all(RelayEvent::from_delta(&delta).encode()?.as_bytes())
                    .await?;
                out.flush().await?;
                if delta.done {
                    break;
                }
            }
        }
        Err(e) => {
            tracing::warn!("Relaying gateway failure: {}", e);
            out.write_all(RelayEvent::from_error(&e).encode()?.as_bytes())
                .await?;
        }
    }
    out.flush().await?;
    Ok(())
}
