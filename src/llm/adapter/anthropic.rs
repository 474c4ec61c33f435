use serde::{Deserialize, Serialize};

use super::join_system_text;
use crate::llm::{ContentPart, Message, MessageContent, Role};

/// Fixed output budget for every Anthropic request.
pub const MAX_TOKENS: u32 = 8192;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: Role,
    pub content: AnthropicContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

/// Splits a `data:image/<subtype>;base64,<payload>` URL into media type and payload.
///
/// Same acceptance as `^data:(image/[^;]+);base64,(.+)$`: the payload must be
/// non-empty and on a single line.
pub fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, rest) = rest.split_once(';')?;
    let data = rest.strip_prefix("base64,")?;

    let subtype = media_type.strip_prefix("image/")?;
    if subtype.is_empty() || data.is_empty() {
        return None;
    }
    if data.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    Some((media_type, data))
}

fn convert_part(part: &ContentPart) -> Option<AnthropicBlock> {
    match part {
        ContentPart::Text { text } => Some(AnthropicBlock::Text { text: text.clone() }),
        ContentPart::ImageUrl { image_url } => {
            let url = image_url.url.as_str();
            if url.starts_with("data:") {
                match parse_data_url(url) {
                    Some((media_type, data)) => Some(AnthropicBlock::Image {
                        source: ImageSource::Base64 {
                            media_type: media_type.to_string(),
                            data: data.to_string(),
                        },
                    }),
                    None => {
                        tracing::warn!("Dropping malformed data URL image ({} bytes)", url.len());
                        None
                    }
                }
            } else {
                Some(AnthropicBlock::Image {
                    source: ImageSource::Url {
                        url: url.to_string(),
                    },
                })
            }
        }
    }
}

/// Converts provider-agnostic messages.
///
/// System messages are lifted into the returned system text, joined by a
/// blank line. Multimodal system content contributes its text parts joined
/// by newlines.
pub fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let system = join_system_text(messages);

    let converted = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| AnthropicMessage {
            role: m.role,
            content: match &m.content {
                MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
                MessageContent::Parts(parts) => {
                    AnthropicContent::Blocks(parts.iter().filter_map(convert_part).collect())
                }
            },
        })
        .collect();

    (system, converted)
}

pub fn build_request(model: &str, messages: &[Message], temperature: f32) -> AnthropicRequest {
    let (system, messages) = convert_messages(messages);
    AnthropicRequest {
        model: model.to_string(),
        system,
        messages,
        max_tokens: MAX_TOKENS,
        temperature,
        stream: true,
    }
}

/// Converts a request back to provider-agnostic messages.
///
/// The system text, if any, comes back as one leading system message.
pub fn to_messages(request: &AnthropicRequest) -> Vec<Message> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(Message::system(system.as_str()));
    }

    for message in &request.messages {
        let content = match &message.content {
            AnthropicContent::Text(text) => MessageContent::Text(text.clone()),
            AnthropicContent::Blocks(blocks) => MessageContent::Parts(
                blocks
                    .iter()
                    .map(|block| match block {
                        AnthropicBlock::Text { text } => ContentPart::text(text.as_str()),
                        AnthropicBlock::Image {
                            source: ImageSource::Base64 { media_type, data },
                        } => ContentPart::image(format!("data:{};base64,{}", media_type, data)),
                        AnthropicBlock::Image {
                            source: ImageSource::Url { url },
                        } => ContentPart::image(url.as_str()),
                    })
                    .collect(),
            ),
        };
        messages.push(Message::new(message.role, content));
    }
    messages
}

pub fn headers(token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("x-api-key", token.to_string()),
        ("anthropic-version", ANTHROPIC_VERSION.to_string()),
    ]
}
