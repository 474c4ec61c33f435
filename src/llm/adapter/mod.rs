//! Message format adapters
//!
//! Pure conversions between [`Message`] and the two upstream request shapes.
//! No I/O happens here.

pub mod anthropic;
pub mod openai;

use serde::Serialize;

use crate::llm::{ContentPart, Message, MessageContent, ModelFamily, Role};

pub use anthropic::AnthropicRequest;
pub use openai::OpenAIRequest;

/// Request body for whichever family was selected.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpstreamRequest {
    OpenAI(OpenAIRequest),
    Anthropic(AnthropicRequest),
}

/// Builds the upstream body for `family`.
pub fn build_request(
    family: ModelFamily,
    model: &str,
    messages: &[Message],
    temperature: f32,
) -> UpstreamRequest {
    match family {
        ModelFamily::OpenAICompatible => {
            UpstreamRequest::OpenAI(openai::build_request(model, messages, temperature))
        }
        ModelFamily::AnthropicCompatible => {
            UpstreamRequest::Anthropic(anthropic::build_request(model, messages, temperature))
        }
    }
}

/// Family-specific auth and version headers.
pub fn auth_headers(family: ModelFamily, token: &str) -> Vec<(&'static str, String)> {
    match family {
        ModelFamily::OpenAICompatible => openai::headers(token),
        ModelFamily::AnthropicCompatible => anthropic::headers(token),
    }
}

/// Merges reference images into the first user message.
///
/// Text content becomes `[text, image, image, ...]`; multimodal content gets
/// the images appended. Later user messages are never touched. Returns
/// whether a message was changed.
pub fn attach_reference_images(messages: &mut [Message], images: &[String]) -> bool {
    if images.is_empty() {
        return false;
    }
    let Some(first_user) = messages.iter_mut().find(|m| m.role == Role::User) else {
        tracing::debug!("No user message to attach {} images to", images.len());
        return false;
    };

    let mut parts = match std::mem::replace(&mut first_user.content, MessageContent::Parts(Vec::new()))
    {
        MessageContent::Text(text) => vec![ContentPart::text(text)],
        MessageContent::Parts(parts) => parts,
    };
    parts.extend(images.iter().map(ContentPart::image));
    first_user.content = MessageContent::Parts(parts);
    true
}

/// Joins the text of every system message with a blank line.
pub(crate) fn join_system_text<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Option<String> {
    let texts: Vec<String> = messages
        .into_iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.joined_text())
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n\n"))
}
