use serde::{Deserialize, Serialize};

use super::join_system_text;
use crate::llm::{Message, Role};

/// OpenAI chat-completions request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub stream: bool,
}

/// Build a streaming request.
///
/// Messages pass through unchanged, except that several system messages are
/// folded into one leading system message.
pub fn build_request(model: &str, messages: &[Message], temperature: f32) -> OpenAIRequest {
    let system_count = messages.iter().filter(|m| m.role == Role::System).count();

    let messages = if system_count > 1 {
        let mut merged = Vec::with_capacity(messages.len() - system_count + 1);
        if let Some(system) = join_system_text(messages) {
            merged.push(Message::system(system));
        }
        merged.extend(messages.iter().filter(|m| m.role != Role::System).cloned());
        merged
    } else {
        messages.to_vec()
    };

    OpenAIRequest {
        model: model.to_string(),
        messages,
        temperature,
        stream: true,
    }
}

/// Messages carried by a request, in provider-agnostic form.
pub fn to_messages(request: &OpenAIRequest) -> Vec<Message> {
    request.messages.clone()
}

pub fn headers(token: &str) -> Vec<(&'static str, String)> {
    vec![("Authorization", format!("Bearer {}", token))]
}
