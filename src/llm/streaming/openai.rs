use serde::Deserialize;

use super::parse_sse_line;
use crate::llm::ContentDelta;

/// delta structure of an OpenAI streaming chunk
#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    #[serde(default)]
    choices: Vec<OpenAIDeltaChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDeltaChoice {
    #[serde(default)]
    delta: OpenAIDeltaContent,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIDeltaContent {
    content: Option<String>,
}

/// Parse one line of an OpenAI chat-completions stream.
///
/// ```text
/// data: {"id":"...","choices":[{"delta":{"content":"Hello"}}]}
///
/// data: [DONE]
/// ```
///
/// `[DONE]` yields nothing: the stream terminal is added after the body ends.
/// Malformed JSON is logged and skipped.
pub fn parse_openai_line(line: &str) -> Option<ContentDelta> {
    let data = parse_sse_line(line.trim())?;
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<OpenAIDelta>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(ContentDelta::text),
        Err(e) => {
            tracing::warn!("Failed to parse SSE data: {}, line: {}", e, data);
            None
        }
    }
}
