use serde::Deserialize;

use super::parse_sse_line;
use crate::llm::ContentDelta;

/// Anthropic SSE event type
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicSSEEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: AnthropicTextDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicTextDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: String,
}

/// Parse one line of an Anthropic messages stream.
///
/// ```text
/// event: content_block_delta
/// data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}
///
/// event: message_stop
/// data: {"type":"message_stop"}
/// ```
///
/// `event:` lines carry nothing. `message_stop` yields the terminal delta.
pub fn parse_anthropic_line(line: &str) -> Option<ContentDelta> {
    let line = line.trim();
    if line.starts_with("event:") {
        return None;
    }
    let data = parse_sse_line(line)?;

    match serde_json::from_str::<AnthropicSSEEvent>(data) {
        Ok(AnthropicSSEEvent::ContentBlockDelta { delta }) => {
            (delta.delta_type == "text_delta" && !delta.text.is_empty())
                .then(|| ContentDelta::text(delta.text))
        }
        Ok(AnthropicSSEEvent::MessageStop) => Some(ContentDelta::terminal()),
        Ok(AnthropicSSEEvent::Other) => None,
        Err(e) => {
            tracing::warn!("Failed to parse Anthropic SSE data: {}, line: {}", e, data);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_then_text_delta() {
        let lines = [
            "event: content_block_delta",
            r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Yo"}}"#,
        ];
        let deltas: Vec<_> = lines
            .iter()
            .filter_map(|line| parse_anthropic_line(line))
            .collect();
        assert_eq!(deltas, vec![ContentDelta::text("Yo")]);
    }

    #[test]
    fn test_message_stop_is_terminal_without_text() {
        let delta = parse_anthropic_line(r#"data: {"type":"message_stop"}"#).unwrap();
        assert!(delta.done);
        assert_eq!(delta.text, "");
    }

    #[test]
    fn test_other_events_are_ignored() {
        for line in [
            r#"data: {"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"data: {"type":"ping"}"#,
            r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
            r#"data: {"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{"}}"#,
            r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":""}}"#,
            "event: message_stop",
        ] {
            assert_eq!(parse_anthropic_line(line), None, "{}", line);
        }
    }

    #[test]
    fn test_malformed_json_is_swallowed() {
        for _ in 0..3 {
            assert_eq!(parse_anthropic_line("data: {\"type\":"), None);
        }
    }
}
