//! Endpoint and logging helpers shared by both upstream families.

/// Path appended to bare OpenAI-compatible base URLs.
pub const OPENAI_API_SUFFIX: &str = "/v1/chat/completions";

/// Path appended to bare Anthropic-compatible base URLs.
pub const ANTHROPIC_API_SUFFIX: &str = "/v1/messages";

/// Completes a configured upstream URL to a full endpoint.
///
/// Only a bare `scheme://host[:port]` gains the suffix. Any URL with a path
/// is posted to as configured.
///
/// # Example
/// ```
/// use chatgate::llm::utils::complete_endpoint;
///
/// assert_eq!(
///     complete_endpoint("https://api.anthropic.com/", "/v1/messages"),
///     "https://api.anthropic.com/v1/messages"
/// );
/// assert_eq!(
///     complete_endpoint("https://gw.local/completions", "/v1/chat/completions"),
///     "https://gw.local/completions"
/// );
/// ```
pub fn complete_endpoint(base_url: &str, expected_suffix: &str) -> String {
    let url = base_url.trim_end_matches('/');
    if path_depth(url) > 0 {
        return url.to_string();
    }
    format!("{}/{}", url, expected_suffix.trim_start_matches('/'))
}

/// Number of non-empty path segments after the host.
fn path_depth(url: &str) -> usize {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split_once('/')
        .map(|(_, path)| path.split('/').filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Masks a credential for logs and `Debug` output.
///
/// Keys longer than 8 characters keep their first and last 4 characters.
///
/// # Example
/// ```
/// use chatgate::llm::utils::mask_api_key;
///
/// assert_eq!(mask_api_key("sk-ant-api03-abcdefgh"), "sk-a...efgh");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}
