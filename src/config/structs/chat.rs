//! Stream consumer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Chat / stream consumer configuration.
///
/// # Fields
/// - `max_empty_retries`: how many times a blank completion is re-requested (default: `3`)
/// - `empty_retry_delay_ms`: pause before each re-request (default: `1000`)
/// - `relay_url`: consume through a relay endpoint instead of calling upstream in-process
///
/// # Example
/// ```toml
/// [chat]
/// max_empty_retries = 3
/// empty_retry_delay_ms = 1000
/// relay_url = "http://localhost:3000/api/ai/stream"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default = "default_max_empty_retries")]
    pub max_empty_retries: u32,

    #[serde(default = "default_empty_retry_delay_ms")]
    pub empty_retry_delay_ms: u64,

    #[serde(default)]
    pub relay_url: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_empty_retries: default_max_empty_retries(),
            empty_retry_delay_ms: default_empty_retry_delay_ms(),
            relay_url: None,
        }
    }
}

impl ChatConfig {
    pub fn empty_retry_delay(&self) -> Duration {
        Duration::from_millis(self.empty_retry_delay_ms)
    }
}

fn default_max_empty_retries() -> u32 {
    3
}

fn default_empty_retry_delay_ms() -> u64 {
    1000
}
