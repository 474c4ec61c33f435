//! Network and HTTP configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Network configuration.
///
/// Controls the per-attempt deadline and retry behavior of upstream calls.
///
/// # Fields
/// - `max_attempts`: total attempts per call, first one included (default: `3`)
/// - `openai_timeout_secs`: per-attempt deadline for OpenAI-style calls (default: `30`)
/// - `anthropic_timeout_secs`: per-attempt deadline for Anthropic-style calls (default: `60`)
/// - `retry_delay_ms`: fixed delay between attempts in milliseconds (default: `1000`)
/// - `connect_timeout_secs`: TCP connect timeout in seconds (default: `10`)
///
/// # Example
/// ```toml
/// [network]
/// max_attempts = 3
/// openai_timeout_secs = 30
/// anthropic_timeout_secs = 60
/// retry_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Total attempts per upstream call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt deadline for OpenAI-style calls, in seconds.
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,

    /// Per-attempt deadline for Anthropic-style calls, in seconds.
    #[serde(default = "default_anthropic_timeout_secs")]
    pub anthropic_timeout_secs: u64,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// TCP connect timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            openai_timeout_secs: default_openai_timeout_secs(),
            anthropic_timeout_secs: default_anthropic_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl NetworkConfig {
    /// Validates network configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GatewayError::Config(
                "network.max_attempts cannot be 0".into(),
            ));
        }
        if self.openai_timeout_secs == 0 || self.anthropic_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "network timeouts cannot be 0".into(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "network.connect_timeout_secs cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_openai_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60 // Anthropic is slower to send headers
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_secs() -> u64 {
    10
}
