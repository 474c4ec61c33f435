//! Top-level application configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::chat::ChatConfig;
use super::network::NetworkConfig;
use super::provider::ProviderConfig;

/// Application configuration.
///
/// Effective configuration is merged from multiple sources (low to high):
/// 1. Rust defaults (`Default` + `serde(default)`)
/// 2. User-level config file (platform-specific config directory)
/// 3. `CHATGATE__*` environment variables
/// 4. Legacy `AI_PROVIDER_*` environment variables
///
/// # Configuration File Locations
/// - Linux: `~/.config/chatgate/config.toml`
/// - macOS: `~/Library/Application Support/chatgate/config.toml`
/// - Windows: `%APPDATA%\chatgate\config\config.toml`
///
/// # Example
/// ```toml
/// [provider]
/// api_token = "sk-..."
/// model = "claude-sonnet-4-5"
///
/// [network]
/// max_attempts = 3
///
/// [chat]
/// max_empty_retries = 3
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Upstream endpoint, token and model.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Timeouts and retry settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Stream consumer behavior.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Terminal UI behavior.
    #[serde(default)]
    pub ui: UIConfig,
}

impl AppConfig {
    /// Validates configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.network.validate()?;
        Ok(())
    }
}

/// UI configuration.
///
/// # Fields
/// - `colored`: enable colored output (default: `true`)
/// - `language`: UI language (for example `"en"`, `"th"`), auto-detected by default
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UIConfig {
    #[serde(default = "default_true")]
    pub colored: bool,

    #[serde(default)]
    pub language: Option<String>,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colored: true,
            language: None,
        }
    }
}

fn default_true() -> bool {
    true
}
