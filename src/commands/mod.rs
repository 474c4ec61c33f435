//! Command implementations.
//!
//! # Modules
//! - `chat` - One consumer send with live output.
//! - `relay` - Gateway output re-framed as relay frames on stdout.
//! - `config` - Configuration inspection.
//!
//! # Architecture
//! ```text
//! CLI (cli.rs)
//!   ├── commands/chat.rs ─> chat::StreamConsumer ─> GatewaySource | RelaySource
//!   ├── commands/relay.rs ─> chat::relay_completion
//!   └── commands/config.rs
//! ```

/// Single chat turn.
pub mod chat;
/// Configuration show/validate commands.
pub mod config;
/// Relay grammar writer.
pub mod relay;

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::cli::TurnArgs;
use crate::error::{GatewayError, Result};

/// Turns a `--image` argument into something the adapter accepts.
///
/// URLs (`http(s)://`, `data:`) pass through; anything else is read as a
/// local file and inlined as a base64 data URL.
pub(crate) async fn resolve_image(arg: &str) -> Result<String> {
    if arg.starts_with("http://") || arg.starts_with("https://") || arg.starts_with("data:") {
        return Ok(arg.to_string());
    }

    let path = Path::new(arg);
    let media_type = image_media_type(path).ok_or_else(|| {
        GatewayError::InvalidInput(format!("unsupported image type: {}", path.display()))
    })?;
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!("Inlining {} ({} bytes)", path.display(), bytes.len());

    Ok(format!("data:{};base64,{}", media_type, STANDARD.encode(bytes)))
}

fn image_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Reads `--context` and resolves every `--image`.
pub(crate) async fn load_turn_inputs(turn: &TurnArgs) -> Result<(Option<String>, Vec<String>)> {
    let context = match &turn.context {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    let mut images = Vec::with_capacity(turn.images.len());
    for arg in &turn.images {
        images.push(resolve_image(arg).await?);
    }
    Ok((context, images))
}
