use crate::chat::relay::{RelayMessage, RelayRequest, relay_completion};
use crate::cli::TurnArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::{Role, StreamingGateway};

use super::load_turn_inputs;

/// Streams one completion to stdout in the relay grammar.
///
/// Upstream failures are written as an error frame rather than returned.
pub async fn run(turn: &TurnArgs, config: &AppConfig) -> Result<()> {
    let (context, images) = load_turn_inputs(turn).await?;
    let request = RelayRequest {
        role: turn.role,
        messages: vec![RelayMessage {
            role: Role::User,
            content: turn.message(),
        }],
        context_document: context,
        reference_images: images,
        model: turn.model.clone(),
        temperature: turn.temperature,
    };

    let gateway = StreamingGateway::from_config(config)?;
    let mut stdout = tokio::io::stdout();
    relay_completion(&gateway, request.into_completion_request(), &mut stdout).await
}
