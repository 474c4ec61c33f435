use crate::chat::{
    CompletionSource, GatewaySource, RelaySource, SendOptions, SessionStore, StreamConsumer,
};
use crate::cli::TurnArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::StreamingGateway;
use crate::ui;
use crate::ui::streaming::StreamingOutput;

use super::load_turn_inputs;

/// Sends one message through the configured source and prints the reply live.
pub async fn run(turn: &TurnArgs, config: &AppConfig) -> Result<()> {
    let colored = config.ui.colored;
    let (context, images) = load_turn_inputs(turn).await?;
    let options = SendOptions {
        context,
        reference_images: images,
        model: turn.model.clone(),
        temperature: turn.temperature,
    };

    match config.chat.relay_url.as_deref() {
        Some(url) => {
            ui::step(
                turn.role.as_str(),
                &rust_i18n::t!("chat.via_relay", url = url),
                colored,
            );
            let source = RelaySource::new(url, &config.network)?;
            send(source, turn, &options, config).await
        }
        None => {
            let gateway = StreamingGateway::from_config(config)?;
            ui::step(
                turn.role.as_str(),
                &rust_i18n::t!(
                    "chat.via_gateway",
                    model = turn.model.as_deref().unwrap_or(&config.provider.model)
                ),
                colored,
            );
            send(GatewaySource::new(gateway), turn, &options, config).await
        }
    }
}

async fn send<S: CompletionSource>(
    source: S,
    turn: &TurnArgs,
    options: &SendOptions,
    config: &AppConfig,
) -> Result<()> {
    let colored = config.ui.colored;
    let consumer = StreamConsumer::new(source, &config.chat);
    let store = SessionStore::new();
    store.activate(turn.role).await;

    let mut session = store.lock(turn.role).await;
    let output = StreamingOutput::new(colored);
    let result = consumer
        .send_message(&mut session, &turn.message(), options, &output)
        .await;
    output.finish();

    let reply = result?;
    if reply.is_empty() {
        if let Some(failure) = &session.last_error {
            ui::warning(&failure.message, colored);
        }
    } else {
        tracing::debug!("Reply complete ({} chars)", reply.chars().count());
    }
    Ok(())
}
