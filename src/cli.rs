use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::styling};

use crate::chat::AgentRole;

const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::Green.on_default().bold())
    .usage(styling::AnsiColor::Green.on_default().bold())
    .literal(styling::AnsiColor::Cyan.on_default().bold())
    .placeholder(styling::AnsiColor::Cyan.on_default());

#[derive(Parser)]
#[command(name = "chatgate")]
#[command(author, version, long_about = None)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Options shared by `chat` and `relay`.
#[derive(Args, Debug, Clone)]
pub struct TurnArgs {
    /// Agent role answering the message
    #[arg(short, long, value_enum, default_value = "ba")]
    pub role: AgentRole,

    /// Model override (a `claude-` prefix selects the Anthropic upstream)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature override
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Context document merged into the system prompt
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Reference image, as a URL or a local file (repeatable)
    #[arg(short, long = "image")]
    pub images: Vec<String>,

    /// Message text
    #[arg(trailing_var_arg = true, required = true)]
    pub text: Vec<String>,
}

impl TurnArgs {
    pub fn message(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one message and print the streamed reply
    Chat {
        #[command(flatten)]
        turn: TurnArgs,
    },

    /// Stream one completion to stdout as relay frames
    Relay {
        #[command(flatten)]
        turn: TurnArgs,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Validate the effective configuration
    Validate,
}
