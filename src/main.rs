#[macro_use]
extern crate rust_i18n;

use chatgate::*;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};
use cli::{Cli, Commands};
use tokio::runtime::Runtime;

// Initialize i18n for binary crate
i18n!("locales", fallback = "en");

fn main() -> Result<()> {
    human_panic::setup_panic!();

    // 在解析 CLI 之前初始化语言（支持多语言 help text）
    init_locale_early();

    let cli = parse_cli_localized()?;

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // 日志写到 stderr，stdout 只留给回复文本 / relay 帧
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .init();

    let config_path = cli.config.as_deref();

    // config 命令自行加载配置（允许在配置损坏时给出错误位置）
    if let Commands::Config { action } = &cli.command {
        let colored = config::load_config(config_path)
            .map(|c| c.ui.colored)
            .unwrap_or(true);
        if let Err(e) = commands::config::run(action, config_path, colored) {
            report(&e, colored);
            std::process::exit(1);
        }
        return Ok(());
    }

    let config = config::load_config(config_path)?;
    let colored = config.ui.colored;

    let rt = Runtime::new()?;

    rt.block_on(async {
        let result = match &cli.command {
            Commands::Chat { turn } => commands::chat::run(turn, &config).await,
            Commands::Relay { turn } => commands::relay::run(turn, &config).await,
            Commands::Config { .. } => Ok(()),
        };

        if let Err(e) = result {
            report(&e, colored);
            std::process::exit(1);
        }
        Ok(())
    })
}

/// 输出错误及解决建议
fn report(e: &error::GatewayError, colored: bool) {
    ui::error(&e.to_string(), colored);
    if let Some(suggestion) = e.suggestion() {
        eprintln!();
        eprintln!("{}", ui::info(suggestion, colored));
    }
}

/// Parse CLI arguments with localized help text
fn parse_cli_localized() -> Result<Cli> {
    let turn_args = |cmd: clap::Command| {
        cmd.mut_arg("role", |arg| arg.help(rust_i18n::t!("cli.turn.role").to_string()))
            .mut_arg("model", |arg| arg.help(rust_i18n::t!("cli.turn.model").to_string()))
            .mut_arg("temperature", |arg| {
                arg.help(rust_i18n::t!("cli.turn.temperature").to_string())
            })
            .mut_arg("context", |arg| {
                arg.help(rust_i18n::t!("cli.turn.context").to_string())
            })
            .mut_arg("images", |arg| {
                arg.help(rust_i18n::t!("cli.turn.images").to_string())
            })
            .mut_arg("text", |arg| arg.help(rust_i18n::t!("cli.turn.text").to_string()))
    };

    let cmd = Cli::command()
        .about(rust_i18n::t!("cli.about").to_string())
        .mut_arg("verbose", |arg| {
            arg.help(rust_i18n::t!("cli.verbose").to_string())
        })
        .mut_arg("config", |arg| {
            arg.help(rust_i18n::t!("cli.config_path").to_string())
        })
        .mut_subcommand("chat", |cmd| {
            turn_args(cmd.about(rust_i18n::t!("cli.chat").to_string()))
        })
        .mut_subcommand("relay", |cmd| {
            turn_args(cmd.about(rust_i18n::t!("cli.relay").to_string()))
        })
        .mut_subcommand("config", |cmd| {
            cmd.about(rust_i18n::t!("cli.config").to_string())
                .mut_subcommand("show", |s| {
                    s.about(rust_i18n::t!("cli.config.show").to_string())
                })
                .mut_subcommand("validate", |s| {
                    s.about(rust_i18n::t!("cli.config.validate").to_string())
                })
        });

    let matches = cmd.get_matches();
    Cli::from_arg_matches(&matches)
        .map_err(|e| anyhow::anyhow!("Failed to parse CLI arguments: {}", e))
}

/// Initialize locale early in the startup process
///
/// Priority order:
/// 1. Environment variable CHATGATE_UI_LANGUAGE (highest priority)
/// 2. Configuration file ui.language
/// 3. System locale detection
/// 4. Fallback to English
fn init_locale_early() {
    let locale = std::env::var("CHATGATE_UI_LANGUAGE")
        .ok()
        .or_else(|| {
            config::load_config(None)
                .ok()
                .and_then(|c| c.ui.language)
        })
        .or_else(detect_system_locale)
        .unwrap_or_else(|| "en".to_string());

    rust_i18n::set_locale(&locale);
}

/// Detect system locale using sys-locale crate
///
/// Returns locale in BCP 47 format (e.g., "en", "th-TH")
fn detect_system_locale() -> Option<String> {
    sys_locale::get_locale().map(|locale| locale.replace('_', "-"))
}
