use std::path::Path;

use colored::Colorize;

use crate::cli::ConfigAction;
use crate::config::{AppConfig, get_config_dir, load_config};
use crate::error::Result;
use crate::llm::utils::mask_api_key;
use crate::llm::{ModelFamily, StreamingGateway};
use crate::ui;

pub fn run(action: &ConfigAction, config_path: Option<&Path>, colored: bool) -> Result<()> {
    match action {
        ConfigAction::Show => show(config_path, colored),
        ConfigAction::Validate => validate(config_path, colored),
    }
}

/// 打印生效配置（token 脱敏）
fn show(config_path: Option<&Path>, colored: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if let Some(dir) = get_config_dir() {
        println!(
            "{}",
            ui::info(
                &rust_i18n::t!(
                    "config.location",
                    path = dir.join("config.toml").display().to_string()
                ),
                colored
            )
        );
        println!();
    }

    println!("{}", render(&config)?);

    let token = config
        .provider
        .api_token
        .as_deref()
        .map(mask_api_key)
        .unwrap_or_else(|| rust_i18n::t!("config.token_unset").to_string());
    let label = "api_token";
    if colored {
        println!("{} = {}", label.bold(), token.yellow());
    } else {
        println!("{} = {}", label, token);
    }
    Ok(())
}

/// 校验配置
fn validate(config_path: Option<&Path>, colored: bool) -> Result<()> {
    ui::step("1/2", &rust_i18n::t!("config.loading"), colored);
    let config = load_config(config_path)?;
    ui::success(&rust_i18n::t!("config.loaded"), colored);

    ui::step("2/2", &rust_i18n::t!("config.checking"), colored);
    config.validate()?;
    config.provider.require_token()?;

    // 构造 client 以校验代理配置
    let gateway = StreamingGateway::from_config(&config)?;
    let family = ModelFamily::for_model(&config.provider.model);
    ui::success(
        &rust_i18n::t!(
            "config.validated",
            model = config.provider.model.as_str(),
            family = family.label(),
            endpoint = gateway.endpoint(family)
        ),
        colored,
    );
    Ok(())
}

/// Pretty JSON of the configuration; the token never serializes.
fn render(config: &AppConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
