// 配置模块测试
//
// 默认值、校验与序列化。

use super::*;
use pretty_assertions::assert_eq;

// === 默认值测试 ===

#[test]
fn test_app_config_default_provider() {
    let config = AppConfig::default();
    assert_eq!(
        config.provider.api_url,
        "https://api.z.ai/api/paas/v4/chat/completions"
    );
    assert_eq!(
        config.provider.anthropic_url,
        "https://api.anthropic.com/v1/messages"
    );
    assert_eq!(config.provider.model, "GLM-4.6");
    assert_eq!(config.provider.proxy_url, None);
    assert!((config.provider.temperature - 0.7).abs() < f32::EPSILON);
}

#[test]
fn test_app_config_default_network() {
    let config = AppConfig::default();
    assert_eq!(config.network.max_attempts, 3);
    assert_eq!(config.network.openai_timeout_secs, 30);
    assert_eq!(config.network.anthropic_timeout_secs, 60);
    assert_eq!(config.network.retry_delay_ms, 1000);
    assert_eq!(config.network.connect_timeout_secs, 10);
}

#[test]
fn test_app_config_default_chat() {
    let config = AppConfig::default();
    assert_eq!(config.chat.max_empty_retries, 3);
    assert_eq!(config.chat.empty_retry_delay_ms, 1000);
    assert_eq!(config.chat.relay_url, None);
    assert!(config.ui.colored);
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

// === 校验 ===

#[test]
fn test_validate_rejects_zero_attempts() {
    let mut config = AppConfig::default();
    config.network.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let mut config = AppConfig::default();
    config.network.anthropic_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_temperature_out_of_range() {
    let mut config = AppConfig::default();
    config.provider.temperature = 2.5;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("temperature"));
}

#[test]
fn test_validate_rejects_bad_proxy() {
    let mut config = AppConfig::default();
    config.provider.proxy_url = Some("not a url".to_string());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("proxy"));
}

#[test]
fn test_require_token() {
    let mut provider = ProviderConfig::default();
    assert!(provider.require_token().is_err());

    provider.api_token = Some("   ".to_string());
    assert!(provider.require_token().is_err());

    provider.api_token = Some("sk-test".to_string());
    assert_eq!(provider.require_token().unwrap(), "sk-test");
}

// === 序列化 ===

#[test]
fn test_token_is_never_serialized() {
    let mut config = AppConfig::default();
    config.provider.api_token = Some("sk-secret-token-value".to_string());

    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("sk-secret-token-value"));
}

#[test]
fn test_debug_masks_token() {
    let provider = ProviderConfig {
        api_token: Some("sk-ant-api03-abcdefgh".to_string()),
        ..Default::default()
    };
    let debug = format!("{:?}", provider);
    assert!(debug.contains("sk-a...efgh"));
    assert!(!debug.contains("api03"));
}
