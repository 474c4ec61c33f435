// 配置加载逻辑
//
// 此文件负责从文件、环境变量和旧版 AI_PROVIDER_* 变量加载配置。

use config::{Config, Environment, File};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

use super::structs::AppConfig;
use crate::error::Result;

/// Legacy flat variables of the original deployment.
const ENV_API_URL: &str = "AI_PROVIDER_API_URL";
const ENV_API_TOKEN: &str = "AI_PROVIDER_API_TOKEN";
const ENV_MODEL: &str = "AI_PROVIDER_MODEL";
const ENV_PROXY_URL: &str = "AI_PROVIDER_PROXY_URL";

/// 加载应用配置
///
/// 配置加载优先级（从高到低）：
/// 1. 旧版环境变量（`AI_PROVIDER_API_URL` / `AI_PROVIDER_API_TOKEN` / `AI_PROVIDER_MODEL` / `AI_PROVIDER_PROXY_URL`）
/// 2. 环境变量（CHATGATE__* 前缀，双下划线表示嵌套）
///    - 例如：`CHATGATE__NETWORK__MAX_ATTEMPTS=5`
/// 3. 配置文件（~/.config/chatgate/config.toml 或 `--config` 指定的路径）
/// 4. 默认值
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    // 1. 加载配置文件（如果存在）
    let config_path = explicit_path.map(Path::to_path_buf).or_else(get_config_path);
    if let Some(config_path) = config_path
        && config_path.exists()
    {
        tracing::debug!("Loading config file: {}", config_path.display());
        builder = builder.add_source(File::from(config_path));
    }

    // 2. 加载环境变量（CHATGATE__*）
    // 使用双下划线作为嵌套层级分隔符，避免与字段名中的单下划线冲突
    builder = builder.add_source(
        Environment::with_prefix("CHATGATE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut app_config: AppConfig = config.try_deserialize()?;

    // 3. 旧版变量覆盖（优先级最高）
    apply_legacy_env_overrides(&mut app_config);

    Ok(app_config)
}

/// 应用旧版 `AI_PROVIDER_*` 环境变量覆盖
///
/// 空字符串视为未设置（与原部署的 `|| ''` 默认值一致）。
fn apply_legacy_env_overrides(config: &mut AppConfig) {
    if let Some(url) = non_empty_env(ENV_API_URL) {
        config.provider.api_url = url;
    }
    if let Some(token) = non_empty_env(ENV_API_TOKEN) {
        config.provider.api_token = Some(token);
    }
    if let Some(model) = non_empty_env(ENV_MODEL) {
        config.provider.model = model;
    }
    if let Some(proxy) = non_empty_env(ENV_PROXY_URL) {
        tracing::debug!("Using outbound proxy from {}", ENV_PROXY_URL);
        config.provider.proxy_url = Some(proxy);
    }
    // An empty proxy in the file means "no proxy" too.
    if config
        .provider
        .proxy_url
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        config.provider.proxy_url = None;
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 获取配置文件路径
///
/// 返回 ~/.config/chatgate/config.toml
fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// 获取配置目录路径
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "chatgate").map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    /// RAII 环境变量 guard，确保测试后清理
    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = env::var(key).ok();
            // SAFETY: 测试环境中修改环境变量是安全的，且使用 serial_test 确保串行执行
            unsafe { env::set_var(key, value) };
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = env::var(key).ok();
            // SAFETY: 同上
            unsafe { env::remove_var(key) };
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: 测试环境中修改环境变量是安全的
            match &self.original {
                Some(v) => unsafe { env::set_var(&self.key, v) },
                None => unsafe { env::remove_var(&self.key) },
            }
        }
    }

    fn clear_legacy_env() -> Vec<EnvGuard> {
        [ENV_API_URL, ENV_API_TOKEN, ENV_MODEL, ENV_PROXY_URL]
            .iter()
            .map(|k| EnvGuard::unset(k))
            .collect()
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let _guards = clear_legacy_env();
        let missing = Path::new("/nonexistent/chatgate/config.toml");
        let config = load_config(Some(missing)).unwrap();

        assert_eq!(config.provider.model, "GLM-4.6");
        assert_eq!(config.provider.api_token, None);
        assert_eq!(config.network.max_attempts, 3);
        assert_eq!(config.network.openai_timeout_secs, 30);
        assert_eq!(config.network.anthropic_timeout_secs, 60);
        assert_eq!(config.chat.max_empty_retries, 3);
    }

    #[test]
    #[serial]
    fn test_file_values_are_loaded() {
        let _guards = clear_legacy_env();
        let file = write_config(
            r#"
[provider]
api_token = "sk-file"
model = "claude-sonnet-4-5"

[network]
max_attempts = 5
retry_delay_ms = 10
"#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.provider.api_token.as_deref(), Some("sk-file"));
        assert_eq!(config.provider.model, "claude-sonnet-4-5");
        assert_eq!(config.network.max_attempts, 5);
        assert_eq!(config.network.retry_delay_ms, 10);
        // untouched sections keep their defaults
        assert_eq!(config.chat.empty_retry_delay_ms, 1000);
    }

    #[test]
    #[serial]
    fn test_prefixed_env_overrides_file() {
        let _guards = clear_legacy_env();
        let file = write_config("[network]\nmax_attempts = 5\n");
        let _env = EnvGuard::set("CHATGATE__NETWORK__MAX_ATTEMPTS", "7");

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.network.max_attempts, 7);
    }

    #[test]
    #[serial]
    fn test_legacy_env_overrides_everything() {
        let _guards = clear_legacy_env();
        let file = write_config("[provider]\nmodel = \"from-file\"\napi_token = \"sk-file\"\n");
        let _url = EnvGuard::set(ENV_API_URL, "https://example.com/v1/chat/completions");
        let _token = EnvGuard::set(ENV_API_TOKEN, "sk-env");
        let _model = EnvGuard::set(ENV_MODEL, "claude-opus-4");
        let _proxy = EnvGuard::set(ENV_PROXY_URL, "http://proxy:8080");

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(
            config.provider.api_url,
            "https://example.com/v1/chat/completions"
        );
        assert_eq!(config.provider.api_token.as_deref(), Some("sk-env"));
        assert_eq!(config.provider.model, "claude-opus-4");
        assert_eq!(config.provider.proxy_url.as_deref(), Some("http://proxy:8080"));
    }

    #[test]
    #[serial]
    fn test_empty_legacy_values_are_ignored() {
        let _guards = clear_legacy_env();
        let file = write_config("[provider]\nmodel = \"from-file\"\nproxy_url = \"\"\n");
        let _model = EnvGuard::set(ENV_MODEL, "");
        let _proxy = EnvGuard::set(ENV_PROXY_URL, "  ");

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.provider.model, "from-file");
        assert_eq!(config.provider.proxy_url, None);
    }
}
