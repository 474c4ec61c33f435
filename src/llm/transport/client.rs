use reqwest::{Client, Proxy};

use crate::config::NetworkConfig;
use crate::error::{GatewayError, Result};

/// 安装 rustls crypto provider
///
/// reqwest 0.13 + rustls-no-provider 需要手动安装；重复调用时 install_default 返回 Err，忽略即可。
pub fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// 创建上游 HTTP 客户端
///
/// 不设置整体超时：流式响应的读取时长不受限，单次尝试的截止时间由重试层负责。
/// 配置了代理时，该客户端的所有请求都经过代理。
pub fn build_http_client(network: &NetworkConfig, proxy_url: Option<&str>) -> Result<Client> {
    ensure_crypto_provider();

    let user_agent = format!(
        "{}/{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(network.connect_timeout());

    if let Some(proxy_url) = proxy_url {
        let proxy = Proxy::all(proxy_url).map_err(|e| {
            GatewayError::Config(format!("invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        tracing::debug!("Routing upstream requests through proxy");
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to create HTTP client: {}", e)))
}
