//! HTTP 传输层
//!
//! - `client` - reqwest 客户端构造（TLS provider、代理）
//! - `retry` - 单次尝试超时、失败分类与有界重试

pub mod client;
pub mod retry;

pub use client::{build_http_client, ensure_crypto_provider};
pub use retry::{AttemptFailure, AttemptOutcome, Attempted, TransportPolicy, run_with_retry};

use reqwest::{Client, Response};
use serde::Serialize;

/// 发送一次 POST 请求，直到响应头返回
///
/// 每次调用都重新序列化请求体。非 2xx 响应会读出响应体并归类为 `API_ERROR`。
pub async fn send_once<B>(
    client: &Client,
    endpoint: &str,
    headers: &[(&str, String)],
    body: &B,
) -> std::result::Result<Response, AttemptFailure>
where
    B: Serialize + ?Sized,
{
    let mut request = client
        .post(endpoint)
        .header("Content-Type", "application/json");
    for (key, value) in headers {
        request = request.header(*key, value.as_str());
    }

    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| AttemptFailure::from_reqwest(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<body read error: {}>", e));
        tracing::debug!("Upstream error response body: {}", body);
        return Err(AttemptFailure::api(status.as_u16(), &body));
    }

    Ok(response)
}
