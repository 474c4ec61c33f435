//! 有界重试与单次尝试超时
//!
//! 每次尝试都包在一个独立的截止时间里；失败按原因分类后固定间隔重试，
//! 不做指数退避，也不加抖动。

use std::future::Future;
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::error::{ErrorCode, GatewayError, Result};
use crate::llm::ModelFamily;

/// 一次上游调用的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    /// 单次尝试的截止时间，覆盖到响应头返回为止
    pub timeout: Duration,
    /// 两次尝试之间的固定间隔
    pub retry_delay: Duration,
}

impl TransportPolicy {
    pub fn for_family(family: ModelFamily, network: &NetworkConfig) -> Self {
        Self {
            max_attempts: network.max_attempts.max(1),
            timeout: family.default_timeout(network),
            retry_delay: network.retry_delay(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 单次尝试的失败：分类原因 + 原始描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub reason: ErrorCode,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(reason: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    /// 截止时间到达，尝试被取消
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("request aborted: timeout after {}ms", after.as_millis()),
        )
    }

    /// 上游返回非 2xx，响应体原样保留用于诊断
    pub fn api(status: u16, body: &str) -> Self {
        Self::new(ErrorCode::ApiError, format!("API error: {} - {}", status, body))
    }

    /// 按错误文本分类
    ///
    /// - 含 timeout / timed out / aborted → `TIMEOUT`
    /// - 含连接拒绝、DNS 失败或泛化的 network 字样 → `NETWORK_ERROR`
    /// - 其他 → `MAX_RETRIES`
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let reason = if ["timeout", "timed out", "aborted"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ErrorCode::Timeout
        } else if [
            "econnrefused",
            "connection refused",
            "enotfound",
            "dns error",
            "failed to lookup",
            "connection reset",
            "network",
        ]
        .iter()
        .any(|k| lower.contains(k))
        {
            ErrorCode::NetworkError
        } else {
            ErrorCode::MaxRetries
        };

        Self::new(reason, message)
    }

    /// reqwest 错误的分类：先看错误种类，再退回到文本匹配
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        // reqwest 的 Display 不含底层原因，拼上 source 链以便匹配
        let mut message = e.to_string();
        let mut source = std::error::Error::source(e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if e.is_timeout() {
            Self::new(ErrorCode::Timeout, message)
        } else if e.is_connect() {
            Self::new(ErrorCode::NetworkError, message)
        } else {
            Self::classify(message)
        }
    }

    /// 重试耗尽后的终止错误
    pub fn into_terminal(self, provider: &str, attempts_used: u32) -> GatewayError {
        GatewayError::Transport {
            code: self.reason,
            message: format!(
                "{} request failed after {} attempts: {}",
                provider, attempts_used, self.message
            ),
            retries_attempted: attempts_used,
            last_error: Some(self.message),
        }
    }
}

/// 单次尝试的结果归类
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    RetryableFailure { failure: AttemptFailure, attempt: u32 },
    TerminalFailure { failure: AttemptFailure, attempts_used: u32 },
}

impl<T> AttemptOutcome<T> {
    /// 根据本次结果与剩余次数决定下一步。所有已分类的失败都可重试。
    pub fn decide(
        result: std::result::Result<T, AttemptFailure>,
        attempt: u32,
        max_attempts: u32,
    ) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(failure) if attempt < max_attempts => {
                AttemptOutcome::RetryableFailure { failure, attempt }
            }
            Err(failure) => AttemptOutcome::TerminalFailure {
                failure,
                attempts_used: attempt,
            },
        }
    }
}

/// 成功值及实际使用的尝试次数
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// 在策略约束下反复执行 `attempt_fn`
///
/// `attempt_fn` 接收从 1 开始的尝试序号，每次都必须重新构造请求；
/// 超时的尝试会被直接丢弃（drop），其持有的连接随之释放。
pub async fn run_with_retry<T, F, Fut>(
    policy: &TransportPolicy,
    provider: &str,
    mut attempt_fn: F,
) -> Result<Attempted<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptFailure>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        tracing::debug!(
            "{} attempt {}/{}",
            provider,
            attempt,
            policy.max_attempts
        );

        let result = match tokio::time::timeout(policy.timeout, attempt_fn(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptFailure::timeout(policy.timeout)),
        };

        match AttemptOutcome::decide(result, attempt, policy.max_attempts) {
            AttemptOutcome::Success(value) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", provider, attempt);
                }
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            AttemptOutcome::RetryableFailure { failure, attempt } => {
                tracing::warn!(
                    "{} attempt {} failed [{}]: {}. Retrying in {}ms...",
                    provider,
                    attempt,
                    failure.reason,
                    failure.message,
                    policy.retry_delay.as_millis()
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            AttemptOutcome::TerminalFailure {
                failure,
                attempts_used,
            } => {
                tracing::warn!(
                    "{} gave up after {} attempts [{}]: {}",
                    provider,
                    attempts_used,
                    failure.reason,
                    failure.message
                );
                return Err(failure.into_terminal(provider, attempts_used));
            }
        }
    }
}
