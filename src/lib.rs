//! # chatgate
//!
//! Streaming chat-completion gateway for OpenAI-style and Anthropic-style upstreams.
//!
//! ## 功能
//! - **统一消息格式**：OpenAI 风格消息（含图片）自动转换为 Anthropic Messages 格式
//! - **流式解析**：两种上游 SSE 语法归一为 `ContentDelta` 序列
//! - **重试策略**：按尝试超时、固定间隔、失败分类（`TIMEOUT` / `NETWORK_ERROR` / `API_ERROR`）
//! - **消费端**：占位消息累积、空响应自动重试
//! - **Relay**：`data: {"content","done"}` 转发语法，支持远端消费
//!
//! ### 作为库使用
//! ```no_run
//! use chatgate::config::{NetworkConfig, ProviderConfig};
//! use chatgate::llm::{CompletionRequest, Message, StreamingGateway};
//!
//! # async fn example() -> chatgate::error::Result<()> {
//! let provider = ProviderConfig {
//!     api_token: Some("sk-...".to_string()),
//!     ..Default::default()
//! };
//! let gateway = StreamingGateway::new(provider, NetworkConfig::default())?;
//!
//! let stream = gateway
//!     .stream_completion(CompletionRequest::new(vec![Message::user("Hello")]))
//!     .await?;
//! println!("{}", stream.collect_text().await);
//! # Ok(())
//! # }
//! ```
//!
//! ## 核心模块
//! - [`llm`] - 上游适配、SSE 解析、传输重试、网关
//! - [`chat`] - 角色会话、提示词、relay 语法、流消费
//! - [`commands`] - CLI 命令实现
//! - [`config`] - 配置管理
//! - [`error`] - 统一错误类型
//! - [`ui`] - 终端输出

#[macro_use]
extern crate rust_i18n;

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod ui;

// Initialize i18n for library modules
i18n!("locales", fallback = "en");
