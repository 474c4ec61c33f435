//! Per-role conversation state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::{ErrorCode, GatewayError, Result};
use crate::llm::{Message, Role};

/// Agent persona a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Business analyst
    Ba,
    /// System analyst
    Sa,
    /// Frontend developer
    Dev,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Ba, AgentRole::Sa, AgentRole::Dev];

    fn index(&self) -> usize {
        match self {
            AgentRole::Ba => 0,
            AgentRole::Sa => 1,
            AgentRole::Dev => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Ba => "ba",
            AgentRole::Sa => "sa",
            AgentRole::Dev => "dev",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ba" => Ok(AgentRole::Ba),
            "sa" => Ok(AgentRole::Sa),
            "dev" => Ok(AgentRole::Dev),
            other => Err(GatewayError::InvalidInput(format!(
                "unknown role '{}', expected ba, sa or dev",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
    Complete,
    Error,
}

/// One entry of a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Empty assistant message that streamed text is written into.
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, "")
    }
}

/// Error recorded on a session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFailure {
    pub message: String,
    pub code: Option<ErrorCode>,
    pub retries_attempted: Option<u32>,
    pub is_retry_error: bool,
}

impl StreamFailure {
    /// Blank completions exhausted the consumer's retries.
    pub fn empty_response(attempts: u32) -> Self {
        Self {
            message: rust_i18n::t!("chat.empty_response").to_string(),
            code: Some(ErrorCode::EmptyResponse),
            retries_attempted: Some(attempts),
            is_retry_error: true,
        }
    }
}

impl From<&GatewayError> for StreamFailure {
    fn from(err: &GatewayError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
            retries_attempted: err.retries_attempted(),
            is_retry_error: err.is_retry_error(),
        }
    }
}

/// Conversation state of one role.
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub role: AgentRole,
    pub messages: Vec<ChatMessage>,
    /// Context document merged into the system prompt.
    pub context: String,
    pub status: SessionStatus,
    pub last_error: Option<StreamFailure>,
    /// True while a send is in flight.
    pub is_streaming: bool,
    /// Empty-response retries of the send in flight.
    pub retry_count: u32,
}

impl AgentSession {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            messages: Vec::new(),
            context: String::new(),
            status: SessionStatus::Idle,
            last_error: None,
            is_streaming: false,
            retry_count: 0,
        }
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn remove_last_message(&mut self) -> Option<ChatMessage> {
        self.messages.pop()
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn last_message_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages.last_mut()
    }

    /// Prior turns sent upstream.
    ///
    /// Drops the trailing placeholder, then keeps only user and assistant
    /// messages with content.
    pub fn history(&self) -> Vec<Message> {
        let prior = match self.messages.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        };
        prior
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant) && !m.content.is_empty())
            .map(|m| Message::new(m.role, m.content.as_str()))
            .collect()
    }
}

/// Owns one session per role.
///
/// Each session sits behind its own async mutex, so a send holds its role
/// for the whole operation while other roles proceed.
#[derive(Debug)]
pub struct SessionStore {
    sessions: [Arc<Mutex<AgentSession>>; 3],
    active: RwLock<AgentRole>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates empty sessions with `ba` active.
    pub fn new() -> Self {
        let sessions = AgentRole::ALL.map(|role| Arc::new(Mutex::new(AgentSession::new(role))));
        Self {
            sessions,
            active: RwLock::new(AgentRole::Ba),
        }
    }

    fn slot(&self, role: AgentRole) -> Arc<Mutex<AgentSession>> {
        Arc::clone(&self.sessions[role.index()])
    }

    /// Waits for exclusive access to `role`'s session.
    pub async fn lock(&self, role: AgentRole) -> OwnedMutexGuard<AgentSession> {
        self.slot(role).lock_owned().await
    }

    /// Exclusive access to `role`'s session, or an error if a send holds it.
    pub fn try_lock(&self, role: AgentRole) -> Result<OwnedMutexGuard<AgentSession>> {
        self.slot(role).try_lock_owned().map_err(|_| {
            GatewayError::InvalidInput(format!("session '{}' is busy with another send", role))
        })
    }

    /// Copy of `role`'s session.
    pub async fn snapshot(&self, role: AgentRole) -> AgentSession {
        self.lock(role).await.clone()
    }

    pub async fn activate(&self, role: AgentRole) {
        *self.active.write().await = role;
    }

    pub async fn current_role(&self) -> AgentRole {
        *self.active.read().await
    }
}
