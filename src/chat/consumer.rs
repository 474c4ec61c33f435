//! Client stream consumer
//!
//! Drives a [`CompletionSource`] for one session, writing accumulated text into
//! the session's trailing placeholder and re-running the whole send when the
//! completion comes back blank.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use super::session::{AgentRole, AgentSession, ChatMessage, SessionStatus, StreamFailure};
use super::source::{CompletionSource, StreamChunk, TurnRequest};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::llm::Role;

/// Progress callbacks of a send.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait StreamObserver: Send + Sync {
    /// The placeholder now holds `accumulated`.
    fn on_update(&self, role: AgentRole, accumulated: &str);

    /// A blank completion is about to be re-requested.
    fn on_empty_retry(&self, role: AgentRole, attempt: u32, max_retries: u32);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {
    fn on_update(&self, _role: AgentRole, _accumulated: &str) {}
    fn on_empty_retry(&self, _role: AgentRole, _attempt: u32, _max_retries: u32) {}
}

/// Per-send inputs beyond the user text.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the session's stored context document.
    pub context: Option<String>,
    pub reference_images: Vec<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// Resets the in-flight markers on every exit path, including cancellation.
struct SendGuard<'a> {
    session: &'a mut AgentSession,
}

impl<'a> SendGuard<'a> {
    fn begin(session: &'a mut AgentSession) -> Self {
        session.set_status(SessionStatus::Processing);
        session.is_streaming = true;
        session.retry_count = 0;
        Self { session }
    }
}

impl Deref for SendGuard<'_> {
    type Target = AgentSession;

    fn deref(&self) -> &AgentSession {
        self.session
    }
}

impl DerefMut for SendGuard<'_> {
    fn deref_mut(&mut self) -> &mut AgentSession {
        self.session
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.session.is_streaming = false;
        self.session.retry_count = 0;
        if self.session.status == SessionStatus::Processing {
            self.session.set_status(SessionStatus::Idle);
        }
    }
}

/// Sends messages for a session and accumulates the streamed reply.
pub struct StreamConsumer<S> {
    source: S,
    max_empty_retries: u32,
    empty_retry_delay: Duration,
}

impl<S: CompletionSource> StreamConsumer<S> {
    pub fn new(source: S, config: &ChatConfig) -> Self {
        Self {
            source,
            max_empty_retries: config.max_empty_retries,
            empty_retry_delay: config.empty_retry_delay(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Sends `text` as a new user turn.
    ///
    /// Returns the reply text. Blank replies are re-requested up to
    /// `max_empty_retries` times; if they stay blank the placeholder is
    /// removed, the session goes back to idle with an `EMPTY_RESPONSE` error
    /// recorded, and an empty string is returned. Source errors remove the
    /// placeholder, mark the session `error` and are returned as `Err`.
    pub async fn send_message(
        &self,
        session: &mut AgentSession,
        text: &str,
        options: &SendOptions,
        observer: &dyn StreamObserver,
    ) -> Result<String> {
        session.add_message(ChatMessage::new(Role::User, text));
        session.add_message(ChatMessage::placeholder());

        let mut session = SendGuard::begin(session);
        let role = session.role;
        let mut attempt = 0;
        let mut reply;

        loop {
            reply = match self.stream_once(&mut session, options, observer).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!("Stream error for {}: {}", role, e);
                    session.remove_last_message();
                    session.set_status(SessionStatus::Error);
                    session.last_error = Some(StreamFailure::from(&e));
                    return Err(e);
                }
            };

            if !reply.trim().is_empty() {
                break;
            }

            attempt += 1;
            session.retry_count = attempt;
            if attempt > self.max_empty_retries {
                break;
            }

            tracing::warn!(
                "Empty response received (attempt {}/{}), retrying...",
                attempt,
                self.max_empty_retries
            );
            observer.on_empty_retry(role, attempt, self.max_empty_retries);
            session.remove_last_message();
            tokio::time::sleep(self.empty_retry_delay).await;
            session.add_message(ChatMessage::placeholder());
        }

        if reply.trim().is_empty() {
            tracing::warn!("No content received after {} attempts", attempt);
            session.remove_last_message();
            session.set_status(SessionStatus::Idle);
            session.last_error = Some(StreamFailure::empty_response(attempt));
            return Ok(String::new());
        }

        session.set_status(SessionStatus::Idle);
        session.last_error = None;
        Ok(reply)
    }

    async fn stream_once(
        &self,
        session: &mut AgentSession,
        options: &SendOptions,
        observer: &dyn StreamObserver,
    ) -> Result<String> {
        let context = options
            .context
            .clone()
            .or_else(|| Some(session.context.clone()))
            .filter(|c| !c.is_empty());
        let request = TurnRequest {
            role: session.role,
            history: session.history(),
            context,
            reference_images: options.reference_images.clone(),
            model: options.model.clone(),
            temperature: options.temperature,
        };

        let mut handle = self.source.open(&request).await?;
        let mut accumulated = String::new();

        while let Some(chunk) = handle.receiver.recv().await {
            match chunk {
                StreamChunk::Delta(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&text);
                    if let Some(placeholder) = session.last_message_mut() {
                        placeholder.content.clone_from(&accumulated);
                    }
                    observer.on_update(session.role, &accumulated);
                }
                StreamChunk::Done => break,
                StreamChunk::Error(e) => return Err(e),
            }
        }

        Ok(accumulated)
    }
}
