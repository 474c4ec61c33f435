//! Multi-role chat on top of the streaming gateway.
//!
//! - `session` - per-role transcripts and the single-send guard
//! - `prompts` - role system prompts and context framing
//! - `relay` - the `data: {content, done}` re-framing grammar
//! - `source` - in-process and relay completion sources
//! - `consumer` - accumulation and the empty-response retry loop

pub mod consumer;
pub mod prompts;
pub mod relay;
pub mod session;
pub mod source;

pub use consumer::{NoopObserver, SendOptions, StreamConsumer, StreamObserver};
pub use session::{AgentRole, AgentSession, ChatMessage, SessionStatus, SessionStore, StreamFailure};
pub use source::{CompletionSource, GatewaySource, RelaySource, StreamChunk, StreamHandle, TurnRequest};
