//! World chat client library
//!
//! Client-side turn orchestration for conversations with server-hosted
//! agents: characters in a world and the world-design assistant. A turn is
//! started with one request and driven to completion with `continue`
//! requests while the agent runs tools on the server.

pub mod chat;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;

#[cfg(test)]
mod test_support;

pub use chat::{CharacterChatCalls, ChatCalls, DesignChatCalls, HttpTransport};
pub use config::ClientConfig;
pub use error::{ClientError, SessionError, TurnError};
pub use orchestrator::{StepObserver, TurnOrchestrator, TurnOutcome};
pub use state::{ChatPhase, ChatSession, WorldReconciler};
