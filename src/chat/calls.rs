//! Chat capability bundle
//!
//! The set of transport calls one chat target offers. The orchestrator and
//! session controller only see this trait, so a single implementation of the
//! turn loop serves every chat screen.

use crate::chat::models::{ActionDescriptor, ChatHistory, SessionContext, StepResult};
use crate::error::ClientError;
use async_trait::async_trait;

/// Transport calls for one chat target
#[async_trait]
pub trait ChatCalls: Send + Sync {
    /// Fetch the chat history for the context
    async fn get_chats(&self, context: &SessionContext) -> Result<ChatHistory, ClientError>;

    /// Start a chat turn with operator text
    async fn post_chat(&self, context: &SessionContext, text: &str)
        -> Result<StepResult, ClientError>;

    /// Continue a chat turn started by `post_chat`
    async fn continue_chat(
        &self,
        context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError>;

    /// Start an action turn
    ///
    /// Targets without actions report `ClientError::Unsupported`.
    async fn post_chat_action(
        &self,
        _context: &SessionContext,
        _action: &ActionDescriptor,
    ) -> Result<StepResult, ClientError> {
        Err(ClientError::Unsupported("chat actions"))
    }

    /// Continue an action turn started by `post_chat_action`
    async fn continue_chat_action(
        &self,
        _context: &SessionContext,
        _turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        Err(ClientError::Unsupported("chat actions"))
    }

    /// Whether `clear_chat` is available
    fn supports_clear(&self) -> bool {
        false
    }

    /// Wipe the chat history on the server
    async fn clear_chat(&self, _context: &SessionContext) -> Result<(), ClientError> {
        Err(ClientError::Unsupported("clearing history"))
    }
}
