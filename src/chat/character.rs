//! Character chat calls
//!
//! Conversation and item actions with a character in a world, over the
//! character thread and action endpoints.

use crate::chat::calls::ChatCalls;
use crate::chat::http::{HttpTransport, TurnRequest};
use crate::chat::models::{ActionDescriptor, ChatHistory, SessionContext, StepResult};
use crate::error::ClientError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    history_response: ChatHistory,
}

/// Chat with a character; supports actions, not clearing
#[derive(Debug, Clone)]
pub struct CharacterChatCalls {
    transport: HttpTransport,
}

impl CharacterChatCalls {
    /// Create character calls over the given transport
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    fn thread_path(context: &SessionContext) -> String {
        format!(
            "/worlds/{}/characters/{}/thread",
            context.world_id, context.entity_id
        )
    }

    fn action_path(context: &SessionContext) -> String {
        format!(
            "/worlds/{}/characters/{}/action",
            context.world_id, context.entity_id
        )
    }
}

#[async_trait]
impl ChatCalls for CharacterChatCalls {
    async fn get_chats(&self, context: &SessionContext) -> Result<ChatHistory, ClientError> {
        let envelope: HistoryEnvelope = self
            .transport
            .get_json(&Self::thread_path(context))
            .await?;
        Ok(envelope.history_response)
    }

    async fn post_chat(
        &self,
        context: &SessionContext,
        text: &str,
    ) -> Result<StepResult, ClientError> {
        let response = self
            .transport
            .post_step(&Self::thread_path(context), &TurnRequest::start_chat(text))
            .await?;
        Ok(response.step)
    }

    async fn continue_chat(
        &self,
        context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        let response = self
            .transport
            .post_step(
                &Self::thread_path(context),
                &TurnRequest::continue_turn(turn_id),
            )
            .await?;
        Ok(response.step)
    }

    async fn post_chat_action(
        &self,
        context: &SessionContext,
        action: &ActionDescriptor,
    ) -> Result<StepResult, ClientError> {
        let response = self
            .transport
            .post_step(
                &Self::action_path(context),
                &TurnRequest::start_action(action.action, &action.item_id),
            )
            .await?;
        Ok(response.step)
    }

    async fn continue_chat_action(
        &self,
        context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        let response = self
            .transport
            .post_step(
                &Self::action_path(context),
                &TurnRequest::continue_turn(turn_id),
            )
            .await?;
        Ok(response.step)
    }
}
