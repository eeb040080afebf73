//! Scripted chat calls for unit tests

#![allow(missing_docs)]

use crate::chat::calls::ChatCalls;
use crate::chat::models::{ActionDescriptor, ChatHistory, SessionContext, StepResult};
use crate::error::ClientError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A call made against `ScriptedCalls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    GetChats,
    PostChat(String),
    ContinueChat(String),
    PostAction(ActionDescriptor),
    ContinueAction(String),
    Clear,
}

/// Pauses every call until released
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Replays step results in order and records every call
#[derive(Debug, Default)]
pub struct ScriptedCalls {
    steps: Mutex<VecDeque<Result<StepResult, ClientError>>>,
    history: Mutex<Option<Result<ChatHistory, ClientError>>>,
    recorded: Mutex<Vec<Recorded>>,
    clear_supported: bool,
    gate: Option<Gate>,
}

pub fn pending_with_tool(id: &str, tool: &str) -> StepResult {
    StepResult {
        tool_call: tool.to_string(),
        ..StepResult::pending(id)
    }
}

impl ScriptedCalls {
    pub fn new(steps: Vec<Result<StepResult, ClientError>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub fn with_history(self, history: Result<ChatHistory, ClientError>) -> Self {
        *self.history.lock().unwrap() = Some(history);
        self
    }

    pub fn with_clear(mut self) -> Self {
        self.clear_supported = true;
        self
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn step_calls(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|r| !matches!(r, Recorded::GetChats | Recorded::Clear))
            .count()
    }

    async fn record(&self, call: Recorded) {
        self.recorded.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    async fn next_step(&self, call: Recorded) -> Result<StepResult, ClientError> {
        self.record(call).await;
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Server("script exhausted".into())))
    }
}

#[async_trait]
impl ChatCalls for ScriptedCalls {
    async fn get_chats(&self, _context: &SessionContext) -> Result<ChatHistory, ClientError> {
        self.record(Recorded::GetChats).await;
        self.history.lock().unwrap().take().unwrap_or_else(|| {
            Ok(ChatHistory {
                messages: Vec::new(),
                chat_enabled: true,
            })
        })
    }

    async fn post_chat(
        &self,
        _context: &SessionContext,
        text: &str,
    ) -> Result<StepResult, ClientError> {
        self.next_step(Recorded::PostChat(text.to_string())).await
    }

    async fn continue_chat(
        &self,
        _context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        self.next_step(Recorded::ContinueChat(turn_id.to_string()))
            .await
    }

    async fn post_chat_action(
        &self,
        _context: &SessionContext,
        action: &ActionDescriptor,
    ) -> Result<StepResult, ClientError> {
        self.next_step(Recorded::PostAction(action.clone())).await
    }

    async fn continue_chat_action(
        &self,
        _context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        self.next_step(Recorded::ContinueAction(turn_id.to_string()))
            .await
    }

    fn supports_clear(&self) -> bool {
        self.clear_supported
    }

    async fn clear_chat(&self, _context: &SessionContext) -> Result<(), ClientError> {
        self.record(Recorded::Clear).await;
        if self.clear_supported {
            Ok(())
        } else {
            Err(ClientError::Unsupported("clearing history"))
        }
    }
}
