//! Design chat calls
//!
//! The world-design assistant. One thread per user on the server; the
//! session context is not part of the URL. The server reports which design
//! view the conversation is focused on, and the next start call sends it
//! back.

use crate::chat::calls::ChatCalls;
use crate::chat::http::{HttpTransport, StepResponse, TurnRequest};
use crate::chat::models::{ChatHistory, SessionContext, StepResult};
use crate::error::ClientError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;

const DESIGN_CHAT_PATH: &str = "/design_chat";

#[derive(Debug, Deserialize)]
struct DesignHistoryEnvelope {
    history_response: ChatHistory,
    #[serde(default)]
    view: Option<Value>,
}

/// Design assistant chat; supports clearing, not actions
#[derive(Debug)]
pub struct DesignChatCalls {
    transport: HttpTransport,
    view: Mutex<Option<Value>>,
}

impl DesignChatCalls {
    /// Create design chat calls over the given transport
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            view: Mutex::new(None),
        }
    }

    /// Current design view, as last reported by the server
    pub fn view(&self) -> Option<Value> {
        self.view.lock().ok().and_then(|view| view.clone())
    }

    /// Set the design view sent with the next start call
    pub fn set_view(&self, view: Option<Value>) {
        if let Ok(mut current) = self.view.lock() {
            *current = view;
        }
    }

    /// The top-level view is reported as `element_type: "None"`; keep the
    /// current view in that case.
    fn is_focused(view: &Value) -> bool {
        view.get("element_type").and_then(Value::as_str) != Some("None")
    }

    fn track_view(&self, response: StepResponse) -> StepResult {
        if response.step.done {
            if let Some(view) = response.view {
                self.set_view(Some(view));
            }
        }
        response.step
    }
}

#[async_trait]
impl ChatCalls for DesignChatCalls {
    async fn get_chats(&self, _context: &SessionContext) -> Result<ChatHistory, ClientError> {
        let envelope: DesignHistoryEnvelope = self.transport.get_json(DESIGN_CHAT_PATH).await?;
        if let Some(view) = envelope.view.filter(Self::is_focused) {
            self.set_view(Some(view));
        }
        Ok(envelope.history_response)
    }

    async fn post_chat(
        &self,
        _context: &SessionContext,
        text: &str,
    ) -> Result<StepResult, ClientError> {
        let view = self.view();
        let response = self
            .transport
            .post_step(
                DESIGN_CHAT_PATH,
                &TurnRequest::start_design_chat(text, view.as_ref()),
            )
            .await?;
        Ok(self.track_view(response))
    }

    async fn continue_chat(
        &self,
        _context: &SessionContext,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        let response = self
            .transport
            .post_step(DESIGN_CHAT_PATH, &TurnRequest::continue_turn(turn_id))
            .await?;
        Ok(self.track_view(response))
    }

    fn supports_clear(&self) -> bool {
        true
    }

    async fn clear_chat(&self, _context: &SessionContext) -> Result<(), ClientError> {
        let _: Value = self
            .transport
            .post_json(DESIGN_CHAT_PATH, &TurnRequest::clear())
            .await?;
        Ok(())
    }
}
