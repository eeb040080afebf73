// Session state
// Holds the phase, history, live message and world status for one chat session

use crate::chat::models::{HistoryEntry, SessionContext, StepResult, WorldStatus};
use crate::error::GENERIC_FAILURE_MESSAGE;
use crate::orchestrator::turn::{CompletedTurn, FailedTurn, ToolCallLog};
use std::sync::Arc;

/// Session phase
/// Controls whether the operator may submit input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChatPhase {
    /// Input accepted
    #[default]
    Ready,
    /// A turn or history request is in flight
    Waiting,
    /// The server disabled further input
    Disabled,
}

/// The in-flight message shown while a turn runs, or the error after one fails
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveMessage {
    /// Text the operator submitted
    pub user: String,
    /// Most recent tool call reported by the agent
    pub tool_call: String,
    /// Entity activity text
    pub updates: String,
    /// Triggering event
    pub event: String,
    /// Partial or final reply
    pub reply: String,
    /// Failure message, empty unless the last turn failed
    pub error: String,
}

impl LiveMessage {
    /// A live message that only carries the operator's text
    pub fn for_input(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    /// Whether nothing is showing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// State of one chat session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The entity and world being chatted with
    pub context: SessionContext,
    /// Current phase
    pub phase: ChatPhase,
    /// In-flight or failed message
    pub live: LiveMessage,
    /// Tool calls seen during the in-flight turn
    pub tool_calls: ToolCallLog,
    /// Latest world status reported by the server
    pub world_status: Option<WorldStatus>,
    /// Last world response message, for display
    pub status_message: String,
    history: Vec<Arc<HistoryEntry>>,
    epoch: u64,
}

impl SessionState {
    /// Create an empty session for the given context
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            phase: ChatPhase::Ready,
            live: LiveMessage::default(),
            tool_calls: ToolCallLog::new(),
            world_status: None,
            status_message: String::new(),
            history: Vec::new(),
            epoch: 0,
        }
    }

    /// Finalized history, oldest first
    pub fn history(&self) -> &[Arc<HistoryEntry>] {
        &self.history
    }

    /// Counter bumped on every reset; results from an older epoch are discarded
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the history with the server's copy
    pub fn load_history(&mut self, messages: Vec<HistoryEntry>) {
        self.history = messages.into_iter().map(Arc::new).collect();
    }

    /// Forget the history and any live message
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.live = LiveMessage::default();
        self.tool_calls.clear();
    }

    /// Switch to a new context
    /// Bumps the epoch so in-flight results for the old context are dropped
    pub fn reset(&mut self, context: SessionContext) {
        self.epoch = self.epoch.wrapping_add(1);
        self.context = context;
        self.phase = ChatPhase::Ready;
        self.history.clear();
        self.live = LiveMessage::default();
        self.tool_calls.clear();
        self.world_status = None;
        self.status_message.clear();
    }

    /// Enter the waiting phase for a new turn
    pub fn begin_turn(&mut self, user_input: &str) {
        self.phase = ChatPhase::Waiting;
        self.live = LiveMessage::for_input(user_input);
        self.tool_calls.clear();
    }

    /// Mirror one step result into the live message
    pub fn apply_step(&mut self, step: &StepResult, tool_calls: &[String]) {
        if !step.user.is_empty() {
            self.live.user = step.user.clone();
        }
        self.live.tool_call = step.tool_call.clone();
        self.live.updates = step.updates.clone();
        self.live.event = step.event.clone();
        self.live.reply = step.reply.clone();

        self.tool_calls.clear();
        for name in tool_calls {
            self.tool_calls.push(name.as_str());
        }

        if let Some(status) = &step.world_status {
            self.record_world_status(status.clone());
        }
    }

    /// Store the latest world status
    pub fn record_world_status(&mut self, status: WorldStatus) {
        if !status.response_message.is_empty() {
            self.status_message = status.response_message.clone();
        }
        self.world_status = Some(status);
    }

    /// Append a completed turn to history and settle the phase
    pub fn complete_turn(&mut self, turn: &CompletedTurn) {
        self.history.push(Arc::new(HistoryEntry::from_turn(
            &turn.result,
            &turn.user_input,
            turn.tool_calls.clone(),
        )));
        self.live = LiveMessage::default();
        self.tool_calls.clear();
        self.phase = if turn.result.enabled {
            ChatPhase::Ready
        } else {
            ChatPhase::Disabled
        };
    }

    /// Show the failure and keep the operator's text for retry
    pub fn fail_turn(&mut self, turn: &FailedTurn) {
        self.live = LiveMessage {
            user: turn.user_input.clone(),
            error: GENERIC_FAILURE_MESSAGE.to_string(),
            ..LiveMessage::default()
        };
        self.tool_calls.clear();
        self.phase = ChatPhase::Ready;
    }

    /// Show a failed history or clear request and return to `phase`
    pub fn fail_request(&mut self, phase: ChatPhase) {
        self.live = LiveMessage {
            error: GENERIC_FAILURE_MESSAGE.to_string(),
            ..LiveMessage::default()
        };
        self.phase = phase;
    }
}
