//! Turn orchestrator
//!
//! Drives one turn through the start/continue protocol: issue `start`, then
//! `continue` with the same turn id until the server reports `done`, the
//! continuation cap is reached, or a call fails. The loop is strictly
//! sequential; each call is awaited before the next is issued.

use crate::chat::calls::ChatCalls;
use crate::chat::models::{ChatCommand, SessionContext, StepResult};
use crate::error::{ClientError, TurnError, GENERIC_FAILURE_MESSAGE};
use crate::orchestrator::constants::DEFAULT_MAX_CONTINUATIONS;
use crate::orchestrator::observer::StepObserver;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Ordered tool-call names seen during the current turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallLog {
    calls: Vec<String>,
}

impl ToolCallLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tool call
    pub fn push(&mut self, name: impl Into<String>) {
        self.calls.push(name.into());
    }

    /// Recorded names, in order
    pub fn as_slice(&self) -> &[String] {
        &self.calls
    }

    /// Move the recorded names out, leaving the log empty
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.calls)
    }

    /// Forget all recorded names
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// A turn that finished with status `ok`
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    /// Text the operator submitted (empty for actions)
    pub user_input: String,
    /// The terminal step result
    pub result: StepResult,
    /// Tool calls made during the turn
    pub tool_calls: Vec<String>,
    /// Number of `continue` calls issued
    pub continuations: u32,
}

/// A turn that failed
#[derive(Debug)]
pub struct FailedTurn {
    /// Text the operator submitted, kept for retry
    pub user_input: String,
    /// Turn id, if `start` returned one
    pub turn_id: Option<String>,
    /// What went wrong
    pub error: TurnError,
}

impl FailedTurn {
    /// Message to show the operator
    pub fn message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Result of `run_turn`
#[derive(Debug)]
pub enum TurnOutcome {
    /// Finalized turn, ready to append to history
    Completed(CompletedTurn),
    /// Failed turn
    Failed(FailedTurn),
}

impl TurnOutcome {
    /// Whether the turn completed
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }

    /// Text the operator submitted
    pub fn user_input(&self) -> &str {
        match self {
            TurnOutcome::Completed(turn) => &turn.user_input,
            TurnOutcome::Failed(turn) => &turn.user_input,
        }
    }

    /// The failure, if the turn failed
    pub fn error(&self) -> Option<&TurnError> {
        match self {
            TurnOutcome::Completed(_) => None,
            TurnOutcome::Failed(turn) => Some(&turn.error),
        }
    }
}

/// Runs turns against one chat target
pub struct TurnOrchestrator<C: ChatCalls + ?Sized> {
    calls: Arc<C>,
    max_continuations: u32,
}

impl<C: ChatCalls + ?Sized> Clone for TurnOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            max_continuations: self.max_continuations,
        }
    }
}

impl<C: ChatCalls + ?Sized> TurnOrchestrator<C> {
    /// Create an orchestrator with the default continuation cap
    pub fn new(calls: Arc<C>) -> Self {
        Self {
            calls,
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
        }
    }

    /// Set the continuation cap (at least one continuation is always allowed)
    pub fn with_max_continuations(mut self, max_continuations: u32) -> Self {
        self.max_continuations = max_continuations.max(1);
        self
    }

    /// The continuation cap
    pub fn max_continuations(&self) -> u32 {
        self.max_continuations
    }

    /// The chat calls this orchestrator drives
    pub fn calls(&self) -> &Arc<C> {
        &self.calls
    }

    /// Run one turn to completion
    ///
    /// The observer sees every step result, in order. The returned outcome
    /// is either the completed turn or a failure; no error escapes.
    pub async fn run_turn<O>(
        &self,
        context: &SessionContext,
        command: &ChatCommand,
        observer: &mut O,
    ) -> TurnOutcome
    where
        O: StepObserver + ?Sized,
    {
        let user_input = command.user_text().to_string();
        let mut tool_calls = ToolCallLog::new();

        debug!(
            world_id = %context.world_id,
            entity_id = %context.entity_id,
            action = matches!(command, ChatCommand::Action(_)),
            "Starting turn"
        );

        let mut step = match self.start(context, command).await {
            Ok(step) => step,
            Err(e) => {
                error!(
                    world_id = %context.world_id,
                    entity_id = %context.entity_id,
                    error = %e,
                    "Turn start failed"
                );
                return TurnOutcome::Failed(FailedTurn {
                    user_input,
                    turn_id: None,
                    error: TurnError::Transport(e),
                });
            }
        };

        let turn_id = step.id.clone();
        let mut continuations: u32 = 0;

        while !step.done {
            if let Some(name) = step.tool_call() {
                debug!(turn_id = %turn_id, tool_call = %name, "Agent running tool");
                tool_calls.push(name);
            }
            observer.on_step(&step, tool_calls.as_slice()).await;

            if continuations >= self.max_continuations {
                error!(
                    turn_id = %turn_id,
                    continuations = continuations,
                    "Turn did not complete within the continuation cap"
                );
                return TurnOutcome::Failed(FailedTurn {
                    user_input,
                    turn_id: Some(turn_id.clone()),
                    error: TurnError::ProtocolExceeded {
                        turn_id,
                        limit: self.max_continuations,
                    },
                });
            }

            continuations += 1;
            step = match self.continue_turn(context, command, &turn_id).await {
                Ok(step) => step,
                Err(e) => {
                    error!(
                        turn_id = %turn_id,
                        continuations = continuations,
                        error = %e,
                        "Turn continue failed"
                    );
                    return TurnOutcome::Failed(FailedTurn {
                        user_input,
                        turn_id: Some(turn_id),
                        error: TurnError::Transport(e),
                    });
                }
            };

            if !step.id.is_empty() && step.id != turn_id {
                warn!(
                    turn_id = %turn_id,
                    returned_id = %step.id,
                    "Server returned a different turn id; keeping the start id"
                );
            }
        }

        let tool_calls = tool_calls.take();
        observer.on_step(&step, &[]).await;

        if !step.is_ok() {
            warn!(
                turn_id = %turn_id,
                status = %step.status,
                "Server rejected turn"
            );
            return TurnOutcome::Failed(FailedTurn {
                user_input,
                turn_id: Some(turn_id.clone()),
                error: TurnError::ServerRejected {
                    turn_id,
                    status: step.status,
                },
            });
        }

        info!(
            turn_id = %turn_id,
            continuations = continuations,
            tool_calls = tool_calls.len(),
            enabled = step.enabled,
            "Turn completed"
        );

        TurnOutcome::Completed(CompletedTurn {
            user_input,
            result: step,
            tool_calls,
            continuations,
        })
    }

    async fn start(
        &self,
        context: &SessionContext,
        command: &ChatCommand,
    ) -> Result<StepResult, ClientError> {
        match command {
            ChatCommand::Message(text) => self.calls.post_chat(context, text).await,
            ChatCommand::Action(action) => self.calls.post_chat_action(context, action).await,
        }
    }

    async fn continue_turn(
        &self,
        context: &SessionContext,
        command: &ChatCommand,
        turn_id: &str,
    ) -> Result<StepResult, ClientError> {
        match command {
            ChatCommand::Message(_) => self.calls.continue_chat(context, turn_id).await,
            ChatCommand::Action(_) => self.calls.continue_chat_action(context, turn_id).await,
        }
    }
}
