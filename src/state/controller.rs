//! Session controller
//!
//! Owns one chat session: accepts operator input, runs turns through the
//! orchestrator, mirrors progress into `SessionState`, and finalizes the
//! result into history. Results that arrive after the session was reset are
//! discarded.

use crate::chat::calls::ChatCalls;
use crate::chat::models::{ActionDescriptor, ChatCommand, SessionContext, StepResult};
use crate::config::TurnConfig;
use crate::error::SessionError;
use crate::orchestrator::observer::StepObserver;
use crate::orchestrator::turn::{TurnOrchestrator, TurnOutcome};
use crate::state::reconcile::WorldReconciler;
use crate::state::session_state::{ChatPhase, LiveMessage, SessionState};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// Shared, lockable session state
pub type SharedSessionState = Arc<RwLock<SessionState>>;

const STEP_UPDATE_CAPACITY: usize = 64;

/// Live view of the in-flight turn after one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepUpdate {
    /// The live message after the step was applied
    pub live: LiveMessage,
    /// Tool Call Log after the step
    pub tool_calls: Vec<String>,
}

/// Mirrors step results into session state, unless the session moved on
struct SessionObserver {
    state: SharedSessionState,
    updates: broadcast::Sender<StepUpdate>,
    epoch: u64,
    world_changed: bool,
}

#[async_trait]
impl StepObserver for SessionObserver {
    async fn on_step(&mut self, step: &StepResult, tool_calls: &[String]) {
        if step.world_changed() {
            self.world_changed = true;
        }
        let mut state = self.state.write().await;
        if state.epoch() != self.epoch {
            return;
        }
        state.apply_step(step, tool_calls);
        // No subscribers is fine
        let _ = self.updates.send(StepUpdate {
            live: state.live.clone(),
            tool_calls: tool_calls.to_vec(),
        });
    }
}

/// One chat session against a chat target
pub struct ChatSession<C: ChatCalls + ?Sized> {
    orchestrator: TurnOrchestrator<C>,
    state: SharedSessionState,
    updates: broadcast::Sender<StepUpdate>,
    reconciler: Option<Arc<dyn WorldReconciler>>,
    greet_on_empty: bool,
}

impl<C: ChatCalls + ?Sized> Clone for ChatSession<C> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            state: Arc::clone(&self.state),
            updates: self.updates.clone(),
            reconciler: self.reconciler.clone(),
            greet_on_empty: self.greet_on_empty,
        }
    }
}

impl<C: ChatCalls + ?Sized> ChatSession<C> {
    /// Create a session for `context`
    pub fn new(calls: Arc<C>, context: SessionContext, config: &TurnConfig) -> Self {
        Self {
            orchestrator: TurnOrchestrator::new(calls)
                .with_max_continuations(config.max_continuations),
            state: Arc::new(RwLock::new(SessionState::new(context))),
            updates: broadcast::channel(STEP_UPDATE_CAPACITY).0,
            reconciler: None,
            greet_on_empty: config.greet_on_empty,
        }
    }

    /// Call `reconciler` after turns that changed the world
    pub fn with_reconciler(mut self, reconciler: Arc<dyn WorldReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Shared handle to the session state
    pub fn state(&self) -> SharedSessionState {
        Arc::clone(&self.state)
    }

    /// Receive a `StepUpdate` for every step of every later turn
    pub fn subscribe(&self) -> broadcast::Receiver<StepUpdate> {
        self.updates.subscribe()
    }

    /// Copy of the current session state
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Current phase
    pub async fn phase(&self) -> ChatPhase {
        self.state.read().await.phase
    }

    /// Current context
    pub async fn context(&self) -> SessionContext {
        self.state.read().await.context.clone()
    }

    /// Whether `clear` is available for this chat target
    pub fn supports_clear(&self) -> bool {
        self.orchestrator.calls().supports_clear()
    }

    /// Submit operator text as a new turn
    pub async fn submit(&self, text: impl Into<String>) -> Result<TurnOutcome, SessionError> {
        self.run(ChatCommand::Message(text.into())).await
    }

    /// Submit a structured action as a new turn
    pub async fn submit_action(
        &self,
        action: ActionDescriptor,
    ) -> Result<TurnOutcome, SessionError> {
        self.run(ChatCommand::Action(action)).await
    }

    /// Select the item that `use_selected_item` acts with
    ///
    /// The context must not change under a running turn, so this is refused
    /// while one is in flight.
    pub async fn select_item(&self, item_id: Option<String>) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if state.phase == ChatPhase::Waiting {
            return Err(SessionError::Busy);
        }
        debug!(item_id = ?item_id, "Item selected");
        state.context.item_id = item_id;
        Ok(())
    }

    /// Use the selected item on the entity
    pub async fn use_selected_item(&self) -> Result<TurnOutcome, SessionError> {
        let item_id = self
            .state
            .read()
            .await
            .context
            .item_id
            .clone()
            .ok_or(SessionError::NoItemSelected)?;
        self.submit_action(ActionDescriptor::use_item(item_id)).await
    }

    async fn run(&self, command: ChatCommand) -> Result<TurnOutcome, SessionError> {
        let (context, epoch) = {
            let mut state = self.state.write().await;
            match state.phase {
                ChatPhase::Waiting => return Err(SessionError::Busy),
                ChatPhase::Disabled => return Err(SessionError::Disabled),
                ChatPhase::Ready => {}
            }
            state.begin_turn(command.user_text());
            (state.context.clone(), state.epoch())
        };

        let mut observer = SessionObserver {
            state: Arc::clone(&self.state),
            updates: self.updates.clone(),
            epoch,
            world_changed: false,
        };
        let outcome = self
            .orchestrator
            .run_turn(&context, &command, &mut observer)
            .await;

        let world_status = {
            let mut state = self.state.write().await;
            if state.epoch() != epoch {
                warn!(
                    world_id = %context.world_id,
                    entity_id = %context.entity_id,
                    "Session reset during turn; discarding result"
                );
                return Err(SessionError::Stale);
            }
            match &outcome {
                TurnOutcome::Completed(turn) => {
                    state.complete_turn(turn);
                    if state.phase == ChatPhase::Disabled {
                        info!(entity_id = %context.entity_id, "Chat disabled by server");
                    }
                }
                TurnOutcome::Failed(turn) => {
                    error!(
                        kind = turn.error.kind(),
                        error = %turn.error,
                        "Turn failed"
                    );
                    state.fail_turn(turn);
                }
            }
            state.world_status.clone()
        };

        if observer.world_changed {
            if let (Some(reconciler), Some(status)) = (&self.reconciler, world_status) {
                debug!(world_id = %context.world_id, "Reconciling world after turn");
                reconciler.reconcile(&context, &status).await;
            }
        }

        Ok(outcome)
    }

    /// Load the server's thread into history
    ///
    /// When the thread is empty, chat is enabled, and greeting is on, an
    /// opening turn with empty text is run and its outcome returned.
    pub async fn load_history(&self) -> Result<Option<TurnOutcome>, SessionError> {
        let (context, epoch, prior_phase) = {
            let mut state = self.state.write().await;
            let prior_phase = state.phase;
            if prior_phase == ChatPhase::Waiting {
                return Err(SessionError::Busy);
            }
            state.phase = ChatPhase::Waiting;
            (state.context.clone(), state.epoch(), prior_phase)
        };

        let result = self.orchestrator.calls().get_chats(&context).await;

        let greet = {
            let mut state = self.state.write().await;
            if state.epoch() != epoch {
                return Err(SessionError::Stale);
            }
            let history = match result {
                Ok(history) => history,
                Err(e) => {
                    error!(entity_id = %context.entity_id, error = %e, "Failed to load history");
                    state.fail_request(prior_phase);
                    return Err(e.into());
                }
            };
            let empty = history.messages.is_empty();
            state.load_history(history.messages);
            state.phase = if history.chat_enabled {
                ChatPhase::Ready
            } else {
                ChatPhase::Disabled
            };
            debug!(
                entity_id = %context.entity_id,
                entries = state.history().len(),
                enabled = history.chat_enabled,
                "History loaded"
            );
            empty && history.chat_enabled && self.greet_on_empty
        };

        if greet {
            return self.submit(String::new()).await.map(Some);
        }
        Ok(None)
    }

    /// Wipe the conversation on the server and locally
    pub async fn clear(&self) -> Result<(), SessionError> {
        if !self.supports_clear() {
            return Err(SessionError::ClearUnsupported);
        }
        let (context, epoch) = {
            let mut state = self.state.write().await;
            match state.phase {
                ChatPhase::Waiting => return Err(SessionError::Busy),
                ChatPhase::Disabled => return Err(SessionError::Disabled),
                ChatPhase::Ready => {}
            }
            state.phase = ChatPhase::Disabled;
            (state.context.clone(), state.epoch())
        };

        let result = self.orchestrator.calls().clear_chat(&context).await;

        let mut state = self.state.write().await;
        if state.epoch() != epoch {
            return Err(SessionError::Stale);
        }
        match result {
            Ok(()) => {
                state.clear_history();
                state.phase = ChatPhase::Ready;
                info!(entity_id = %context.entity_id, "History cleared");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to clear history");
                state.fail_request(ChatPhase::Ready);
                Err(e.into())
            }
        }
    }

    /// Switch the session to a new context
    ///
    /// Anything still in flight for the previous context is discarded when
    /// it returns.
    pub async fn reset(&self, context: SessionContext) {
        let mut state = self.state.write().await;
        debug!(
            from = %state.context.entity_id,
            to = %context.entity_id,
            "Resetting session"
        );
        state.reset(context);
    }
}
