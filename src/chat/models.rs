//! Chat data models
//!
//! Defines the session context, turn commands, the step result returned by
//! each transport call, and the history entries kept by the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status value the server uses for a successful terminal step
pub const STATUS_OK: &str = "ok";

fn default_true() -> bool {
    true
}

fn default_status() -> String {
    STATUS_OK.to_string()
}

/// Identifies what a turn is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionContext {
    /// World identifier
    pub world_id: String,
    /// Entity the agent controls (usually a character)
    pub entity_id: String,
    /// Item currently selected by the player, used by action turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl SessionContext {
    /// Create a context for a world/entity pair with no selected item
    pub fn new(world_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            world_id: world_id.into(),
            entity_id: entity_id.into(),
            item_id: None,
        }
    }

    /// Same context with the given item selected
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }
}

/// Action the player performs on the engaged entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Use an item on the entity
    Use,
    /// Drop an item in front of the entity
    Drop,
}

impl ActionKind {
    /// Convert the action to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Use => "use",
            ActionKind::Drop => "drop",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "use" => Ok(ActionKind::Use),
            "drop" => Ok(ActionKind::Drop),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Structured action turn: an action applied with an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// What to do
    pub action: ActionKind,
    /// Item the action refers to
    pub item_id: String,
}

impl ActionDescriptor {
    /// Use the given item on the engaged entity
    pub fn use_item(item_id: impl Into<String>) -> Self {
        Self {
            action: ActionKind::Use,
            item_id: item_id.into(),
        }
    }
}

/// What starts a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Free text from the operator (may be empty for an opening turn)
    Message(String),
    /// Structured action
    Action(ActionDescriptor),
}

impl ChatCommand {
    /// Operator text to preserve for retry; empty for actions
    pub fn user_text(&self) -> &str {
        match self {
            ChatCommand::Message(text) => text,
            ChatCommand::Action(_) => "",
        }
    }
}

/// Information about an element (item, character) in the world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElemInfo {
    /// Element id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
}

/// Vital stats for a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterData {
    /// Character id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Asleep
    pub sleeping: bool,
    /// Paralyzed (wire spelling kept)
    pub paralized: bool,
    /// Poisoned
    pub poisoned: bool,
    /// Brainwashed
    pub brainwashed: bool,
    /// Captured
    pub captured: bool,
    /// Invisible
    pub invisible: bool,
    /// Money
    pub credits: i64,
    /// Health percentage
    pub health: i64,
    /// Strength percentage
    pub strength: i64,
    /// Friendship with the player
    pub friendship: i64,
    /// Whether the player may chat with this character
    pub can_chat: bool,
    /// Items carried
    pub inventory: Vec<ElemInfo>,
}

impl Default for CharacterData {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            sleeping: false,
            paralized: false,
            poisoned: false,
            brainwashed: false,
            captured: false,
            invisible: false,
            credits: 0,
            health: 0,
            strength: 0,
            friendship: 0,
            can_chat: true,
            inventory: Vec::new(),
        }
    }
}

/// Player status attached to world status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    /// Player vital stats
    pub status: CharacterData,
    /// Currently selected item
    pub selected_item: Option<String>,
}

/// World status reported alongside chat steps
///
/// Opaque to the orchestrator; the session uses `changed` and
/// `response_message` to decide on reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldStatus {
    /// Game time in minutes
    pub current_time: i64,
    /// Player has won
    pub game_won: bool,
    /// Player is alive
    pub player_alive: bool,
    /// Site the player is at
    pub location_id: String,
    /// Character the player is engaged with
    pub engaged_character_id: String,
    /// World state changed; cached world data must be reloaded
    pub changed: bool,
    /// Message produced by the command or action
    pub response_message: String,
    /// Last world event
    pub last_event: String,
    /// Player data
    pub player: PlayerData,
}

impl Default for WorldStatus {
    fn default() -> Self {
        Self {
            current_time: 0,
            game_won: false,
            player_alive: true,
            location_id: String::new(),
            engaged_character_id: String::new(),
            changed: false,
            response_message: String::new(),
            last_event: String::new(),
            player: PlayerData::default(),
        }
    }
}

/// Result of one transport call within a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Turn identifier, stable across all steps of one turn
    #[serde(default)]
    pub id: String,
    /// Terminal flag; the server treats a missing flag as done
    #[serde(default = "default_true")]
    pub done: bool,
    /// Outcome code, meaningful only when `done`
    #[serde(default = "default_status")]
    pub status: String,
    /// User message that initiated the turn
    #[serde(default)]
    pub user: String,
    /// Event that initiated the turn
    #[serde(default)]
    pub event: String,
    /// Agent reply text
    #[serde(default)]
    pub reply: String,
    /// Text describing something the entity did
    #[serde(default)]
    pub updates: String,
    /// Capability the agent is invoking, empty when none
    #[serde(default)]
    pub tool_call: String,
    /// Whether further input is permitted
    #[serde(default = "default_true", rename = "chat_enabled", alias = "enabled")]
    pub enabled: bool,
    /// World status delivered with this step, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_status: Option<WorldStatus>,
}

impl StepResult {
    /// Pending step for the given turn
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            done: false,
            status: default_status(),
            user: String::new(),
            event: String::new(),
            reply: String::new(),
            updates: String::new(),
            tool_call: String::new(),
            enabled: true,
            world_status: None,
        }
    }

    /// Terminal `ok` step for the given turn
    pub fn completed(id: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            done: true,
            reply: reply.into(),
            ..Self::pending(id)
        }
    }

    /// Whether the terminal status is `ok`
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Tool call name, if the agent is running one
    pub fn tool_call(&self) -> Option<&str> {
        if self.tool_call.is_empty() {
            None
        } else {
            Some(&self.tool_call)
        }
    }

    /// Whether the attached world status reports a change
    pub fn world_changed(&self) -> bool {
        self.world_status.as_ref().is_some_and(|s| s.changed)
    }
}

/// A completed exchange in the chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stable identifier for list rendering
    #[serde(default = "generate_entry_id")]
    pub id: String,
    /// Operator text
    #[serde(default)]
    pub user: String,
    /// Triggering event
    #[serde(default)]
    pub event: String,
    /// Entity activity text
    #[serde(default)]
    pub updates: String,
    /// Agent reply
    #[serde(default)]
    pub reply: String,
    /// Tool calls made while producing the reply
    #[serde(default)]
    pub tool_call_log: Vec<String>,
    /// When the turn completed, for turns run by this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

impl HistoryEntry {
    /// Build the history entry for a completed turn
    ///
    /// The user text falls back to the text the operator submitted when the
    /// server does not echo it.
    pub fn from_turn(step: &StepResult, user_input: &str, tool_call_log: Vec<String>) -> Self {
        let id = if step.id.is_empty() {
            generate_entry_id()
        } else {
            step.id.clone()
        };
        let user = if step.user.is_empty() {
            user_input.to_string()
        } else {
            step.user.clone()
        };
        Self {
            id,
            user,
            event: step.event.clone(),
            updates: step.updates.clone(),
            reply: step.reply.clone(),
            tool_call_log,
            completed_at: Some(Utc::now()),
        }
    }
}

/// Chat thread as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    /// Past exchanges, oldest first
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
    /// Whether the operator may chat
    #[serde(default = "default_true")]
    pub chat_enabled: bool,
}
