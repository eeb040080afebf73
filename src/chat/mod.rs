//! Chat module
//!
//! Chat data models and the transport capability bundle used to reach the
//! server-hosted agent.

pub mod calls;
pub mod character;
pub mod design;
pub mod http;
pub mod models;

pub use calls::ChatCalls;
pub use character::CharacterChatCalls;
pub use design::DesignChatCalls;
pub use http::HttpTransport;
pub use models::{
    ActionDescriptor, ActionKind, ChatCommand, ChatHistory, HistoryEntry, SessionContext,
    StepResult, WorldStatus,
};
