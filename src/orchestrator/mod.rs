//! Orchestrator module
//!
//! Contains the turn loop and the observer interface used to follow a turn
//! while it runs. The loop is payload-agnostic: chat and action turns share
//! it, differing only in which calls start and continue them.

pub mod constants;
pub mod observer;
pub mod turn;

pub use observer::{NoopObserver, StepObserver};
pub use turn::{CompletedTurn, FailedTurn, ToolCallLog, TurnOrchestrator, TurnOutcome};
