//! Step observers
//!
//! Callers watch a turn's progress through `StepObserver`, which is
//! notified once per step result, terminal step included.

use crate::chat::models::StepResult;
use async_trait::async_trait;

/// Receives every step result of a turn as it arrives
#[async_trait]
pub trait StepObserver: Send {
    /// Called once per step result
    ///
    /// `tool_calls` is the turn's Tool Call Log after this step was
    /// recorded. It is empty when the terminal step is reported.
    async fn on_step(&mut self, step: &StepResult, tool_calls: &[String]);
}

/// Observer that ignores every step
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl StepObserver for NoopObserver {
    async fn on_step(&mut self, _step: &StepResult, _tool_calls: &[String]) {}
}

#[async_trait]
impl<F> StepObserver for F
where
    F: FnMut(&StepResult, &[String]) + Send,
{
    async fn on_step(&mut self, step: &StepResult, tool_calls: &[String]) {
        (self)(step, tool_calls)
    }
}
