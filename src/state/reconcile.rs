//! World reconciliation hook
//!
//! Called once after a turn settles when any of its steps reported that the
//! world changed, so cached world data can be reloaded.

use crate::chat::models::{SessionContext, WorldStatus};
use async_trait::async_trait;
use tracing::debug;

/// Reloads world data after the server reports a change
#[async_trait]
pub trait WorldReconciler: Send + Sync {
    /// The world changed during a turn; `status` is the latest reported status
    async fn reconcile(&self, context: &SessionContext, status: &WorldStatus);
}

/// Reconciler that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReconciler;

#[async_trait]
impl WorldReconciler for LoggingReconciler {
    async fn reconcile(&self, context: &SessionContext, status: &WorldStatus) {
        debug!(
            world_id = %context.world_id,
            location_id = %status.location_id,
            "World changed"
        );
    }
}
