// State management module
// Handles session state, the session controller, and world reconciliation

pub mod controller;
pub mod reconcile;
pub mod session_state;

pub use controller::{ChatSession, SharedSessionState, StepUpdate};
pub use reconcile::{LoggingReconciler, WorldReconciler};
pub use session_state::{ChatPhase, LiveMessage, SessionState};
