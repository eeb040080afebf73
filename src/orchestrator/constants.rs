//! Orchestrator constants
//!
//! Centralized constants used by the turn loop.

/// Default cap on `continue` calls per turn
///
/// A turn that is still pending after this many continuations is abandoned
/// with a protocol error.
pub const DEFAULT_MAX_CONTINUATIONS: u32 = 20;
