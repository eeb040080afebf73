//! Error types and error handling for the client
//!
//! Errors are layered: `ClientError` for a single transport exchange,
//! `TurnError` for a whole orchestrated turn, and `SessionError` for
//! requests the Session Controller refuses or cannot apply.

use thiserror::Error;

/// Message shown to the operator for any failed turn
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong.";

/// Transport-level errors
///
/// Everything that can go wrong during one request/response exchange with
/// the chat server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("Server returned error status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body was not the expected JSON shape
    #[error("Failed to parse JSON response: {source} - Response body: {body}")]
    Decode {
        /// Underlying decoding error
        #[source]
        source: serde_json::Error,
        /// Raw response body
        body: String,
    },

    /// The server answered with an `{"error": ...}` body
    #[error("Server reported error: {0}")]
    Server(String),

    /// The chat target does not offer this capability (e.g. clearing history)
    #[error("Operation not supported by this chat: {0}")]
    Unsupported(&'static str),

    /// Client configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why an orchestrated turn failed
///
/// All variants render as the same generic message in the UI, but they are
/// kept apart for logs and tests.
#[derive(Error, Debug)]
pub enum TurnError {
    /// A start or continue exchange failed (network or decoding)
    #[error("Transport error: {0}")]
    Transport(#[from] ClientError),

    /// The server kept reporting pending steps past the continuation cap
    #[error("Turn {turn_id} did not complete after {limit} continuations")]
    ProtocolExceeded {
        /// Turn identifier returned by `start`
        turn_id: String,
        /// The continuation cap that was reached
        limit: u32,
    },

    /// The terminal step reported a non-`ok` status
    #[error("Server rejected turn {turn_id} with status '{status}'")]
    ServerRejected {
        /// Turn identifier
        turn_id: String,
        /// Status code reported by the server
        status: String,
    },
}

impl TurnError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Transport(_) => "transport",
            TurnError::ProtocolExceeded { .. } => "protocol_exceeded",
            TurnError::ServerRejected { .. } => "server_rejected",
        }
    }
}

/// Errors returned by the Session Controller
#[derive(Error, Debug)]
pub enum SessionError {
    /// A turn is already in flight
    #[error("A turn is already in progress")]
    Busy,

    /// The server disabled further input for this conversation
    #[error("Chat is disabled for this conversation")]
    Disabled,

    /// An item action was requested with no item selected
    #[error("No item is selected")]
    NoItemSelected,

    /// The chat target has no clear capability
    #[error("Clearing history is not supported for this chat")]
    ClearUnsupported,

    /// The session context changed while the request was in flight;
    /// the result was discarded
    #[error("Session changed while the request was in flight")]
    Stale,

    /// A non-turn request (history load, clear) failed
    #[error("Request failed: {0}")]
    Transport(#[from] ClientError),
}
