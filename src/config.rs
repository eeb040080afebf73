//! Client configuration
//!
//! Centralized configuration with environment variable support and
//! sensible defaults. Server address and credentials are passed into the
//! transport at construction time rather than held in globals.

use crate::error::ClientError;
use crate::orchestrator::constants::DEFAULT_MAX_CONTINUATIONS;
use std::env;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Turn orchestration configuration
    pub turn: TurnConfig,
}

/// Where and how to reach the chat server
#[derive(Clone)]
pub struct ServerConfig {
    /// Base URL of the server, without the `/api` suffix
    pub base_url: String,
    /// Bearer token sent with every request
    pub auth_key: String,
    /// Per-request timeout (in seconds)
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("auth_key", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Turn orchestration configuration
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Maximum number of `continue` calls per turn
    pub max_continuations: u32,
    /// Run an opening turn with empty user text when the thread is empty
    pub greet_on_empty: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:5000".to_string(),
                auth_key: "auth".to_string(),
                request_timeout_secs: 30,
            },
            turn: TurnConfig {
                max_continuations: DEFAULT_MAX_CONTINUATIONS,
                greet_on_empty: true,
            },
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                base_url: env::var("WORLDAI_URL").unwrap_or(defaults.server.base_url),
                auth_key: env::var("WORLDAI_AUTH_KEY").unwrap_or(defaults.server.auth_key),
                request_timeout_secs: env::var("WORLDAI_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(defaults.server.request_timeout_secs),
            },
            turn: TurnConfig {
                max_continuations: env::var("WORLDAI_MAX_CONTINUATIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(defaults.turn.max_continuations),
                greet_on_empty: env::var("WORLDAI_GREET_ON_EMPTY")
                    .ok()
                    .map(|v| parse_flag(&v))
                    .unwrap_or(defaults.turn.greet_on_empty),
            },
        }
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is usable
    /// * `Err(ClientError::InvalidConfig)` - With the first problem found
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.server.base_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "base_url cannot be empty".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.turn.max_continuations == 0 {
            return Err(ClientError::InvalidConfig(
                "max_continuations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed
    pub fn api_root(&self) -> String {
        format!("{}/api", self.server.base_url.trim_end_matches('/'))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
