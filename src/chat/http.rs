//! HTTP transport adapter
//!
//! Thin JSON-over-HTTP client for the chat server. Base URL and bearer
//! token come from `ClientConfig` at construction time.

use crate::chat::models::{ActionKind, StepResult, WorldStatus};
use crate::config::ClientConfig;
use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Request body for the turn endpoints
///
/// Built through the constructors so that each command carries exactly one
/// payload shape.
#[derive(Debug, Serialize)]
pub struct TurnRequest<'a> {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

impl<'a> TurnRequest<'a> {
    fn command(command: &'static str) -> Self {
        Self {
            command,
            user: None,
            view: None,
            action: None,
            item: None,
            id: None,
        }
    }

    /// Start a chat turn with operator text
    pub fn start_chat(user: &'a str) -> Self {
        Self {
            user: Some(user),
            ..Self::command("start")
        }
    }

    /// Start a design chat turn, reporting the view the operator is on
    pub fn start_design_chat(user: &'a str, view: Option<&'a Value>) -> Self {
        Self {
            view,
            ..Self::start_chat(user)
        }
    }

    /// Start an action turn
    pub fn start_action(action: ActionKind, item: &'a str) -> Self {
        Self {
            action: Some(action),
            item: Some(item),
            ..Self::command("start")
        }
    }

    /// Continue a pending turn
    pub fn continue_turn(id: &'a str) -> Self {
        Self {
            id: Some(id),
            ..Self::command("continue")
        }
    }

    /// Wipe the thread
    pub fn clear() -> Self {
        Self::command("clear")
    }
}

/// Step response as the server wraps it
#[derive(Debug, Deserialize)]
struct StepEnvelope {
    chat_response: StepResult,
    #[serde(default)]
    world_status: Option<WorldStatus>,
    #[serde(default)]
    view: Option<Value>,
}


/// Decoded step plus the pass-through fields that travel beside it
#[derive(Debug, Clone)]
pub struct StepResponse {
    /// Step result with `world_status` attached
    pub step: StepResult,
    /// Design view reported by the server, if any
    pub view: Option<Value>,
}

/// JSON client for the chat server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_root: String,
    auth_key: String,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// # Errors
    /// * `ClientError::InvalidConfig` - If the configuration does not validate
    /// * `ClientError::Http` - If the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_root: config.api_root(),
            auth_key: config.server.auth_key.clone(),
        })
    }

    /// Create a transport around an existing client (shared connection pool)
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        auth_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_root: format!("{}/api", base_url.trim_end_matches('/')),
            auth_key: auth_key.into(),
        }
    }

    /// Full URL for an API path such as `/design_chat`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_key)
            .send()
            .await?;
        Self::read_json(response, &url).await
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_key)
            .json(body)
            .send()
            .await?;
        Self::read_json(response, &url).await
    }

    /// POST a turn request and decode the step, unwrapping the envelope
    pub async fn post_step(
        &self,
        path: &str,
        request: &TurnRequest<'_>,
    ) -> Result<StepResponse, ClientError> {
        let body: Value = self.post_json(path, request).await?;
        Self::decode_step(body)
    }

    /// Decode a step body
    ///
    /// A body carrying `chat_response` must be a well-formed envelope. A body
    /// without it is accepted as a bare step only when it carries an `id`.
    fn decode_step(body: Value) -> Result<StepResponse, ClientError> {
        let raw = body.to_string();
        let decode_error = |source| ClientError::Decode {
            source,
            body: raw.clone(),
        };

        if body.get("chat_response").is_some() {
            let envelope: StepEnvelope = serde_json::from_value(body).map_err(decode_error)?;
            let mut step = envelope.chat_response;
            if envelope.world_status.is_some() {
                step.world_status = envelope.world_status;
            }
            return Ok(StepResponse {
                step,
                view: envelope.view,
            });
        }

        if body.get("id").is_none() {
            return Err(decode_error(serde::de::Error::custom(
                "expected `chat_response` or a step with an `id`",
            )));
        }
        let step: StepResult = serde_json::from_value(body).map_err(decode_error)?;
        Ok(StepResponse { step, view: None })
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                url = %url,
                status_code = status_code,
                error_body = %body,
                "Chat server returned error status"
            );
            return Err(ClientError::Status {
                status: status_code,
                body,
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            source,
            body: body.clone(),
        })?;

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            tracing::error!(url = %url, error = %message, "Chat server reported error");
            return Err(ClientError::Server(message.to_string()));
        }

        serde_json::from_value(value).map_err(|source| ClientError::Decode { source, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use serial_test::serial;

    fn transport(server: &Server) -> HttpTransport {
        HttpTransport::with_client(reqwest::Client::new(), &server.url(), "test-key")
    }

    #[test]
    fn test_turn_request_wire_shapes() {
        let start = serde_json::to_value(TurnRequest::start_chat("hello")).unwrap();
        assert_eq!(start, json!({"command": "start", "user": "hello"}));

        let action = serde_json::to_value(TurnRequest::start_action(ActionKind::Use, "i7")).unwrap();
        assert_eq!(
            action,
            json!({"command": "start", "action": "use", "item": "i7"})
        );

        let cont = serde_json::to_value(TurnRequest::continue_turn("t1")).unwrap();
        assert_eq!(cont, json!({"command": "continue", "id": "t1"}));

        let clear = serde_json::to_value(TurnRequest::clear()).unwrap();
        assert_eq!(clear, json!({"command": "clear"}));
    }

    #[tokio::test]
    #[serial]
    async fn test_post_step_unwraps_envelope() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"command": "continue", "id": "t1"})))
            .with_status(200)
            .with_body(
                r#"{
                    "chat_response": {"id": "t1", "done": false, "tool_call": "lookup"},
                    "world_status": {"changed": true, "response_message": "The door opens"},
                    "view": {"element_type": "World", "id": "w1"}
                }"#,
            )
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::continue_turn("t1"))
            .await;

        mock.assert_async().await;
        let response = result.unwrap();
        assert_eq!(response.step.id, "t1");
        assert!(!response.step.done);
        assert_eq!(response.step.tool_call(), Some("lookup"));
        assert!(response.step.world_changed());
        assert_eq!(response.view.unwrap()["id"], "w1");
    }

    #[tokio::test]
    #[serial]
    async fn test_post_step_accepts_bare_step() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .with_status(200)
            .with_body(r#"{"id": "t9", "done": true, "reply": "Done"}"#)
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::continue_turn("t9"))
            .await;

        mock.assert_async().await;
        let response = result.unwrap();
        assert_eq!(response.step.reply, "Done");
        assert!(response.view.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_error_status_is_reported() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/design_chat")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let result: Result<Value, _> = transport(&server).get_json("/design_chat").await;

        mock.assert_async().await;
        match result {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_json_is_decode_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::clear())
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_envelope_is_decode_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .with_status(200)
            .with_body(r#"{"chat_response": {"id": 5, "done": false, "reply": "partial"}}"#)
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::continue_turn("t1"))
            .await;

        mock.assert_async().await;
        match result {
            Err(ClientError::Decode { body, .. }) => assert!(body.contains("partial")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_unrelated_object_is_not_a_step() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::continue_turn("t1"))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ClientError::Decode { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn test_error_body_is_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/design_chat")
            .with_status(200)
            .with_body(r#"{"error": "malformed input"}"#)
            .create_async()
            .await;

        let result = transport(&server)
            .post_step("/design_chat", &TurnRequest::continue_turn("x"))
            .await;

        mock.assert_async().await;
        match result {
            Err(ClientError::Server(message)) => assert_eq!(message, "malformed input"),
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let transport = HttpTransport::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            "test-key",
        );
        let result: Result<Value, _> = transport.get_json("/design_chat").await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }
}
