//! HTTP gateway for OpenAI-compatible backends (LM Studio, llama.cpp server,
//! vLLM, OpenAI itself).
//!
//! - `POST {api_base}/chat/completions` with `{ messages, model? }`
//! - `GET {api_base}/models`

use async_trait::async_trait;
use tracing::{debug, error};

use lmrelay_core::config::schema::BackendConfig;
use lmrelay_core::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelList};

use crate::error::GatewayError;
use crate::traits::{Completion, ModelGateway};

// ─────────────────────────────────────────────
// HttpGateway
// ─────────────────────────────────────────────

/// Talks to any OpenAI-compatible HTTP API via `reqwest`.
pub struct HttpGateway {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"http://localhost:1234/v1"`).
    api_base: String,
    /// Optional bearer token.
    api_key: Option<String>,
    /// Optional model field for completion requests.
    model: Option<String>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl HttpGateway {
    /// Build a gateway from the backend section of the config.
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(HttpGateway {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key().map(String::from),
            model: config.model().map(String::from),
        })
    }

    /// Full chat completions URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Full model listing URL.
    fn models_url(&self) -> String {
        format!("{}/models", self.api_base)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<String, GatewayError> {
        let response = self.authorize(req).send().await.map_err(|e| {
            error!(api_base = %self.api_base, error = %e, "{what}: HTTP request failed");
            GatewayError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                api_base = %self.api_base,
                status = %status,
                body = %body,
                "{what}: backend error"
            );
            return Err(GatewayError::BadStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GatewayError> {
        debug!(
            api_base = %self.api_base,
            messages = messages.len(),
            "calling chat completions"
        );

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
        };

        let text = self
            .send(self.client.post(self.completions_url()).json(&body), "chat completion")
            .await?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "failed to parse chat completion response");
            GatewayError::MalformedResponse(e.to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("missing choices[0].message.content".to_string())
            })?;

        debug!(reply_len = content.len(), "chat completion received");

        Ok(Completion {
            reply: ChatMessage::assistant(content),
            usage: parsed.usage,
        })
    }

    async fn list_model_name(&self) -> Result<String, GatewayError> {
        let text = self
            .send(self.client.get(self.models_url()), "model listing")
            .await?;

        let list: ModelList = serde_json::from_str(&text)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        list.data
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| GatewayError::MalformedResponse("backend lists no models".to_string()))
    }

    fn display_name(&self) -> &str {
        &self.api_base
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_base: &str) -> BackendConfig {
        BackendConfig {
            api_base: api_base.to_string(),
            ..BackendConfig::default()
        }
    }

    fn gateway(api_base: &str) -> HttpGateway {
        HttpGateway::new(&make_config(api_base)).unwrap()
    }

    // ── Unit tests ──

    #[test]
    fn test_urls_trailing_slash() {
        let gw = gateway("http://localhost:1234/v1/");
        assert_eq!(gw.completions_url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(gw.models_url(), "http://localhost:1234/v1/models");
    }

    #[test]
    fn test_empty_key_and_model_are_unset() {
        let gw = gateway("http://localhost:1234/v1");
        assert!(gw.api_key.is_none());
        assert!(gw.model.is_none());
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(GatewayError::BadStatus(503).status(), Some(503));
        assert_eq!(GatewayError::MalformedResponse("x".into()).status(), None);
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "hi" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11 }
            })))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let completion = gw
            .complete(&[ChatMessage::system("be brief"), ChatMessage::user("hello")])
            .await
            .unwrap();

        assert_eq!(completion.reply, ChatMessage::assistant("hi"));
        assert_eq!(completion.usage.unwrap()["total_tokens"], 11);
    }

    #[tokio::test]
    async fn test_complete_sends_messages_verbatim() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"},
                    {"role": "assistant", "content": "hi"},
                    {"role": "user", "content": "again"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
            })))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
            ChatMessage::user("again"),
        ];

        // If the body matcher fails, wiremock returns 404 → BadStatus
        let completion = gw.complete(&messages).await.unwrap();
        assert_eq!(completion.reply.content, "ok");
        assert!(completion.usage.is_none());
    }

    #[tokio::test]
    async fn test_complete_sends_model_and_key_when_configured() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-local"))
            .and(body_json(serde_json::json!({
                "model": "llama-3-8b",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
            })))
            .mount(&mock_server)
            .await;

        let config = BackendConfig {
            api_base: mock_server.uri(),
            api_key: "sk-local".to_string(),
            model: "llama-3-8b".to_string(),
            ..BackendConfig::default()
        };
        let gw = HttpGateway::new(&config).unwrap();

        let completion = gw.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(completion.reply.content, "ok");
    }

    #[tokio::test]
    async fn test_complete_bad_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::BadStatus(500)));
    }

    #[tokio::test]
    async fn test_complete_missing_content_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            })))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_empty_choices_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_non_json_body_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_network_error() {
        // Point to a port that's not listening
        let gw = gateway("http://127.0.0.1:1");
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_complete_timeout_is_transport() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({
                        "choices": [{ "message": { "content": "late" } }]
                    })),
            )
            .mount(&mock_server)
            .await;

        let config = BackendConfig {
            api_base: mock_server.uri(),
            timeout_secs: 1,
            ..BackendConfig::default()
        };
        let gw = HttpGateway::new(&config).unwrap();
        let err = gw.complete(&[ChatMessage::user("hello")]).await.unwrap_err();

        match err {
            GatewayError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected transport timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_still_completes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "ok" } }]
            })))
            .mount(&mock_server)
            .await;

        let config = BackendConfig {
            api_base: mock_server.uri(),
            timeout_secs: 0,
            ..BackendConfig::default()
        };
        let gw = HttpGateway::new(&config).unwrap();
        let completion = gw.complete(&[ChatMessage::user("hello")]).await.unwrap();

        assert_eq!(completion.reply.content, "ok");
    }

    #[tokio::test]
    async fn test_list_model_name_first_entry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    { "id": "qwen2.5-7b-instruct", "object": "model" },
                    { "id": "text-embedding-nomic", "object": "model" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        assert_eq!(gw.list_model_name().await.unwrap(), "qwen2.5-7b-instruct");
    }

    #[tokio::test]
    async fn test_list_model_name_empty_list() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.list_model_name().await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_list_model_name_bad_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let gw = gateway(&mock_server.uri());
        let err = gw.list_model_name().await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
