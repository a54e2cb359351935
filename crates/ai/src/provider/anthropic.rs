//! Anthropic messages-API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Completion, ProviderClient, ProviderKind, ProviderRequest, http_error};
use crate::error::ProviderError;
use crate::request::{ChatMessage, ChatRole};
use crate::response::Usage;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub(crate) const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Anthropic API client.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The messages API takes system text out of band; multiple system turns are joined.
    fn build_body<'a>(request: &'a ProviderRequest) -> MessagesRequest<'a> {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .collect(),
        }
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(|e| ProviderError::transport("anthropic", format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(http_error("anthropic", response).await);
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::invalid_response("anthropic", format!("failed to parse body: {e}"))
        })?;

        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::invalid_response("anthropic", "no text content in reply"));
        }

        Ok(Completion {
            content: text.concat(),
            usage: parsed.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            model: parsed.model,
            finish_reason: parsed.stop_reason,
        })
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hello")],
            model: "claude-test".to_string(),
            max_tokens: 32,
            temperature: 0.1,
        }
    }

    #[test]
    fn system_messages_move_out_of_the_message_list() {
        let req = request();
        let body = AnthropicClient::build_body(&req);
        assert_eq!(body.system.as_deref(), Some("be brief"));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn maps_text_blocks_and_usage() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "ak-test")
                .header("anthropic-version", "2023-06-01");
            then.status(200).json_body(json!({
                "model": "claude-test",
                "stop_reason": "end_turn",
                "content": [{"type": "text", "text": "hello "}, {"type": "text", "text": "back"}],
                "usage": {"input_tokens": 4, "output_tokens": 3}
            }));
        });

        let client = AnthropicClient::new("ak-test").with_base_url(server.base_url());
        let completion = client.complete(&request()).await.unwrap();

        mock.assert();
        assert_eq!(completion.content, "hello back");
        assert_eq!(completion.finish_reason.as_deref(), Some("end_turn"));
        let usage = completion.usage.unwrap();
        assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (4, 3, 7));
    }

    #[tokio::test]
    async fn server_error_is_reported_with_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body("overloaded");
        });

        let client = AnthropicClient::new("ak-test").with_base_url(server.base_url());
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 529, ref message, .. } if message == "overloaded"));
    }
}
