//! Provider clients: one per external completion API family, plus a local variant.
//!
//! Clients make exactly one HTTP call per `complete` and map every failure to a
//! [`ProviderError`]. Timeouts, ordering and fallback belong to the gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::request::{AiRequest, ChatMessage};
use crate::response::Usage;

mod anthropic;
mod local;
mod openai;

pub use anthropic::AnthropicClient;
pub use local::LocalClient;
pub use openai::OpenAiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Local,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Local => "local",
        }
    }
}

impl core::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "local" => Ok(ProviderKind::Local),
            other => Err(format!("unknown provider kind '{other}'")),
        }
    }
}

/// A request resolved against one provider entry (model chosen, options flattened).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderRequest {
    /// The request's explicit model wins over the entry default.
    pub fn resolve(request: &AiRequest, default_model: &str) -> Self {
        let options = request.options();
        Self {
            messages: request.messages().to_vec(),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

/// A successful provider reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
}

/// Uniform completion client.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn default_model(&self) -> &str;

    async fn complete(&self, request: &ProviderRequest) -> Result<Completion, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Turn a non-2xx response into a [`ProviderError::Http`], preferring the API's own message.
async fn http_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

    let message = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => body.error.message,
        Err(_) => text,
    };

    ProviderError::Http {
        provider: provider.to_string(),
        status,
        message,
    }
}
