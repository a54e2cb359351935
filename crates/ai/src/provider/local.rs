//! Self-hosted, OpenAI-compatible server (llama.cpp, vLLM, Ollama's `/v1` shim, ...).

use async_trait::async_trait;
use reqwest::Client;

use super::openai::send_chat_completion;
use super::{Completion, ProviderClient, ProviderKind, ProviderRequest};
use crate::error::ProviderError;

pub(crate) const DEFAULT_MODEL: &str = "local-model";

/// Client for a local model server. No credentials; the endpoint is the base URL
/// and requests go to `{base}/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct LocalClient {
    client: Client,
    base_url: String,
    model: String,
}

impl LocalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ProviderClient for LocalClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        send_chat_completion(&self.client, "local", &url, None, request).await
    }
}
