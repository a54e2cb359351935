//! Gateway configuration from the environment.
//!
//! Parsing goes through a lookup closure so tests never touch the process environment.

use std::sync::Arc;
use std::time::Duration;

use crate::provider::{AnthropicClient, LocalClient, OpenAiClient, ProviderClient, ProviderKind};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_millis(60_000);
const DEFAULT_ORDER: &str = "openai,anthropic,local";

/// One provider entry as configured.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Name reported on responses (`ResponseSource::Provider`).
    pub name: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub enabled: bool,
}

impl core::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            name: kind.as_str().to_string(),
            api_key: None,
            endpoint: None,
            model: None,
            enabled: true,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Hosted providers need a key; the local provider needs an endpoint.
    pub fn is_configured(&self) -> bool {
        match self.kind {
            ProviderKind::OpenAi | ProviderKind::Anthropic => self.api_key.is_some(),
            ProviderKind::Local => self.endpoint.is_some(),
        }
    }

    /// `None` when the entry lacks the credentials or endpoint it needs.
    pub fn build_client(&self) -> Option<Arc<dyn ProviderClient>> {
        if !self.is_configured() {
            return None;
        }
        let client: Arc<dyn ProviderClient> = match self.kind {
            ProviderKind::OpenAi => {
                let mut client = OpenAiClient::new(self.api_key.clone()?);
                if let Some(endpoint) = &self.endpoint {
                    client = client.with_base_url(endpoint);
                }
                if let Some(model) = &self.model {
                    client = client.with_model(model);
                }
                Arc::new(client)
            }
            ProviderKind::Anthropic => {
                let mut client = AnthropicClient::new(self.api_key.clone()?);
                if let Some(endpoint) = &self.endpoint {
                    client = client.with_base_url(endpoint);
                }
                if let Some(model) = &self.model {
                    client = client.with_model(model);
                }
                Arc::new(client)
            }
            ProviderKind::Local => {
                let mut client = LocalClient::new(self.endpoint.clone()?);
                if let Some(model) = &self.model {
                    client = client.with_model(model);
                }
                Arc::new(client)
            }
        };
        Some(client)
    }
}

/// Ordered provider list plus timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub providers: Vec<ProviderConfig>,
    pub attempt_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for GatewayConfig {
    /// No providers: every request is answered by the fallback synthesizer.
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let order = get("MODHUB_AI_PROVIDERS").unwrap_or_else(|| DEFAULT_ORDER.to_string());
        let mut providers: Vec<ProviderConfig> = Vec::new();
        for name in order.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let kind: ProviderKind = match name.parse() {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::warn!(provider = name, error = %err, "ignoring unknown AI provider");
                    continue;
                }
            };
            if providers.iter().any(|p| p.kind == kind) {
                continue;
            }

            let (key_var, endpoint_var, model_var) = match kind {
                ProviderKind::OpenAi => (Some("OPENAI_API_KEY"), "OPENAI_BASE_URL", "OPENAI_MODEL"),
                ProviderKind::Anthropic => (Some("ANTHROPIC_API_KEY"), "ANTHROPIC_BASE_URL", "ANTHROPIC_MODEL"),
                ProviderKind::Local => (None, "LOCAL_AI_URL", "LOCAL_AI_MODEL"),
            };
            let entry = ProviderConfig {
                kind,
                name: kind.as_str().to_string(),
                api_key: key_var.and_then(get),
                endpoint: get(endpoint_var),
                model: get(model_var),
                enabled: get(&format!("{}_ENABLED", kind.as_str().to_ascii_uppercase()))
                    .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off"))
                    .unwrap_or(true),
            };

            if entry.is_configured() {
                providers.push(entry);
            } else {
                tracing::debug!(provider = %kind, "AI provider not configured; skipping");
            }
        }

        Self {
            providers,
            attempt_timeout: millis(get("MODHUB_AI_ATTEMPT_TIMEOUT_MS"), DEFAULT_ATTEMPT_TIMEOUT),
            total_timeout: millis(get("MODHUB_AI_TOTAL_TIMEOUT_MS"), DEFAULT_TOTAL_TIMEOUT),
        }
    }
}

fn millis(value: Option<String>, default: Duration) -> Duration {
    match value.as_deref().map(str::parse::<u64>) {
        Some(Ok(ms)) if ms > 0 => Duration::from_millis(ms),
        Some(_) => {
            tracing::warn!(?value, ?default, "invalid timeout; using default");
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_is_fallback_only() {
        let config = GatewayConfig::from_lookup(lookup(&[]));
        assert!(config.providers.is_empty());
        assert_eq!(config.attempt_timeout, DEFAULT_ATTEMPT_TIMEOUT);
        assert_eq!(config.total_timeout, DEFAULT_TOTAL_TIMEOUT);
    }

    #[test]
    fn order_follows_provider_list_and_skips_unconfigured() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("MODHUB_AI_PROVIDERS", "local, anthropic, bogus, openai"),
            ("LOCAL_AI_URL", "http://localhost:1234"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]));
        let kinds: Vec<_> = config.providers.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProviderKind::Local, ProviderKind::OpenAi]);
        assert_eq!(config.providers[1].model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn enabled_flag_and_timeouts_are_read() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "key"),
            ("ANTHROPIC_ENABLED", "false"),
            ("MODHUB_AI_ATTEMPT_TIMEOUT_MS", "250"),
            ("MODHUB_AI_TOTAL_TIMEOUT_MS", "not-a-number"),
        ]));
        assert_eq!(config.providers.len(), 1);
        assert!(!config.providers[0].enabled);
        assert_eq!(config.attempt_timeout, Duration::from_millis(250));
        assert_eq!(config.total_timeout, DEFAULT_TOTAL_TIMEOUT);
    }

    #[test]
    fn build_client_requires_credentials() {
        assert!(ProviderConfig::new(ProviderKind::OpenAi).build_client().is_none());

        let client = ProviderConfig::new(ProviderKind::Anthropic)
            .with_api_key("key")
            .with_model("claude-custom")
            .build_client()
            .unwrap();
        assert_eq!(client.kind(), ProviderKind::Anthropic);
        assert_eq!(client.default_model(), "claude-custom");
    }

    #[test]
    fn debug_does_not_leak_api_key() {
        let config = ProviderConfig::new(ProviderKind::OpenAi).with_api_key("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
