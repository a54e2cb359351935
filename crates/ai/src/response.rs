use serde::{Deserialize, Serialize};

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Where a response came from: a named provider entry, or the local fallback.
///
/// Serialized as a plain string (`"openai"`, `"fallback"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseSource {
    Provider(String),
    Fallback,
}

impl ResponseSource {
    pub const FALLBACK: &'static str = "fallback";

    pub fn provider(name: impl Into<String>) -> Self {
        Self::Provider(name.into())
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResponseSource::Fallback)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResponseSource::Provider(name) => name,
            ResponseSource::Fallback => Self::FALLBACK,
        }
    }
}

impl core::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ResponseSource {
    fn from(value: String) -> Self {
        if value == Self::FALLBACK {
            ResponseSource::Fallback
        } else {
            ResponseSource::Provider(value)
        }
    }
}

impl From<ResponseSource> for String {
    fn from(value: ResponseSource) -> Self {
        match value {
            ResponseSource::Provider(name) => name,
            ResponseSource::Fallback => ResponseSource::FALLBACK.to_string(),
        }
    }
}

/// A provider attempt that did not produce the response (kept for diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub provider: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub source: ResponseSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_attempts: Vec<AttemptFailure>,
}

impl AiResponse {
    pub fn new(content: impl Into<String>, source: ResponseSource) -> Self {
        Self {
            content: content.into(),
            usage: None,
            model: None,
            finish_reason: None,
            source,
            failed_attempts: Vec::new(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn with_failed_attempts(mut self, failures: Vec<AttemptFailure>) -> Self {
        self.failed_attempts = failures;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_as_plain_string() {
        let fallback = serde_json::to_value(ResponseSource::Fallback).unwrap();
        assert_eq!(fallback, serde_json::json!("fallback"));

        let provider: ResponseSource = serde_json::from_value(serde_json::json!("anthropic")).unwrap();
        assert_eq!(provider, ResponseSource::provider("anthropic"));
        assert!(!provider.is_fallback());
    }

    #[test]
    fn empty_diagnostics_are_omitted_from_json() {
        let response = AiResponse::new("hi", ResponseSource::provider("openai"));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("failed_attempts").is_none());
        assert!(json.get("usage").is_none());
        assert_eq!(json["source"], "openai");
    }
}
