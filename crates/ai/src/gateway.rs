//! The provider-ordered completion gateway.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::Instant;

use crate::config::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_TOTAL_TIMEOUT, GatewayConfig};
use crate::error::{AiError, ProviderError};
use crate::fallback::FallbackSynthesizer;
use crate::provider::{ProviderClient, ProviderRequest};
use crate::request::{AiOptions, AiRequest, ChatMessage, ExpectedShape};
use crate::response::{AiResponse, AttemptFailure, ResponseSource};
use crate::shape::{IntentMatch, IntentShape, JsonShape, SentimentAnalysis, SentimentShape, Structured, conform};

/// One slot in the ordered provider list.
#[derive(Clone)]
pub struct ProviderEntry {
    /// Reported as the response source when this entry answers.
    pub name: String,
    pub client: Arc<dyn ProviderClient>,
    pub enabled: bool,
}

impl ProviderEntry {
    pub fn new(name: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        Self {
            name: name.into(),
            client,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl core::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("kind", &self.client.kind())
            .field("model", &self.client.default_model())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AiGatewayBuilder {
    entries: Vec<ProviderEntry>,
    attempt_timeout: Duration,
    total_timeout: Duration,
}

impl Default for AiGatewayBuilder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl AiGatewayBuilder {
    /// Appends to the end of the try order.
    pub fn provider(mut self, entry: ProviderEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    pub fn build(self) -> AiGateway {
        AiGateway {
            entries: self.entries,
            attempt_timeout: self.attempt_timeout,
            total_timeout: self.total_timeout,
            fallback: FallbackSynthesizer::new(),
        }
    }
}

/// Tries providers strictly in declared order, one attempt each, then falls back.
///
/// The order is fixed at construction and never adapts to success or failure history.
/// Every call returns a usable [`AiResponse`]; provider failures are logged and listed in
/// [`AiResponse::failed_attempts`].
#[derive(Debug, Clone)]
pub struct AiGateway {
    entries: Vec<ProviderEntry>,
    attempt_timeout: Duration,
    total_timeout: Duration,
    fallback: FallbackSynthesizer,
}

impl AiGateway {
    pub fn builder() -> AiGatewayBuilder {
        AiGatewayBuilder::default()
    }

    /// No providers: always answers from the fallback synthesizer.
    pub fn fallback_only() -> Self {
        Self::builder().build()
    }

    /// Entries without the credentials they need are dropped here.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut builder = Self::builder()
            .attempt_timeout(config.attempt_timeout)
            .total_timeout(config.total_timeout);
        for provider in &config.providers {
            match provider.build_client() {
                Some(client) => {
                    let mut entry = ProviderEntry::new(provider.name.clone(), client);
                    entry.enabled = provider.enabled;
                    builder = builder.provider(entry);
                }
                None => tracing::debug!(provider = %provider.name, "skipping unconfigured AI provider"),
            }
        }
        builder.build()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub async fn complete(&self, request: &AiRequest) -> AiResponse {
        let started = Instant::now();
        let mut failures = Vec::new();

        for entry in self.entries.iter().filter(|e| e.enabled) {
            let remaining = self.total_timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                tracing::warn!(
                    provider = %entry.name,
                    total_timeout_ms = self.total_timeout.as_millis() as u64,
                    "total AI budget exhausted; skipping remaining providers"
                );
                break;
            }
            let budget = self.attempt_timeout.min(remaining);
            let provider_request = ProviderRequest::resolve(request, entry.client.default_model());

            let outcome = match tokio::time::timeout(budget, entry.client.complete(&provider_request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    provider: entry.name.clone(),
                    elapsed_ms: budget.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(completion) => {
                    tracing::debug!(provider = %entry.name, model = ?completion.model, "AI provider answered");
                    let mut response = AiResponse::new(completion.content, ResponseSource::provider(entry.name.clone()))
                        .with_failed_attempts(failures);
                    response.usage = completion.usage;
                    response.model = completion.model.or(Some(provider_request.model));
                    response.finish_reason = completion.finish_reason;
                    return response;
                }
                Err(error) => {
                    tracing::warn!(provider = %entry.name, error = %error, "AI provider attempt failed");
                    failures.push(AttemptFailure {
                        provider: entry.name.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            failed_attempts = failures.len(),
            shape = request.expected_shape().as_str(),
            "no AI provider answered; using fallback"
        );
        self.fallback.synthesize(request).with_failed_attempts(failures)
    }

    pub async fn generate_text(&self, prompt: impl Into<String>, options: AiOptions) -> AiResponse {
        self.complete(&AiRequest::prompt(prompt, options)).await
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>, options: AiOptions) -> AiResponse {
        self.complete(&AiRequest::chat(messages, options)).await
    }

    /// `max_length` is in characters; the token budget is twice that.
    pub async fn summarize(&self, text: &str, max_length: u32) -> String {
        let prompt = format!(
            "Summarize the following text in no more than {max_length} characters:\n\n{text}\n\nSummary:"
        );
        let options = AiOptions::default()
            .with_max_tokens(max_length.saturating_mul(2).max(1))
            .with_temperature(0.3);
        self.generate_text(prompt, options).await.content
    }

    /// `target_language` accepts a language tag (`en`, `ja`, `zh-TW`, ...) or a language name.
    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        let language = language_name(target_language);
        let prompt = format!("Translate the following text into {language}:\n\n{text}\n\nTranslation:");
        let budget = u32::try_from(text.chars().count().saturating_mul(2)).unwrap_or(u32::MAX);
        let options = AiOptions::default().with_max_tokens(budget.max(16)).with_temperature(0.3);
        self.generate_text(prompt, options).await.content
    }

    pub async fn analyze_sentiment(&self, text: &str) -> Structured<SentimentAnalysis> {
        let prompt = format!(
            "Analyze the sentiment of the following text and give a confidence (0-1) and a short explanation.\n\n\
             Text: {text}\n\n\
             Respond as JSON:\n{{\"sentiment\": \"positive|neutral|negative\", \"confidence\": 0.0-1.0, \"explanation\": \"...\"}}"
        );
        let options = AiOptions::default()
            .with_max_tokens(200)
            .with_temperature(0.1)
            .with_shape(ExpectedShape::Sentiment);
        let response = self.generate_text(prompt, options).await;
        conform(&SentimentShape, response)
    }

    /// The result is always one of `candidates`; an empty list is a caller error.
    pub async fn identify_intent(&self, text: &str, candidates: &[String]) -> Result<Structured<IntentMatch>, AiError> {
        if candidates.is_empty() {
            return Err(AiError::NoCandidateIntents);
        }
        let prompt = format!(
            "Identify the intent of the following text, choosing the best match from the options.\n\n\
             Text: {text}\n\n\
             Options: {}\n\n\
             Respond as JSON:\n{{\"intent\": \"<one option>\", \"confidence\": 0.0-1.0}}",
            candidates.join(", ")
        );
        let options = AiOptions::default()
            .with_max_tokens(100)
            .with_temperature(0.1)
            .with_shape(ExpectedShape::Intent {
                candidates: candidates.to_vec(),
            });
        let response = self.generate_text(prompt, options).await;
        Ok(conform(&IntentShape::new(candidates), response))
    }

    /// Free-form prompt whose reply must be a JSON object; defaults to `{}`.
    pub async fn generate_json(&self, prompt: impl Into<String>, options: AiOptions) -> Structured<JsonValue> {
        let response = self.generate_text(prompt, options.with_shape(ExpectedShape::Json)).await;
        conform(&JsonShape, response)
    }

    pub async fn analyze_structured_data(&self, records: &[JsonValue], analysis_kind: &str) -> String {
        let data = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            "Analyze the following data and provide a {analysis_kind} analysis.\n\n\
             Data: {data}\n\n\
             Give detailed findings and recommendations."
        );
        let options = AiOptions::default().with_max_tokens(1500).with_temperature(0.3);
        self.generate_text(prompt, options).await.content
    }
}

fn language_name(tag: &str) -> &str {
    match tag {
        "zh-TW" => "Traditional Chinese",
        "zh-CN" => "Simplified Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        other => other,
    }
}
