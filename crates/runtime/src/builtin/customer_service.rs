use async_trait::async_trait;
use modhub_ai::{AiOptions, ChatMessage, Sentiment};
use modhub_platform::AlertSeverity;
use serde_json::{Value as JsonValue, json};

use super::{AUTHOR, ModuleKind, str_field};
use crate::capability::ModuleCapabilities;
use crate::error::ModuleResult;
use crate::metadata::{ModuleMetadata, PricingTier};
use crate::module::Module;
use crate::scope::ModuleScope;

const INTENTS: [&str; 6] = [
    "return_request",
    "order_inquiry",
    "usage_question",
    "complaint",
    "pricing",
    "general_inquiry",
];

const SYSTEM_PROMPT: &str = "You are a professional customer service agent for a small business. \
    Reply in a friendly, concise and helpful way, taking the customer's mood into account.";

/// Answers a customer message and escalates upset or complaining customers to a human.
///
/// Input: `{"message": "..."}`.
pub struct CustomerService {
    metadata: ModuleMetadata,
}

impl CustomerService {
    pub fn new() -> Self {
        let metadata = ModuleMetadata::new(ModuleKind::CustomerService.id(), "AI Customer Service Assistant", "sme")
            .industries(["sme", "retail"])
            .description("Always-on customer service that answers common questions automatically")
            .icon("MessageCircle")
            .author(AUTHOR)
            .tier(PricingTier::Basic)
            .features([
                "24/7 automated support",
                "Question answering",
                "Multilingual support",
                "Sentiment analysis",
                "Human handoff",
            ]);
        Self { metadata }
    }
}

impl Default for CustomerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for CustomerService {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::all()
    }

    async fn execute(&self, scope: &ModuleScope<'_>, input: JsonValue) -> ModuleResult<JsonValue> {
        let message = str_field(&input, "message")?;
        let candidates: Vec<String> = INTENTS.iter().map(|s| s.to_string()).collect();

        let sentiment = scope.ai().analyze_sentiment(message).await;
        let intent = scope.ai().identify_intent(message, &candidates).await?;

        let options = AiOptions::default()
            .with_system_prompt(SYSTEM_PROMPT)
            .with_max_tokens(500);
        let reply = scope.ai().chat(vec![ChatMessage::user(message)], options).await;

        let upset = sentiment.value.sentiment == Sentiment::Negative && sentiment.value.confidence >= 0.7;
        let escalated = upset || intent.value.intent == "complaint";
        if escalated {
            scope
                .send_alert(
                    AlertSeverity::High,
                    "Customer needs a human agent",
                    &format!("Escalated message: {message}"),
                )
                .await?;
        }

        scope.log_metric("last_intent", intent.value.intent.as_str());
        scope.log_metric("last_sentiment", sentiment.value.sentiment.as_str());

        Ok(json!({
            "reply": reply.content,
            "source": reply.source.as_str(),
            "sentiment": sentiment.value,
            "intent": intent.value,
            "escalated": escalated,
        }))
    }
}
