use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The structure an operation expects the reply to have.
///
/// Drives both reply parsing in the gateway and payload selection in the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedShape {
    #[default]
    Text,
    Json,
    Sentiment,
    Intent { candidates: Vec<String> },
}

impl ExpectedShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedShape::Text => "text",
            ExpectedShape::Json => "json",
            ExpectedShape::Sentiment => "sentiment",
            ExpectedShape::Intent { .. } => "intent",
        }
    }
}

/// Generation options shared by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    /// Overrides the provider entry's default model.
    pub model: Option<String>,
    pub expected_shape: ExpectedShape,
}

impl Default for AiOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            system_prompt: None,
            model: None,
            expected_shape: ExpectedShape::Text,
        }
    }
}

impl AiOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_shape(mut self, shape: ExpectedShape) -> Self {
        self.expected_shape = shape;
        self
    }
}

/// Provider-agnostic request: an ordered message list plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    messages: Vec<ChatMessage>,
    options: AiOptions,
}

impl AiRequest {
    /// Single-prompt request; `options.system_prompt` becomes a leading system message.
    pub fn prompt(prompt: impl Into<String>, options: AiOptions) -> Self {
        Self::chat(vec![ChatMessage::user(prompt)], options)
    }

    /// Conversation request. A system prompt in the options is prepended unless the
    /// conversation already opens with a system message.
    pub fn chat(mut messages: Vec<ChatMessage>, options: AiOptions) -> Self {
        if let Some(system) = &options.system_prompt {
            let has_system = messages
                .first()
                .is_some_and(|m| m.role == ChatRole::System);
            if !has_system {
                messages.insert(0, ChatMessage::system(system.clone()));
            }
        }
        Self { messages, options }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn options(&self) -> &AiOptions {
        &self.options
    }

    pub fn expected_shape(&self) -> &ExpectedShape {
        &self.options.expected_shape
    }

    /// All user-authored text, newline separated. Used for topic classification.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_with_system_prompt_prepends_system_message() {
        let req = AiRequest::prompt("hello", AiOptions::default().with_system_prompt("be brief"));
        assert_eq!(req.messages().len(), 2);
        assert_eq!(req.messages()[0], ChatMessage::system("be brief"));
        assert_eq!(req.messages()[1], ChatMessage::user("hello"));
    }

    #[test]
    fn chat_keeps_existing_system_message() {
        let req = AiRequest::chat(
            vec![ChatMessage::system("original"), ChatMessage::user("hi")],
            AiOptions::default().with_system_prompt("ignored"),
        );
        assert_eq!(req.messages().len(), 2);
        assert_eq!(req.messages()[0].content, "original");
    }

    #[test]
    fn user_text_skips_system_and_assistant_turns() {
        let req = AiRequest::chat(
            vec![
                ChatMessage::system("sys"),
                ChatMessage::user("first"),
                ChatMessage::assistant("reply"),
                ChatMessage::user("second"),
            ],
            AiOptions::default(),
        );
        assert_eq!(req.user_text(), "first\nsecond");
    }
}
