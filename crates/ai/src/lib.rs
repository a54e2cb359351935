//! `modhub-ai`
//!
//! **Responsibility:** turn a module's natural-language request into a usable result.
//!
//! - [`AiGateway`] tries the configured providers strictly in order, one attempt each,
//!   each attempt bounded by a timeout.
//! - When nothing answers, [`FallbackSynthesizer`] produces a deterministic reply whose
//!   shape matches what a provider would have returned.
//! - Structured operations (sentiment, intent, JSON) parse the reply and substitute a
//!   documented default on mismatch. Callers always get a value, never a provider error.

pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod provider;
pub mod request;
pub mod response;
pub mod shape;

pub use config::{GatewayConfig, ProviderConfig};
pub use error::{AiError, ProviderError, ShapeMismatch};
pub use fallback::{FallbackSynthesizer, Topic};
pub use gateway::{AiGateway, AiGatewayBuilder, ProviderEntry};
pub use provider::{
    AnthropicClient, Completion, LocalClient, OpenAiClient, ProviderClient, ProviderKind,
    ProviderRequest,
};
pub use request::{AiOptions, AiRequest, ChatMessage, ChatRole, ExpectedShape};
pub use response::{AiResponse, AttemptFailure, ResponseSource, Usage};
pub use shape::{IntentMatch, Sentiment, SentimentAnalysis, Structured};
