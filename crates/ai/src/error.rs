use serde::Serialize;
use thiserror::Error;

/// A single provider attempt failed (transport, timeout, HTTP status, unreadable body).
///
/// Always absorbed by the gateway: it is logged, recorded on the response as an
/// [`AttemptFailure`](crate::AttemptFailure), and the next provider is tried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider}: transport error: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider}: timed out after {elapsed_ms} ms")]
    Timeout { provider: String, elapsed_ms: u64 },

    #[error("{provider}: HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("{provider}: not configured: {message}")]
    NotConfigured { provider: String, message: String },
}

impl ProviderError {
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// A provider replied, but the text could not be read as the operation's structure.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("reply does not match the {expected} shape: {reason}")]
pub struct ShapeMismatch {
    pub expected: &'static str,
    pub reason: String,
}

impl ShapeMismatch {
    pub fn new(expected: &'static str, reason: impl Into<String>) -> Self {
        Self {
            expected,
            reason: reason.into(),
        }
    }
}

/// Caller mistakes. Provider and shape problems never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("intent identification needs at least one candidate intent")]
    NoCandidateIntents,
}
