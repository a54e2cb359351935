//! Built-in module kinds.
//!
//! A closed set: each kind is one [`Module`] implementation, selected through the
//! registry by its id.

use std::sync::Arc;

use modhub_core::ModuleId;
use serde_json::Value as JsonValue;

use crate::context::ModuleContext;
use crate::error::{ModuleError, ModuleResult};
use crate::module::Module;
use crate::registry::ModuleRegistry;

mod customer_service;
mod document_review;
mod fraud_detection;
mod student_performance;

pub use customer_service::CustomerService;
pub use document_review::DocumentReview;
pub use fraud_detection::FraudDetection;
pub use student_performance::StudentPerformance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    FraudDetection,
    StudentPerformance,
    CustomerService,
    DocumentReview,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 4] = [
        ModuleKind::FraudDetection,
        ModuleKind::StudentPerformance,
        ModuleKind::CustomerService,
        ModuleKind::DocumentReview,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ModuleKind::FraudDetection => "fraud-detection",
            ModuleKind::StudentPerformance => "student-performance",
            ModuleKind::CustomerService => "customer-service-bot",
            ModuleKind::DocumentReview => "document-review",
        }
    }

    pub fn id(&self) -> ModuleId {
        ModuleId::from_static(self.slug())
    }

    pub fn build(&self) -> Arc<dyn Module> {
        match self {
            ModuleKind::FraudDetection => Arc::new(FraudDetection::new()),
            ModuleKind::StudentPerformance => Arc::new(StudentPerformance::new()),
            ModuleKind::CustomerService => Arc::new(CustomerService::new()),
            ModuleKind::DocumentReview => Arc::new(DocumentReview::new()),
        }
    }
}

/// Register every built-in kind (replacing earlier registrations with the same ids).
pub fn register_builtin(registry: &ModuleRegistry) {
    for kind in ModuleKind::ALL {
        let metadata = kind.build().metadata().clone();
        if let Err(error) = registry.register(metadata, move || kind.build()) {
            tracing::error!(%error, "built-in module not registered");
        }
    }
    tracing::info!(count = ModuleKind::ALL.len(), "built-in modules registered");
}

const AUTHOR: &str = "AI Business Platform";

fn array_field<'a>(input: &'a JsonValue, key: &str) -> ModuleResult<&'a Vec<JsonValue>> {
    input
        .get(key)
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ModuleError::invalid_input(format!("expected an array field '{key}'")))
}

fn str_field<'a>(input: &'a JsonValue, key: &str) -> ModuleResult<&'a str> {
    input
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ModuleError::invalid_input(format!("expected a non-empty string field '{key}'")))
}

fn number_setting(ctx: &ModuleContext, key: &str, default: f64) -> f64 {
    ctx.config
        .setting(key)
        .and_then(JsonValue::as_f64)
        .unwrap_or(default)
}
