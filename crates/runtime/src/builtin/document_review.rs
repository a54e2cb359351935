use async_trait::async_trait;
use modhub_ai::AiOptions;
use modhub_platform::AlertSeverity;
use serde_json::{Value as JsonValue, json};

use super::{AUTHOR, ModuleKind, str_field};
use crate::capability::ModuleCapabilities;
use crate::error::ModuleResult;
use crate::metadata::{ModuleMetadata, PricingTier};
use crate::module::Module;
use crate::scope::ModuleScope;

/// Contract and application review: risk level, compliance issues and a summary.
///
/// Input: `{"title": "...", "content": "..."}`.
pub struct DocumentReview {
    metadata: ModuleMetadata,
}

impl DocumentReview {
    pub fn new() -> Self {
        let metadata = ModuleMetadata::new(ModuleKind::DocumentReview.id(), "AI Document Review", "finance")
            .industries(["finance"])
            .description("Reviews contracts and applications for risky clauses and compliance gaps")
            .icon("FileText")
            .author(AUTHOR)
            .tier(PricingTier::Enterprise)
            .features([
                "Document parsing",
                "Risky clause detection",
                "Compliance checks",
                "Automatic summaries",
                "Review recommendations",
            ]);
        Self { metadata }
    }
}

impl Default for DocumentReview {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for DocumentReview {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities {
            requires_data_connection: true,
            ..ModuleCapabilities::all()
        }
    }

    async fn execute(&self, scope: &ModuleScope<'_>, input: JsonValue) -> ModuleResult<JsonValue> {
        let title = str_field(&input, "title")?;
        let content = str_field(&input, "content")?;

        let prompt = format!(
            "Review the following document for risk and compliance issues. Respond in JSON with \
             overallScore, riskLevel (low|medium|high), complianceScore, issues (array), \
             recommendations (array) and summary.\n\nDocument: {title}\n\n{content}"
        );
        let review = scope
            .ai()
            .generate_json(prompt, AiOptions::default().with_max_tokens(1500).with_temperature(0.2))
            .await;
        let summary = scope.ai().summarize(content, 200).await;

        let risk_level = review
            .value
            .get("riskLevel")
            .and_then(JsonValue::as_str)
            .unwrap_or("medium")
            .to_ascii_lowercase();
        if risk_level == "high" {
            scope
                .send_alert(
                    AlertSeverity::High,
                    "High-risk document",
                    &format!("'{title}' was assessed as high risk"),
                )
                .await?;
        }

        let issue_count = review
            .value
            .get("issues")
            .and_then(JsonValue::as_array)
            .map_or(0, Vec::len);
        scope.log_metric("issues_found", issue_count);

        let report_content = json!({
            "title": title,
            "riskLevel": risk_level,
            "review": review.value,
            "summary": summary,
            "source": review.source.as_str(),
        });
        let report = scope
            .generate_report(&format!("Document review: {title}"), report_content.clone(), "document_review")
            .await?;

        Ok(json!({ "review": report_content, "reportId": report.id }))
    }
}
