use async_trait::async_trait;
use modhub_ai::AiOptions;
use modhub_platform::AlertSeverity;
use serde_json::{Value as JsonValue, json};

use super::{AUTHOR, ModuleKind, array_field, number_setting};
use crate::capability::ModuleCapabilities;
use crate::error::ModuleResult;
use crate::metadata::{ModuleMetadata, PricingTier};
use crate::module::Module;
use crate::scope::ModuleScope;

const DEFAULT_RISK_THRESHOLD: f64 = 70.0;

/// Scores transactions for fraud risk and alerts on the risky ones.
///
/// Input: `{"transactions": [{"id", "amount", "currency", "merchant", "country", ...}]}`.
/// Setting `riskThreshold` (default 70) decides which scores raise an alert.
pub struct FraudDetection {
    metadata: ModuleMetadata,
}

impl FraudDetection {
    pub fn new() -> Self {
        let metadata = ModuleMetadata::new(ModuleKind::FraudDetection.id(), "AI Fraud Detection Engine", "finance")
            .industries(["finance"])
            .description("Real-time transaction anomaly detection that flags likely fraud")
            .icon("Shield")
            .author(AUTHOR)
            .tier(PricingTier::Enterprise)
            .features([
                "Real-time transaction monitoring",
                "Anomaly detection",
                "Risk scoring",
                "Automatic blocking",
                "Investigation reports",
            ]);
        Self { metadata }
    }
}

impl Default for FraudDetection {
    fn default() -> Self {
        Self::new()
    }
}

fn severity_for(score: f64) -> AlertSeverity {
    if score >= 90.0 {
        AlertSeverity::Critical
    } else if score >= 80.0 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

#[async_trait]
impl Module for FraudDetection {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities {
            requires_data_connection: true,
            ..ModuleCapabilities::all()
        }
    }

    async fn validate_data(&self, data: &JsonValue) -> bool {
        array_field(data, "transactions").is_ok()
    }

    async fn execute(&self, scope: &ModuleScope<'_>, input: JsonValue) -> ModuleResult<JsonValue> {
        let transactions = array_field(&input, "transactions")?;
        let threshold = number_setting(scope.context(), "riskThreshold", DEFAULT_RISK_THRESHOLD);

        let mut results = Vec::with_capacity(transactions.len());
        let mut flagged = 0usize;
        for tx in transactions {
            let tx_id = tx.get("id").and_then(JsonValue::as_str).unwrap_or("unknown");
            let prompt = format!(
                "Assess the fraud risk of this transaction. Respond in JSON with riskScore (0-100), \
                 fraudIndicators (array), recommendation (approve|investigate|block) and reasoning.\n\n\
                 Transaction: {tx}"
            );
            let analysis = scope
                .ai()
                .generate_json(prompt, AiOptions::default().with_max_tokens(500).with_temperature(0.2))
                .await;

            let score = analysis
                .value
                .get("riskScore")
                .and_then(JsonValue::as_f64)
                .unwrap_or(0.0)
                .clamp(0.0, 100.0);
            let recommendation = analysis
                .value
                .get("recommendation")
                .and_then(JsonValue::as_str)
                .unwrap_or("investigate")
                .to_string();

            if score >= threshold {
                flagged += 1;
                scope
                    .send_alert(
                        severity_for(score),
                        "Fraud detection alert",
                        &format!("Transaction {tx_id} risk score: {score:.0}"),
                    )
                    .await?;
            }

            results.push(json!({
                "transactionId": tx_id,
                "riskScore": score,
                "recommendation": recommendation,
                "indicators": analysis.value.get("fraudIndicators").cloned().unwrap_or(JsonValue::Array(vec![])),
                "source": analysis.source.as_str(),
            }));
        }

        scope.log_metric("transactions_analyzed", transactions.len());
        scope.log_metric("high_risk_transactions", flagged);

        let summary = json!({
            "analyzed": transactions.len(),
            "highRisk": flagged,
            "riskThreshold": threshold,
            "results": results,
        });
        let report = scope
            .generate_report("Fraud detection report", summary.clone(), "fraud")
            .await?;

        Ok(json!({ "summary": summary, "reportId": report.id }))
    }
}
