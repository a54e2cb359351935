use async_trait::async_trait;
use modhub_ai::AiOptions;
use modhub_platform::AlertSeverity;
use serde_json::{Value as JsonValue, json};

use super::{AUTHOR, ModuleKind, array_field, number_setting};
use crate::capability::ModuleCapabilities;
use crate::error::{ModuleError, ModuleResult};
use crate::metadata::{ModuleMetadata, PricingTier};
use crate::module::Module;
use crate::scope::ModuleScope;

const DEFAULT_ALERT_THRESHOLD: f64 = 60.0;

/// Class-level learning analysis with early warnings for struggling students.
///
/// Input: `{"students": [{"name": "...", "scores": {"math": 72, ...}}]}`.
pub struct StudentPerformance {
    metadata: ModuleMetadata,
}

impl StudentPerformance {
    pub fn new() -> Self {
        let metadata = ModuleMetadata::new(
            ModuleKind::StudentPerformance.id(),
            "AI Student Performance Analysis",
            "education",
        )
        .industries(["education"])
        .description("Learning outcome assessment with personalised recommendations")
        .icon("TrendingUp")
        .author(AUTHOR)
        .tier(PricingTier::Pro)
        .features([
            "Learning outcome analysis",
            "Personalised recommendations",
            "Early warning system",
            "Progress tracking",
            "Parent reports",
        ]);
        Self { metadata }
    }
}

impl Default for StudentPerformance {
    fn default() -> Self {
        Self::new()
    }
}

fn average_score(student: &JsonValue) -> Option<f64> {
    let scores = student.get("scores")?.as_object()?;
    let values: Vec<f64> = scores.values().filter_map(JsonValue::as_f64).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[async_trait]
impl Module for StudentPerformance {
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
        let students = array_field(&input, "students")?;
        if students.is_empty() {
            return Err(ModuleError::invalid_input("no students to analyse"));
        }
        let threshold = number_setting(scope.context(), "alertThreshold", DEFAULT_ALERT_THRESHOLD);

        let mut rows = Vec::with_capacity(students.len());
        let mut at_risk = Vec::new();
        for student in students {
            let name = student.get("name").and_then(JsonValue::as_str).unwrap_or("unnamed");
            let Some(average) = average_score(student) else {
                tracing::debug!(student = name, "student has no numeric scores; skipped");
                continue;
            };
            if average < threshold {
                let severity = if average < threshold - 20.0 {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                };
                scope
                    .send_alert(
                        severity,
                        "Student needs attention",
                        &format!("{name} is averaging {average:.1}, below {threshold:.0}"),
                    )
                    .await?;
                at_risk.push(name.to_string());
            }
            rows.push(json!({ "name": name, "average": average }));
        }

        let class_average = if rows.is_empty() {
            0.0
        } else {
            rows.iter().filter_map(|r| r["average"].as_f64()).sum::<f64>() / rows.len() as f64
        };

        let prompt = format!(
            "Analyze this class's student performance data. Respond in JSON with overallAssessment \
             and nextSteps (array).\n\nData: {}",
            JsonValue::Array(rows.clone())
        );
        let assessment = scope
            .ai()
            .generate_json(prompt, AiOptions::default().with_max_tokens(800).with_temperature(0.3))
            .await;

        scope.log_metric("students_analyzed", rows.len());
        scope.log_metric("at_risk_students", at_risk.len());
        scope.log_metric("class_average", class_average);

        let content = json!({
            "classAverage": class_average,
            "students": rows,
            "atRisk": at_risk,
            "assessment": assessment.value,
        });
        let report = scope
            .generate_report("Student performance report", content.clone(), "student_performance")
            .await?;

        Ok(json!({ "summary": content, "reportId": report.id }))
    }
}
