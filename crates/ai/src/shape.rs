//! Structured reply parsing.
//!
//! Each structured operation owns a [`ShapeParser`]: how to read the reply, and the
//! conservative value to use when the reply cannot be read. A mismatch never fails the
//! call; it is reported on the [`Structured`] result next to the raw text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ShapeMismatch;
use crate::response::{AiResponse, ResponseSource};

/// Confidence used whenever a reply omits or garbles it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// A parsed (or defaulted) structured result with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structured<T> {
    pub value: T,
    /// The reply text exactly as received, for diagnostics.
    pub raw: String,
    pub source: ResponseSource,
    /// Set when `value` is the operation default rather than the parsed reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<ShapeMismatch>,
}

impl<T> Structured<T> {
    pub fn is_default(&self) -> bool {
        self.mismatch.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    /// Always one of the candidate intents, in the caller's spelling.
    pub intent: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

/// Parser + default for one expected shape.
pub trait ShapeParser {
    type Output;

    fn shape(&self) -> &'static str;

    fn parse(&self, raw: &str) -> Result<Self::Output, ShapeMismatch>;

    fn default_value(&self) -> Self::Output;
}

/// Apply `parser` to a gateway response, substituting the default on mismatch.
pub fn conform<P: ShapeParser>(parser: &P, response: AiResponse) -> Structured<P::Output> {
    match parser.parse(&response.content) {
        Ok(value) => Structured {
            value,
            raw: response.content,
            source: response.source,
            mismatch: None,
        },
        Err(mismatch) => {
            tracing::warn!(
                shape = parser.shape(),
                source = %response.source,
                error = %mismatch,
                "structured reply did not parse; using default"
            );
            Structured {
                value: parser.default_value(),
                raw: response.content,
                source: response.source,
                mismatch: Some(mismatch),
            }
        }
    }
}

/// `{sentiment, confidence, explanation}`; defaults to neutral at 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentShape;

impl ShapeParser for SentimentShape {
    type Output = SentimentAnalysis;

    fn shape(&self) -> &'static str {
        "sentiment"
    }

    fn parse(&self, raw: &str) -> Result<SentimentAnalysis, ShapeMismatch> {
        let object = extract_object(raw).ok_or_else(|| ShapeMismatch::new("sentiment", "no JSON object in reply"))?;

        let label = object
            .get("sentiment")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ShapeMismatch::new("sentiment", "missing `sentiment` field"))?;
        let sentiment = Sentiment::parse_label(label)
            .ok_or_else(|| ShapeMismatch::new("sentiment", format!("unknown sentiment label '{label}'")))?;

        Ok(SentimentAnalysis {
            sentiment,
            confidence: normalize_confidence(object.get("confidence")),
            explanation: object
                .get("explanation")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn default_value(&self) -> SentimentAnalysis {
        SentimentAnalysis {
            sentiment: Sentiment::Neutral,
            confidence: DEFAULT_CONFIDENCE,
            explanation: "sentiment could not be determined".to_string(),
        }
    }
}

/// `{intent, confidence}` restricted to the candidate list; defaults to the first
/// candidate at 0.5. Callers guarantee `candidates` is non-empty.
#[derive(Debug, Clone, Copy)]
pub struct IntentShape<'a> {
    candidates: &'a [String],
}

impl<'a> IntentShape<'a> {
    pub fn new(candidates: &'a [String]) -> Self {
        Self { candidates }
    }
}

impl ShapeParser for IntentShape<'_> {
    type Output = IntentMatch;

    fn shape(&self) -> &'static str {
        "intent"
    }

    fn parse(&self, raw: &str) -> Result<IntentMatch, ShapeMismatch> {
        let object = extract_object(raw).ok_or_else(|| ShapeMismatch::new("intent", "no JSON object in reply"))?;

        let label = object
            .get("intent")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ShapeMismatch::new("intent", "missing `intent` field"))?;
        let intent = self
            .candidates
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| ShapeMismatch::new("intent", format!("'{label}' is not a candidate intent")))?;

        Ok(IntentMatch {
            intent: intent.clone(),
            confidence: normalize_confidence(object.get("confidence")),
        })
    }

    fn default_value(&self) -> IntentMatch {
        IntentMatch {
            intent: self.candidates.first().cloned().unwrap_or_default(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Any JSON object; defaults to `{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonShape;

impl ShapeParser for JsonShape {
    type Output = JsonValue;

    fn shape(&self) -> &'static str {
        "json"
    }

    fn parse(&self, raw: &str) -> Result<JsonValue, ShapeMismatch> {
        extract_object(raw)
            .map(JsonValue::Object)
            .ok_or_else(|| ShapeMismatch::new("json", "no JSON object in reply"))
    }

    fn default_value(&self) -> JsonValue {
        JsonValue::Object(Map::new())
    }
}

/// Missing, non-numeric or non-finite → 0.5; otherwise clamped into `[0, 1]`.
fn normalize_confidence(value: Option<&JsonValue>) -> f64 {
    match value.and_then(JsonValue::as_f64) {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Find a JSON object in model output.
///
/// Strategy order:
/// 1) The whole trimmed reply.
/// 2) A fenced code block (```json ... ``` or plain ```).
/// 3) The first `{` from which a complete JSON value parses.
pub fn extract_object(content: &str) -> Option<Map<String, JsonValue>> {
    let trimmed = content.trim();
    if let Ok(JsonValue::Object(map)) = serde_json::from_str(trimmed) {
        return Some(map);
    }

    if let Some(block) = fenced_block(trimmed)
        && let Ok(JsonValue::Object(map)) = serde_json::from_str(block.trim())
    {
        return Some(map);
    }

    for (idx, ch) in trimmed.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut values = serde_json::Deserializer::from_str(&trimmed[idx..]).into_iter::<JsonValue>();
        if let Some(Ok(JsonValue::Object(map))) = values.next() {
            return Some(map);
        }
    }
    None
}

fn fenced_block(content: &str) -> Option<&str> {
    let start = content.find("```")?;
    let after_fence = &content[start + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn response(content: &str) -> AiResponse {
        AiResponse::new(content, ResponseSource::provider("test"))
    }

    #[test]
    fn sentiment_parses_plain_json() {
        let parsed = SentimentShape
            .parse(r#"{"sentiment": "Positive", "confidence": 0.9, "explanation": "upbeat"}"#)
            .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.explanation, "upbeat");
    }

    #[test]
    fn sentiment_parses_fenced_json_with_narrative() {
        let raw = "Here you go:\n```json\n{\"sentiment\": \"negative\", \"confidence\": 0.7}\n```\nThanks";
        let parsed = SentimentShape.parse(raw).unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn sentiment_out_of_range_confidence_is_clamped() {
        let parsed = SentimentShape
            .parse(r#"{"sentiment": "neutral", "confidence": 7}"#)
            .unwrap();
        assert_eq!(parsed.confidence, 1.0);

        let parsed = SentimentShape
            .parse(r#"{"sentiment": "neutral", "confidence": "high"}"#)
            .unwrap();
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn sentiment_unknown_label_defaults_to_neutral() {
        let out = conform(&SentimentShape, response(r#"{"sentiment": "ecstatic"}"#));
        assert!(out.is_default());
        assert_eq!(out.value.sentiment, Sentiment::Neutral);
        assert_eq!(out.value.confidence, 0.5);
        assert_eq!(out.raw, r#"{"sentiment": "ecstatic"}"#);
    }

    #[test]
    fn intent_must_be_a_candidate() {
        let candidates = vec!["refund".to_string(), "order_status".to_string()];
        let shape = IntentShape::new(&candidates);

        let ok = shape.parse(r#"{"intent": "ORDER_STATUS", "confidence": 0.8}"#).unwrap();
        assert_eq!(ok.intent, "order_status");

        let out = conform(&shape, response(r#"{"intent": "complaint", "confidence": 0.99}"#));
        assert!(out.is_default());
        assert_eq!(out.value, IntentMatch { intent: "refund".to_string(), confidence: 0.5 });
    }

    #[test]
    fn defaulted_result_serializes_with_its_mismatch() {
        let out = conform(&SentimentShape, response("not json at all"));
        let value = serde_json::to_value(&out).unwrap();

        assert_eq!(value["value"]["sentiment"], "neutral");
        assert_eq!(value["source"], "test");
        assert_eq!(value["mismatch"]["expected"], out.mismatch.as_ref().unwrap().expected);
        assert!(value["mismatch"]["reason"].is_string());
    }

    #[test]
    fn json_shape_finds_embedded_object_and_defaults_to_empty() {
        let found = JsonShape.parse("result: {\"score\": 3} trailing").unwrap();
        assert_eq!(found, json!({"score": 3}));

        let out = conform(&JsonShape, response("[1, 2, 3]"));
        assert!(out.is_default());
        assert_eq!(out.value, json!({}));
    }

    proptest! {
        #[test]
        fn sentiment_result_is_always_in_range(raw in ".*", confidence in proptest::num::f64::ANY) {
            for content in [raw.clone(), format!(r#"{{"sentiment": "positive", "confidence": {confidence}}}"#)] {
                let out = conform(&SentimentShape, response(&content));
                prop_assert!((0.0..=1.0).contains(&out.value.confidence));
            }
        }

        #[test]
        fn intent_result_is_always_a_candidate(raw in ".*", candidates in proptest::collection::vec("[a-z_]{1,8}", 1..5)) {
            let out = conform(&IntentShape::new(&candidates), response(&raw));
            prop_assert!(candidates.contains(&out.value.intent));
            prop_assert!((0.0..=1.0).contains(&out.value.confidence));
        }
    }
}
