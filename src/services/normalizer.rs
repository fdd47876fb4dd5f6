//! Turns a raw provider response into an `AnalysisResult`.
//!
//! Two stages: unwrap whichever response envelope is present to get the model's
//! message text, then look for a JSON object inside that text (fenced ```json
//! block first, then the first balanced `{...}` span). If nothing parses, the
//! whole message becomes the analysis text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::models::AnalysisResult;

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)\s*\n?(.*?)```").expect("static regex")
});

const NO_CONTENT: &str = "The AI service returned no content.";

pub trait ResponseNormalizer: Send + Sync {
    /// Never fails; unparseable input degrades to plain text.
    fn normalize(&self, raw: &str) -> AnalysisResult;
}

/// Structured-first normalizer with a raw-text fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredNormalizer;

impl ResponseNormalizer for StructuredNormalizer {
    fn normalize(&self, raw: &str) -> AnalysisResult {
        let content = match unwrap_envelope(raw) {
            Envelope::Content(content) => content,
            Envelope::Failed(message) => return AnalysisResult::failed(message),
            Envelope::None => raw.to_string(),
        };

        match parse_structured(&content) {
            Some(result) => result,
            None => AnalysisResult::text(content),
        }
    }
}

enum Envelope {
    Content(String),
    Failed(String),
    None,
}

/// Recognises the response wrappers we know about by their discriminating field.
fn unwrap_envelope(raw: &str) -> Envelope {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(v @ Value::Object(_)) => v,
        _ => return Envelope::None,
    };

    // Bridge result wrapper: { success, result: { message: { content } } }
    if let Some(success) = value.get("success").and_then(Value::as_bool) {
        if !success {
            let message = value
                .pointer("/error/message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("AI bridge reported an unsuccessful response");
            return Envelope::Failed(message.to_string());
        }
        return match value.pointer("/result/message/content").and_then(Value::as_str) {
            Some(content) => Envelope::Content(content.to_string()),
            None => {
                warn!("Bridge response has no message content");
                Envelope::Content(String::new())
            }
        };
    }

    // Chat completion: { choices: [ { message: { content } } ] }
    if let Some(choices) = value.get("choices") {
        return message_content(choices.pointer("/0/message"));
    }

    // Gemini: { candidates: [ { content: { parts: [ { text } ] } } ] }
    if let Some(candidates) = value.get("candidates") {
        if let Some(parts) = candidates.pointer("/0/content/parts").and_then(Value::as_array) {
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            return Envelope::Content(text);
        }
        let reason = candidates
            .pointer("/0/finishReason")
            .and_then(Value::as_str)
            .or_else(|| value.pointer("/promptFeedback/blockReason").and_then(Value::as_str));
        warn!("Gemini response has no content parts (reason: {:?})", reason);
        return Envelope::Failed(match reason {
            Some(reason) => format!("{} (finish reason: {})", NO_CONTENT, reason),
            None => NO_CONTENT.to_string(),
        });
    }

    // Direct message object: { message: { content } }
    if let Some(message) = value.get("message").filter(|m| m.get("content").is_some()) {
        return message_content(Some(message));
    }

    Envelope::None
}

/// Content of a chat message; a null content carries the refusal text if any.
fn message_content(message: Option<&Value>) -> Envelope {
    if let Some(content) = message.and_then(|m| m.get("content")).and_then(Value::as_str) {
        return Envelope::Content(content.to_string());
    }
    warn!("AI response message has no content");
    let refusal = message
        .and_then(|m| m.get("refusal"))
        .and_then(Value::as_str)
        .filter(|r| !r.trim().is_empty());
    Envelope::Failed(refusal.unwrap_or(NO_CONTENT).to_string())
}

fn parse_structured(content: &str) -> Option<AnalysisResult> {
    let candidate = extract_json_candidate(content)?;
    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse structured AI response: {}", e);
            return None;
        }
    };

    let obj = value.as_object()?;
    let analysis = match obj.get("analysis").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => content.to_string(),
    };

    Some(AnalysisResult {
        analysis,
        insights: string_list(obj.get("insights")),
        recommendations: string_list(obj.get("recommendations")),
        error: String::new(),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn extract_json_candidate(content: &str) -> Option<&str> {
    if let Some(captures) = RE_JSON_FENCE.captures(content) {
        if let Some(body) = captures.get(1) {
            return Some(body.as_str().trim());
        }
    }
    first_object_span(content)
}

/// First top-level `{...}` span, respecting string literals and escapes.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(raw: &str) -> AnalysisResult {
        StructuredNormalizer.normalize(raw)
    }

    #[test]
    fn test_fenced_json_block() {
        let raw = "```json\n{\"analysis\":\"A\",\"insights\":[\"i1\"],\"recommendations\":[]}\n```";
        let result = normalize(raw);
        assert_eq!(result.analysis, "A");
        assert_eq!(result.insights, vec!["i1"]);
        assert!(result.recommendations.is_empty());
        assert!(result.error.is_empty());
    }

    #[test]
    fn test_plain_text_falls_back_to_analysis() {
        let result = normalize("plain text, not json");
        assert_eq!(result, AnalysisResult::text("plain text, not json"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "```json\n{\"analysis\":\"A\",\"insights\":[\"i1\"]}\n```",
            "plain text, not json",
            "{\"message\":{\"content\":\"{\\\"analysis\\\":\\\"B\\\"}\"}}",
        ] {
            assert_eq!(normalize(raw), normalize(raw));
        }
    }

    #[test]
    fn test_first_object_span_inside_prose() {
        let raw = "Here you go: {\"analysis\":\"## Summary\\nAll good {really}\",\"recommendations\":[\"Hold\"]} Thanks!";
        let result = normalize(raw);
        assert_eq!(result.analysis, "## Summary\nAll good {really}");
        assert_eq!(result.recommendations, vec!["Hold"]);
        assert!(result.insights.is_empty());
    }

    #[test]
    fn test_broken_json_falls_back_to_raw_text() {
        let raw = "```json\n{\"analysis\": \"cut off\n```";
        let result = normalize(raw);
        assert_eq!(result.analysis, raw);
        assert!(result.insights.is_empty());
    }

    #[test]
    fn test_missing_analysis_field_keeps_content() {
        let raw = "{\"insights\":[\"only insights\"]}";
        let result = normalize(raw);
        assert_eq!(result.analysis, raw);
        assert_eq!(result.insights, vec!["only insights"]);
    }

    #[test]
    fn test_direct_message_envelope() {
        let inner = json!({"analysis": "V1", "insights": ["x"], "recommendations": ["y"]}).to_string();
        let raw = json!({
            "index": 0,
            "message": {"role": "assistant", "content": inner, "refusal": null},
            "finish_reason": "stop"
        })
        .to_string();

        let result = normalize(&raw);
        assert_eq!(result.analysis, "V1");
        assert_eq!(result.insights, vec!["x"]);
        assert_eq!(result.recommendations, vec!["y"]);
    }

    #[test]
    fn test_result_wrapper_envelope() {
        let raw = json!({
            "success": true,
            "service": {"name": "ai-chat"},
            "result": {"message": {"role": "assistant", "content": "Markdown only, no JSON"}},
            "metadata": {"service_used": "gpt"}
        })
        .to_string();

        let result = normalize(&raw);
        assert_eq!(result.analysis, "Markdown only, no JSON");
        assert!(result.insights.is_empty());
    }

    #[test]
    fn test_unsuccessful_wrapper_is_an_error() {
        let raw = json!({"success": false, "error": {"message": "quota exhausted"}}).to_string();
        let result = normalize(&raw);
        assert!(result.is_error());
        assert_eq!(result.error, "quota exhausted");
    }

    #[test]
    fn test_chat_completion_envelope() {
        let content = "```json\n{\"analysis\":\"C\",\"insights\":[],\"recommendations\":[\"r\"]}\n```";
        let raw = json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string();

        let result = normalize(&raw);
        assert_eq!(result.analysis, "C");
        assert_eq!(result.recommendations, vec!["r"]);
    }

    #[test]
    fn test_gemini_envelope_joins_parts() {
        let raw = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"analysis\":"}, {"text": "\"G\"}"}]}}]
        })
        .to_string();

        let result = normalize(&raw);
        assert_eq!(result.analysis, "G");
    }

    #[test]
    fn test_refused_chat_completion_is_an_error() {
        let raw = json!({
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "I can't help with that."}}]
        })
        .to_string();

        let result = normalize(&raw);
        assert!(result.is_error());
        assert_eq!(result.error, "I can't help with that.");
        assert!(result.analysis.is_empty());
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let result = normalize(&json!({"id": "chatcmpl-1", "choices": []}).to_string());
        assert_eq!(result.error, NO_CONTENT);
    }

    #[test]
    fn test_blocked_gemini_candidate_is_an_error() {
        let raw = json!({"candidates": [{"finishReason": "SAFETY", "index": 0}]}).to_string();

        let result = normalize(&raw);
        assert!(result.is_error());
        assert_eq!(result.error, "The AI service returned no content. (finish reason: SAFETY)");
        assert!(!result.analysis.contains("candidates"));
    }

    #[test]
    fn test_direct_message_without_content_is_an_error() {
        let raw = json!({"message": {"role": "assistant", "content": null}}).to_string();
        assert_eq!(normalize(&raw).error, NO_CONTENT);
    }

    #[test]
    fn test_non_string_list_items_are_skipped() {
        let result = normalize("{\"analysis\":\"A\",\"insights\":[\"ok\", 3, null]}");
        assert_eq!(result.insights, vec!["ok"]);
    }
}
