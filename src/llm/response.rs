//! Completion text → [`AnalysisResult`].
//!
//! Models are asked for a JSON object but do not always return one cleanly.
//! Each field is taken from a top-level JSON string when the text parses as an
//! object (optionally wrapped in a Markdown code fence); otherwise a
//! permissive `"key": "value"` regex is run over the raw text. The regex stops
//! at the first unescaped-or-not quote and can accept malformed JSON; that
//! leniency is kept on purpose.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::models::AnalysisResult;

pub const NO_ROOT_CAUSE: &str = "Could not determine root cause";
pub const NO_FIX_SUGGESTED: &str = "No specific fix suggested";

static ROOT_CAUSE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"root_cause"\s*:\s*"(.*?)""#).expect("root_cause regex is valid")
});
static SUGGESTED_FIX_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"suggested_fix"\s*:\s*"(.*?)""#).expect("suggested_fix regex is valid")
});

pub fn parse_analysis(text: &str) -> AnalysisResult {
    let structured = serde_json::from_str::<Value>(strip_code_fence(text)).ok();
    let field = |key: &str, re: &Regex, fallback: &str| {
        structured
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                re.captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .unwrap_or_else(|| fallback.to_string())
    };

    AnalysisResult {
        root_cause: field("root_cause", &*ROOT_CAUSE_FIELD, NO_ROOT_CAUSE),
        suggested_fix: field("suggested_fix", &*SUGGESTED_FIX_FIELD, NO_FIX_SUGGESTED),
    }
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let r = parse_analysis(r#"{"root_cause": "Missing \"left-pad\"", "suggested_fix": "npm i"}"#);
        assert_eq!(r.root_cause, "Missing \"left-pad\"");
        assert_eq!(r.suggested_fix, "npm i");
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"root_cause\": \"disk full\", \"suggested_fix\": \"prune images\"}\n```";
        let r = parse_analysis(text);
        assert_eq!(r.root_cause, "disk full");
        assert_eq!(r.suggested_fix, "prune images");
    }

    #[test]
    fn test_nested_keys_use_regex() {
        let text = r#"{"analysis": {"root_cause": "flaky test", "suggested_fix": "retry"}}"#;
        let r = parse_analysis(text);
        assert_eq!(r.root_cause, "flaky test");
        assert_eq!(r.suggested_fix, "retry");
    }

    #[test]
    fn test_prose_around_json_uses_regex() {
        let text = "Sure! Here you go:\n\"root_cause\": \"token\nexpired\",\n\"suggested_fix\": \"rotate it\"";
        let r = parse_analysis(text);
        assert_eq!(r.root_cause, "token\nexpired");
        assert_eq!(r.suggested_fix, "rotate it");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let r = parse_analysis("I could not tell.");
        assert_eq!(r.root_cause, NO_ROOT_CAUSE);
        assert_eq!(r.suggested_fix, NO_FIX_SUGGESTED);

        let r = parse_analysis(r#"{"root_cause": "oom"}"#);
        assert_eq!(r.root_cause, "oom");
        assert_eq!(r.suggested_fix, NO_FIX_SUGGESTED);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }
}
