use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::AppError;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("fenced json pattern"));

static BRACKET_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\[.*\]|\{.*\})").expect("bracket span pattern"));

/// Parse `text` as JSON, falling back to a ```` ```json ```` fenced block.
///
/// On a failed direct parse, doubled quotes (`""`) are collapsed first; that
/// quoting artifact shows up regularly in model output.
pub fn extract(text: &str) -> Result<Value, AppError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    let normalized = text.replace("\"\"", "\"");
    if let Ok(value) = serde_json::from_str(&normalized) {
        return Ok(value);
    }

    // The un-normalized block is tried too: collapsing quotes breaks `""` literals.
    let candidates = [fenced_block(&normalized), fenced_block(text)];
    candidates
        .into_iter()
        .flatten()
        .find_map(|inner| serde_json::from_str(inner).ok())
        .ok_or_else(|| AppError::ExtractionFailed {
            text: text.to_string(),
        })
}

fn fenced_block(text: &str) -> Option<&str> {
    FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The first greedy `[...]` or `{...}` span in `text`, across newlines.
pub fn bracket_span(text: &str) -> Option<&str> {
    BRACKET_SPAN.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_parses_directly() {
        assert_eq!(extract(r#"{"a": [1, 2], "b": null}"#).unwrap(), json!({"a": [1, 2], "b": null}));
        assert_eq!(extract("42").unwrap(), json!(42));
        assert_eq!(extract(r#"{"empty": ""}"#).unwrap(), json!({"empty": ""}));
    }

    #[test]
    fn fenced_block_inside_prose() {
        let value = extract("Sure! ```json\n[1,2,3]\n``` thanks").unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn fenced_block_keeps_empty_strings() {
        let value = extract("Here:\n```json\n{\"note\": \"\"}\n```").unwrap();
        assert_eq!(value, json!({"note": ""}));
    }

    #[test]
    fn doubled_quotes_are_collapsed() {
        assert_eq!(extract(r#"{""a"": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn untagged_fence_is_not_enough() {
        let err = extract("```\n[1,2]\n```").unwrap_err();
        match err {
            AppError::ExtractionFailed { text } => assert_eq!(text, "```\n[1,2]\n```"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn broken_fence_fails_with_original_text() {
        let input = "```json\n{not json}\n```";
        assert!(matches!(extract(input), Err(AppError::ExtractionFailed { text }) if text == input));
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract("noise ```json\n{\"tasks\": {\"Lab\": {\"day_needed\": [7, 14]}}}\n```").unwrap();
        let again = extract(&serde_json::to_string(&first).unwrap()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn bracket_span_is_greedy_and_multiline() {
        let text = "result:\n{\"a\": {\n\"b\": 1}\n} trailing";
        assert_eq!(bracket_span(text), Some("{\"a\": {\n\"b\": 1}\n}"));
        assert_eq!(bracket_span("no json here"), None);
    }
}
