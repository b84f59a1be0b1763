//! Recovery of JSON arrays from loosely formatted model output.
//!
//! Steps run in a fixed order, each on the output of the previous one:
//! fence strip, bracket slice, record-boundary repair, parse, then a parse
//! of the unrepaired slice as fallback.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?\s*```$").expect("fence pattern is valid")
    })
}

fn boundary_regex() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| {
        Regex::new(r"\}\s*[^,\[\]{}]*\s*\{").expect("boundary pattern is valid")
    })
}

/// Trims the text and unwraps a ```/```json fenced block if it is one
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match fence_regex().captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) if !inner.as_str().is_empty() => inner.as_str().trim(),
        _ => trimmed,
    }
}

/// Narrows the text to the span from the first `[` to the last `]`
///
/// Text without both brackets, or with the last `]` before the first `[`,
/// is returned unchanged.
pub fn slice_to_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        // Inverted brackets are left alone rather than sliced between.
        _ => text,
    }
}

/// Rewrites every `}<junk>{` between adjacent records to `},{`
///
/// Junk is any run of characters without braces, brackets or commas, so
/// properly separated records are left alone.
pub fn repair_record_boundaries(text: &str) -> Cow<'_, str> {
    boundary_regex().replace_all(text, "},{")
}

/// Parses model output into a JSON value, repairing it where possible
pub fn parse_model_json(text: &str) -> AppResult<Value> {
    let sliced = slice_to_array(strip_code_fence(text));
    let repaired = repair_record_boundaries(sliced);

    let repair_error = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    tracing::warn!(
        error = %repair_error,
        raw = %text,
        repaired = %repaired,
        "Repaired model output failed to parse, retrying unrepaired text"
    );

    serde_json::from_str::<Value>(sliced).map_err(|fallback_error| {
        tracing::error!(
            error = %fallback_error,
            "Model output could not be parsed after repair"
        );
        AppError::UnparsableOutput {
            raw: text.to_string(),
            repaired: repaired.into_owned(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titles(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["title"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_well_formed_array_is_returned_unchanged() {
        let input = r#"[{"title":"A","year":1999,"actors":["x","y"]},{"title":"B","year":2001}]"#;
        let parsed = parse_model_json(input).unwrap();
        assert_eq!(parsed, serde_json::from_str::<Value>(input).unwrap());
    }

    #[test]
    fn test_junk_between_records_is_repaired() {
        let parsed = parse_model_json(r#"[{"title":"A"} junk {"title":"B"}]"#).unwrap();
        assert_eq!(titles(&parsed), vec!["A", "B"]);
    }

    #[test]
    fn test_missing_commas_repaired_globally() {
        let input = "[{\"title\":\"A\"}\n{\"title\":\"B\"} -- {\"title\":\"C\"}{\"title\":\"D\"}]";
        let parsed = parse_model_json(input).unwrap();
        assert_eq!(titles(&parsed), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_fenced_block_matches_unfenced() {
        let body = r#"[{"title":"A"},{"title":"B"}]"#;
        let fenced = format!("```json\n{}\n```", body);
        let bare_fence = format!("  ```\n{}\n```\n", body);

        let expected = parse_model_json(body).unwrap();
        assert_eq!(parse_model_json(&fenced).unwrap(), expected);
        assert_eq!(parse_model_json(&bare_fence).unwrap(), expected);
    }

    #[test]
    fn test_surrounding_prose_is_dropped() {
        let input = r#"Sure! Here are your movies: [{"title":"A"}] Enjoy the show."#;
        let parsed = parse_model_json(input).unwrap();
        assert_eq!(titles(&parsed), vec!["A"]);
    }

    #[test]
    fn test_fallback_to_unrepaired_text() {
        // The `}": {` run starting inside the key gets rewritten and breaks
        // the object; the untouched slice still parses.
        let input = r#"[{"title":"A", "notes}": {"seen": true}}]"#;
        let parsed = parse_model_json(input).unwrap();
        assert_eq!(titles(&parsed), vec!["A"]);
        assert_eq!(parsed[0]["notes}"]["seen"], json!(true));
    }

    #[test]
    fn test_unparsable_output_carries_both_texts() {
        let input = "the model is having a bad day {{{ not json";
        match parse_model_json(input) {
            Err(AppError::UnparsableOutput { raw, repaired }) => {
                assert_eq!(raw, input);
                assert_eq!(repaired, input.trim());
            }
            other => panic!("expected UnparsableOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_comma_is_not_repaired() {
        let result = parse_model_json(r#"[{"title":"A"},]"#);
        assert!(matches!(result, Err(AppError::UnparsableOutput { .. })));
    }

    #[test]
    fn test_plain_number_array_parses() {
        assert_eq!(parse_model_json("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_slice_to_array() {
        assert_eq!(slice_to_array("x [1, [2]] y"), "[1, [2]]");
        assert_eq!(slice_to_array("no brackets"), "no brackets");
        assert_eq!(slice_to_array("] backwards ["), "] backwards [");
    }

    #[test]
    fn test_inverted_brackets_are_unparsable() {
        assert!(matches!(
            parse_model_json("]5["),
            Err(AppError::UnparsableOutput { .. })
        ));
    }

    #[test]
    fn test_repair_leaves_separated_records_alone() {
        let input = r#"[{"a":1}, {"b":2}]"#;
        assert!(matches!(repair_record_boundaries(input), Cow::Borrowed(_)));
    }
}
