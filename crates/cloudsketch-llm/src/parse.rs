use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn fenced_json() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

/// Parse raw model output into a JSON object. Tolerates code fences,
/// surrounding prose and trailing garbage. Returns `None` when no object
/// can be recovered.
pub fn parse_model_output(raw: &str) -> Option<Map<String, Value>> {
    if let Some(candidate) = extract_json_object(raw) {
        if let Ok(Value::Object(map)) = serde_json::from_str(&candidate) {
            return Some(map);
        }
    }
    // Fall back to the largest balanced object that parses
    balanced_objects(raw)
        .into_iter()
        .filter_map(|s| match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .max_by_key(|map| map.len())
}

/// Extract the JSON object substring: fenced block first, then first `{` to last `}`.
fn extract_json_object(raw: &str) -> Option<String> {
    if let Some(caps) = fenced_json().and_then(|re| re.captures(raw)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

/// Top-level `{...}` spans, skipping braces inside string literals.
fn balanced_objects(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw.char_indices() {
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
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&raw[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_wins_over_prose_braces() {
        let raw = "Here {you} go:\n```json\n{\"architecture\": {\"region\": \"us-west-2\"}}\n```\nbye {}";
        let map = parse_model_output(raw).unwrap();
        assert_eq!(map["architecture"]["region"], "us-west-2");
    }

    #[test]
    fn bare_object_with_prose() {
        let raw = "Sure! {\"compute\": {\"ec2\": {\"enabled\": true}}} Hope that helps.";
        let map = parse_model_output(raw).unwrap();
        assert_eq!(map["compute"]["ec2"]["enabled"], true);
    }

    #[test]
    fn picks_richest_balanced_object() {
        let raw = "{\"a\": 1} then {\"b\": {\"c\": \"}\"}, \"d\": 3}";
        let map = parse_model_output(raw).unwrap();
        assert_eq!(map["d"], 3);
        assert_eq!(map["b"]["c"], "}");
    }

    #[test]
    fn nothing_to_recover() {
        assert!(parse_model_output("I cannot help with that.").is_none());
        assert!(parse_model_output("[1, 2, 3]").is_none());
        assert!(parse_model_output("{\"a\": ").is_none());
    }
}
