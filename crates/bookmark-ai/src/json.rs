//! Lenient JSON extraction from model replies.

use serde_json::Value;

/// Parse the JSON object in a model reply.
///
/// Accepts a bare object, an object wrapped in a Markdown code fence, or an
/// object surrounded by prose.
pub fn parse_json_object(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Read a field that may be a string or a list of strings.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_object() {
        assert_eq!(parse_json_object(r#"{"a": 1}"#), Some(json!({"a": 1})));
        assert_eq!(
            parse_json_object("Sure! Here you go:\n```json\n{\"a\": [1]}\n```"),
            Some(json!({"a": [1]}))
        );
        assert_eq!(parse_json_object("[1, 2]"), None);
        assert_eq!(parse_json_object("no json } here {"), None);
    }

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(&json!("rust")), vec!["rust"]);
        assert_eq!(string_list(&json!(["a", 1, " b ", ""])), vec!["a", "b"]);
        assert!(string_list(&json!(null)).is_empty());
    }
}
