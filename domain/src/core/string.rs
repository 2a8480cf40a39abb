//! String helpers for status lines and prompt composition.

/// Shorten `s` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let head: String = s.chars().take(keep).collect();
    format!("{}...", head)
}

/// Collapse all whitespace runs (including newlines) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a JSON value as prompt text: strings are used verbatim, anything
/// else is pretty-printed.
pub fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("日本語テスト文字列", 6), "日本語...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\n  b\tc "), "a b c");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&serde_json::json!("plain")), "plain");
        assert_eq!(value_to_text(&serde_json::Value::Null), "");
        assert!(value_to_text(&serde_json::json!({"a": 1})).contains("\"a\": 1"));
    }
}
