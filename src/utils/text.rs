/// Cuts `value` to at most `max_bytes` bytes without splitting a character.
pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Short form of a value for log lines: strings are cut, anything else is
/// rendered as compact JSON first.
pub fn preview(value: &serde_json::Value, max_bytes: usize) -> String {
    let rendered = match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if rendered.len() <= max_bytes {
        return rendered;
    }
    format!("{}...", truncate_utf8_prefix(&rendered, max_bytes))
}
