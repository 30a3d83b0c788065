use crate::errors::ToolError;
use crate::utils::suggest::suggest;
use serde_json::Value;

pub fn unknown_action_error(
    tool: &str,
    action: Option<&Value>,
    known_actions: &[&str],
) -> ToolError {
    let action_value = action
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_default();
    let known: Vec<String> = known_actions.iter().map(|s| s.to_string()).collect();
    let suggestions = suggest(&action_value, &known, 3);

    let mut hint = Vec::new();
    if !suggestions.is_empty() {
        hint.push(format!("Did you mean: {}?", suggestions.join(", ")));
    }
    if !known.is_empty() {
        hint.push(format!("Use one of: {}.", known.join(", ")));
    }

    let message = if action_value.is_empty() {
        format!("{} requires an action", tool)
    } else {
        format!("Unknown {} action: {}", tool, action_value)
    };
    let mut err = ToolError::invalid_params(message);
    if !hint.is_empty() {
        err = err.with_hint(hint.join(" "));
    }
    err.with_details(serde_json::json!({
        "known_actions": known,
        "did_you_mean": suggestions,
    }))
}
