use serde_json::{json, Map, Value};

#[derive(Default)]
struct NormalizationState {
    renamed: Vec<Value>,
    ignored: Vec<Value>,
}

fn rename_key(
    map: &mut Map<String, Value>,
    from_key: &str,
    to_key: &str,
    state: &mut NormalizationState,
    note: Option<&str>,
) {
    if !map.contains_key(from_key) {
        return;
    }
    if map.contains_key(to_key) {
        map.remove(from_key);
        state.ignored.push(json!({
            "from": from_key,
            "to": to_key,
            "reason": "canonical_already_set",
            "note": note,
        }));
        return;
    }
    if let Some(value) = map.remove(from_key) {
        map.insert(to_key.to_string(), value);
        state.renamed.push(json!({
            "from": from_key,
            "to": to_key,
            "note": note,
        }));
    }
}

fn compact_state(state: NormalizationState) -> Option<Value> {
    let mut out = Map::new();
    if !state.renamed.is_empty() {
        out.insert("renamed".to_string(), Value::Array(state.renamed));
    }
    if !state.ignored.is_empty() {
        out.insert("ignored".to_string(), Value::Array(state.ignored));
    }
    if out.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}

fn resolve_action_alias(tool: &str, action: &str) -> Option<&'static str> {
    match (tool, action) {
        ("kintone_record", "read" | "fetch") => Some("get"),
        ("kintone_record", "query" | "list" | "find") => Some("search"),
        ("kintone_record", "add" | "insert") => Some("create"),
        ("kintone_record", "edit" | "patch") => Some("update"),
        ("kintone_record", "comment") => Some("add_comment"),
        ("kintone_app", "apps" | "search") => Some("list"),
        ("kintone_app", "form" | "form_fields") => Some("fields"),
        ("logging", "get" | "level") => Some("get_level"),
        ("logging", "set") => Some("set_level"),
        ("logging", "send" | "log" | "message") => Some("send_message"),
        _ => None,
    }
}

/// Accepts the argument spellings older clients use and rewrites them to the
/// canonical ones. Returns the rewritten arguments and, when anything changed,
/// a note describing the changes.
pub fn normalize_args_aliases(args: &Value, tool: &str) -> (Value, Option<Value>) {
    let Some(map) = args.as_object() else {
        return (args.clone(), None);
    };
    let mut out = map.clone();
    let mut state = NormalizationState::default();

    if let Some(action_raw) = out.get("action").and_then(|v| v.as_str()).map(str::to_string) {
        let normalized = action_raw.trim().to_lowercase().replace('-', "_");
        let mapped = resolve_action_alias(tool, &normalized).map(str::to_string);
        let canonical = mapped.unwrap_or(normalized);
        if canonical != action_raw {
            out.insert("action".to_string(), Value::String(canonical.clone()));
            state.renamed.push(json!({
                "from": action_raw,
                "to": canonical,
                "note": "action_alias",
            }));
        }
    }
    let action = out
        .get("action")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    rename_key(&mut out, "appId", "app_id", &mut state, None);
    rename_key(&mut out, "app", "app_id", &mut state, None);
    rename_key(&mut out, "recordId", "record_id", &mut state, None);

    match (tool, action.as_deref()) {
        ("kintone_record", Some("create" | "update")) => {
            rename_key(&mut out, "fields", "record", &mut state, Some("record body"));
            rename_key(&mut out, "id", "record_id", &mut state, None);
        }
        ("kintone_record", Some("get")) => {
            rename_key(&mut out, "id", "record_id", &mut state, None);
        }
        ("kintone_record", Some("add_comment")) => {
            rename_key(&mut out, "comment", "text", &mut state, None);
            rename_key(&mut out, "id", "record_id", &mut state, None);
        }
        ("kintone_app", Some("list")) => {
            rename_key(&mut out, "app_name", "name", &mut state, None);
        }
        ("kintone_text", _) => {
            rename_key(&mut out, "value", "text", &mut state, None);
            rename_key(&mut out, "fields", "record", &mut state, None);
        }
        _ => {}
    }

    (Value::Object(out), compact_state(state))
}

#[cfg(test)]
mod tests {
    use super::normalize_args_aliases;
    use serde_json::json;

    #[test]
    fn fields_becomes_record_for_writes() {
        let args = json!({"action": "create", "app_id": 1, "fields": {"a": {"value": "x"}}});
        let (normalized, note) = normalize_args_aliases(&args, "kintone_record");
        assert!(normalized.get("fields").is_none());
        assert_eq!(normalized["record"], json!({"a": {"value": "x"}}));
        assert_eq!(note.unwrap()["renamed"][0]["to"], "record");
    }

    #[test]
    fn fields_is_kept_for_search() {
        let args = json!({"action": "search", "app_id": 1, "fields": ["a"]});
        let (normalized, note) = normalize_args_aliases(&args, "kintone_record");
        assert_eq!(normalized["fields"], json!(["a"]));
        assert!(note.is_none());
    }

    #[test]
    fn canonical_value_wins_over_alias() {
        let args = json!({"action": "update", "record": {"a": 1}, "fields": {"b": 2}});
        let (normalized, note) = normalize_args_aliases(&args, "kintone_record");
        assert_eq!(normalized["record"], json!({"a": 1}));
        assert_eq!(note.unwrap()["ignored"][0]["from"], "fields");
    }

    #[test]
    fn action_aliases_are_resolved() {
        let args = json!({"action": "Comment", "app_id": 1});
        let (normalized, _) = normalize_args_aliases(&args, "kintone_record");
        assert_eq!(normalized["action"], "add_comment");
        let (normalized, _) = normalize_args_aliases(&json!({"action": "set"}), "logging");
        assert_eq!(normalized["action"], "set_level");
    }

    #[test]
    fn camel_case_ids_are_renamed() {
        let args = json!({"action": "get", "appId": "3", "recordId": 9});
        let (normalized, _) = normalize_args_aliases(&args, "kintone_record");
        assert_eq!(normalized["app_id"], "3");
        assert_eq!(normalized["record_id"], 9);
    }
}
