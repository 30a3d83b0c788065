use crate::mcp::aliases::{builtin_tool_aliases, resolve_tool_alias};
use crate::mcp::catalog::{tool_actions, tool_by_name, tool_catalog};
use crate::utils::suggest::suggest;
use serde_json::{json, Value};

const OVERVIEW: &str = "kintone-bridge exposes kintone records and apps as tools. \
Record text is cleaned before every write \
(mojibake repair, NFKC, control character removal, trimming).";

fn example_for(tool: &str, action: &str) -> Option<Value> {
    let example = match (tool, action) {
        ("kintone_record", "get") => json!({"action": "get", "app_id": 12, "record_id": 3}),
        ("kintone_record", "search") => json!({
            "action": "search",
            "app_id": 12,
            "query": "category in (\"交通費\") order by $id desc limit 10",
            "fields": ["$id", "category", "amount"]
        }),
        ("kintone_record", "create") => json!({
            "action": "create",
            "app_id": 12,
            "record": {"category": {"value": "交通費"}, "amount": {"value": 1200}}
        }),
        ("kintone_record", "update") => json!({
            "action": "update",
            "app_id": 12,
            "record_id": 3,
            "revision": -1,
            "record": {"amount": {"value": 1500}}
        }),
        ("kintone_record", "add_comment") => json!({
            "action": "add_comment",
            "app_id": 12,
            "record_id": 3,
            "text": "Checked.",
            "mentions": [{"type": "USER", "code": "sato"}]
        }),
        ("kintone_app", "list") => json!({"action": "list", "name": "Expense", "limit": 10}),
        ("kintone_app", "fields") => json!({"action": "fields", "app_id": 12, "lang": "en"}),
        ("kintone_text", "normalize") => json!({"action": "normalize", "text": "  ｶﾀｶﾅ  "}),
        ("logging", "set_level") => json!({"action": "set_level", "level": "debug"}),
        ("logging", "send_message") => {
            json!({"action": "send_message", "level": "info", "message": "hello"})
        }
        ("logging", "get_level") => json!({"action": "get_level"}),
        _ => return None,
    };
    Some(example)
}

fn describe_tool(name: &str, action: Option<&str>) -> Option<Value> {
    let tool = tool_by_name(name)?;
    let actions = tool_actions(name);
    let aliases: Vec<Value> = builtin_tool_aliases()
        .iter()
        .filter(|alias| alias.tool == name)
        .map(|alias| json!({"name": alias.name, "action": alias.action}))
        .collect();
    let mut out = json!({
        "name": tool.name,
        "description": tool.description,
        "actions": actions,
        "aliases": aliases,
        "fields": tool
            .input_schema
            .get("properties")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.keys()
                    .filter(|k| *k != "action" && *k != "trace_id")
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default(),
    });
    if let Some(action) = action {
        out["action"] = json!(action);
        out["example"] = example_for(name, action).unwrap_or(Value::Null);
    }
    Some(out)
}

/// Result of the `help` tool. Without arguments it lists every tool; with
/// `tool` (a canonical name or a flat alias) it describes that tool.
pub fn build_help_payload(args: &Value) -> Value {
    let requested = args.get("tool").and_then(|v| v.as_str()).map(str::trim);
    let action = args.get("action").and_then(|v| v.as_str()).map(str::trim);

    let Some(requested) = requested.filter(|s| !s.is_empty()) else {
        let tools: Vec<Value> = tool_catalog()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "actions": tool_actions(&tool.name),
                })
            })
            .collect();
        return json!({"overview": OVERVIEW, "tools": tools});
    };

    let (name, action) = match resolve_tool_alias(requested) {
        Some(alias) => (alias.tool, action.or(Some(alias.action))),
        None => (requested, action),
    };
    match describe_tool(name, action) {
        Some(described) => described,
        None => {
            let candidates: Vec<String> = tool_catalog()
                .iter()
                .map(|tool| tool.name.clone())
                .chain(builtin_tool_aliases().iter().map(|a| a.name.to_string()))
                .collect();
            json!({
                "error": format!("Unknown tool: {}", requested),
                "did_you_mean": suggest(requested, &candidates, 3),
            })
        }
    }
}
