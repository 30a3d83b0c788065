use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ToolError;
use crate::mcp::aliases::{builtin_tool_aliases, resolve_tool_alias};
use crate::services::logger::Logger;
use crate::utils::arg_aliases::normalize_args_aliases;
use crate::utils::suggest::suggest;

use serde_json::Value;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub tool: String,
    pub args: Value,
    pub invoked_as: Option<String>,
    pub normalized_args: Option<Value>,
    pub trace_id: String,
}

#[derive(Clone)]
pub(crate) struct ToolCallMeta {
    pub started_at: i64,
    pub trace_id: String,
    pub invoked_as: Option<String>,
    pub normalized_args: Option<Value>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.handlers.contains_key(tool)
    }

    /// Resolves a legacy flat name to its tool and injects the action it stands
    /// for. An explicit `action` argument is left as the caller sent it.
    fn resolve_alias(&self, tool: &str, args: Value) -> (String, Value, Option<String>) {
        if self.handlers.contains_key(tool) {
            return (tool.to_string(), args, None);
        }
        let Some(alias) = resolve_tool_alias(tool) else {
            return (tool.to_string(), args, None);
        };
        let mut args = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => return (alias.tool.to_string(), other, Some(tool.to_string())),
        };
        args.entry("action".to_string())
            .or_insert_with(|| Value::String(alias.action.to_string()));
        (
            alias.tool.to_string(),
            Value::Object(args),
            Some(tool.to_string()),
        )
    }

    fn unknown_tool_error(&self, tool: &str) -> ToolError {
        let candidates: Vec<String> = self
            .handlers
            .keys()
            .cloned()
            .chain(builtin_tool_aliases().iter().map(|a| a.name.to_string()))
            .collect();
        let suggestions = suggest(tool, &candidates, 4);
        let hint = if suggestions.is_empty() {
            "Call help() to list available tools".to_string()
        } else {
            format!(
                "Did you mean: {} (or call help() for the full list)",
                suggestions.join(", ")
            )
        };
        ToolError::invalid_params(format!("Unknown tool: {}", tool)).with_hint(hint)
    }

    pub(crate) fn wrap_result(
        &self,
        tool: &str,
        args: &Value,
        result: Value,
        meta: ToolCallMeta,
    ) -> Value {
        let ToolCallMeta {
            started_at,
            trace_id,
            invoked_as,
            normalized_args,
        } = meta;
        let mut meta = serde_json::json!({
            "tool": tool,
            "action": args.get("action").cloned().unwrap_or(Value::Null),
            "trace_id": trace_id,
            "duration_ms": chrono::Utc::now().timestamp_millis() - started_at,
            "invoked_as": invoked_as,
        });
        if let Some(note) = normalized_args {
            meta["normalized_args"] = note;
        }
        serde_json::json!({
            "ok": true,
            "result": result,
            "meta": meta,
        })
    }

    /// Maps a requested name and its arguments onto a registered tool:
    /// alias expansion, argument spelling fixes and trace id extraction.
    pub fn resolve_call(&self, tool: &str, args: Value) -> Result<ResolvedCall, ToolError> {
        let (resolved_tool, args, invoked_as) = self.resolve_alias(tool, args);
        if !self.has_tool(&resolved_tool) {
            return Err(self.unknown_tool_error(tool));
        }
        let (mut args, normalized_args) = normalize_args_aliases(&args, &resolved_tool);
        let trace_id = args
            .get("trace_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if let Value::Object(map) = &mut args {
            map.remove("trace_id");
        }
        Ok(ResolvedCall {
            tool: resolved_tool,
            args,
            invoked_as,
            normalized_args,
            trace_id,
        })
    }

    pub async fn execute_resolved(&self, call: ResolvedCall) -> Result<Value, ToolError> {
        let started_at = chrono::Utc::now().timestamp_millis();
        let ResolvedCall {
            tool,
            args,
            invoked_as,
            normalized_args,
            trace_id,
        } = call;
        let Some(handler) = self.handlers.get(&tool).cloned() else {
            return Err(self.unknown_tool_error(&tool));
        };

        self.logger.debug(
            tool.as_str(),
            Some(&serde_json::json!({
                "action": args.get("action"),
                "trace_id": trace_id,
                "invoked_as": invoked_as,
            })),
        );

        let result = match handler.handle(args.clone()).await {
            Ok(result) => result,
            Err(err) => {
                self.logger.warn(
                    "tool call failed",
                    Some(&serde_json::json!({
                        "tool": tool,
                        "action": args.get("action"),
                        "trace_id": trace_id,
                        "code": err.code,
                        "message": err.message,
                    })),
                );
                return Err(err);
            }
        };
        Ok(self.wrap_result(
            &tool,
            &args,
            result,
            ToolCallMeta {
                started_at,
                trace_id,
                invoked_as,
                normalized_args,
            },
        ))
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        let call = self.resolve_call(tool, args)?;
        self.execute_resolved(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    fn executor() -> ToolExecutor {
        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("kintone_record".to_string(), Arc::new(Echo));
        ToolExecutor::new(Logger::new("test"), handlers)
    }

    #[tokio::test]
    async fn alias_injects_action_and_renames_fields() {
        let out = executor()
            .execute("create_record", json!({"app_id": 1, "fields": {"a": {"value": "x"}}}))
            .await
            .unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["result"]["action"], "create");
        assert_eq!(out["result"]["record"], json!({"a": {"value": "x"}}));
        assert_eq!(out["meta"]["invoked_as"], "create_record");
        assert_eq!(out["meta"]["tool"], "kintone_record");
    }

    #[tokio::test]
    async fn explicit_action_is_not_overridden_by_alias() {
        let out = executor()
            .execute("get_record", json!({"action": "search", "app_id": 1}))
            .await
            .unwrap();
        assert_eq!(out["result"]["action"], "search");
    }

    #[tokio::test]
    async fn trace_id_is_consumed_by_executor() {
        let out = executor()
            .execute("kintone_record", json!({"action": "get", "trace_id": "t-1"}))
            .await
            .unwrap();
        assert!(out["result"].get("trace_id").is_none());
        assert_eq!(out["meta"]["trace_id"], "t-1");
    }

    #[tokio::test]
    async fn unknown_tool_suggests_close_names() {
        let err = executor()
            .execute("kintone_recod", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unknown tool: kintone_recod");
        assert!(err.hint.unwrap().contains("kintone_record"));
    }

    #[tokio::test]
    async fn alias_of_unregistered_tool_is_unknown() {
        let err = executor().execute("get_apps_info", json!({})).await.unwrap_err();
        assert!(err.message.contains("get_apps_info"));
    }
}
