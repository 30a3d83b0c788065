use crate::errors::ToolError;
use crate::normalize::RecordPreparer;
use crate::services::logger::Logger;
use crate::utils::tool_errors::unknown_action_error;
use serde_json::{json, Value};

const TEXT_ACTIONS: &[&str] = &["normalize"];

/// Runs the write-path cleaning locally so callers can see what a create or
/// update would send.
#[derive(Clone)]
pub struct TextManager {
    logger: Logger,
    preparer: RecordPreparer,
}

impl TextManager {
    pub fn new(logger: Logger, preparer: RecordPreparer) -> Self {
        Self {
            logger: logger.child("text"),
            preparer,
        }
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, ToolError> {
        let action = args.get("action");
        match action.and_then(|v| v.as_str()).unwrap_or("") {
            "normalize" => self.normalize(&args),
            _ => Err(unknown_action_error("kintone_text", action, TEXT_ACTIONS)),
        }
    }

    fn normalize(&self, args: &Value) -> Result<Value, ToolError> {
        let text = args.get("text").filter(|v| !v.is_null());
        let record = args.get("record").filter(|v| !v.is_null());
        match (text, record) {
            (Some(text), None) => {
                let raw = text
                    .as_str()
                    .ok_or_else(|| ToolError::invalid_params("text must be a string"))?;
                let normalized = self.preparer.normalizer().normalize_text(raw);
                Ok(json!({
                    "text": normalized,
                    "changed": normalized != raw,
                }))
            }
            (None, Some(record)) => {
                let body = record
                    .as_object()
                    .cloned()
                    .ok_or_else(|| ToolError::invalid_params("record must be an object"))?;
                let prepared = self.preparer.prepare(body);
                let changed = prepared.changed_fields();
                Ok(json!({
                    "record": prepared.payload.to_json(),
                    "changed": !changed.is_empty(),
                    "changed_fields": changed,
                    "snapped": prepared.snapped,
                    "depth": self.preparer.normalizer().depth().as_str(),
                }))
            }
            (Some(_), Some(_)) => Err(ToolError::invalid_params(
                "pass either text or record, not both",
            )),
            (None, None) => Err(ToolError::invalid_params("text or record is required")
                .with_hint("Example: {\"action\": \"normalize\", \"text\": \"ｶﾀｶﾅ\"}")),
        }
    }
}

#[async_trait::async_trait]
impl crate::services::tool_executor::ToolHandler for TextManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.logger.debug("handle_action", args.get("action"));
        self.handle_action(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TextManager {
        TextManager::new(Logger::new("test"), RecordPreparer::default())
    }

    #[tokio::test]
    async fn text_is_cleaned_and_flagged() {
        let out = manager()
            .handle_action(json!({"action": "normalize", "text": " 莠､騾夊ｲｻ "}))
            .await
            .unwrap();
        assert_eq!(out, json!({"text": "会議費", "changed": true}));
    }

    #[tokio::test]
    async fn clean_text_is_unchanged() {
        let out = manager()
            .handle_action(json!({"action": "normalize", "text": "会議費"}))
            .await
            .unwrap();
        assert_eq!(out["changed"], false);
    }

    #[tokio::test]
    async fn record_preview_lists_changed_fields() {
        let out = manager()
            .handle_action(json!({
                "action": "normalize",
                "record": {"note": "縺昴ｎ莉", "amount": {"value": 500}}
            }))
            .await
            .unwrap();
        assert_eq!(out["record"], json!({"note": "その他", "amount": {"value": 500}}));
        assert_eq!(out["changed_fields"], json!(["note"]));
        assert_eq!(out["depth"], "shallow");
    }

    #[tokio::test]
    async fn text_and_record_are_exclusive() {
        let err = manager()
            .handle_action(json!({"action": "normalize", "text": "a", "record": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "pass either text or record, not both");
    }
}
