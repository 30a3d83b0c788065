use crate::constants::kintone::SYSTEM_FIELD_PREFIX;
use crate::constants::limits::{
    LOG_SUBSTRING_LENGTH, MAX_COMMENT_LENGTH, MAX_MENTIONS, MAX_QUERY_LENGTH,
};
use crate::errors::ToolError;
use crate::normalize::{PreparedRecord, RecordPreparer};
use crate::services::kintone_client::{Mention, RecordQuery, SharedRecordApi};
use crate::services::logger::{LogLevel, Logger};
use crate::services::validation::Validation;
use crate::utils::text::preview;
use crate::utils::tool_errors::unknown_action_error;
use serde_json::{json, Map, Value};

const RECORD_ACTIONS: &[&str] = &["get", "search", "create", "update", "add_comment"];

/// Splits a record as kintone returns it into its id, revision and the
/// user-defined fields.
fn split_system_fields(record: Value) -> Value {
    let Value::Object(map) = record else {
        return record;
    };
    let system_value = |code: &str| {
        map.get(code)
            .and_then(|field| field.get("value"))
            .cloned()
            .unwrap_or(Value::Null)
    };
    let id = system_value("$id");
    let revision = system_value("$revision");
    let fields: Map<String, Value> = map
        .iter()
        .filter(|(code, _)| !code.starts_with(SYSTEM_FIELD_PREFIX))
        .map(|(code, value)| (code.clone(), value.clone()))
        .collect();
    json!({"id": id, "revision": revision, "record": fields})
}

#[derive(Clone)]
pub struct RecordManager {
    logger: Logger,
    validation: Validation,
    preparer: RecordPreparer,
    api: Result<SharedRecordApi, ToolError>,
}

impl RecordManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        preparer: RecordPreparer,
        api: Result<SharedRecordApi, ToolError>,
    ) -> Self {
        Self {
            logger: logger.child("record"),
            validation,
            preparer,
            api,
        }
    }

    fn api(&self) -> Result<&SharedRecordApi, ToolError> {
        self.api.as_ref().map_err(Clone::clone)
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, ToolError> {
        let action = args.get("action");
        match action.and_then(|v| v.as_str()).unwrap_or("") {
            "get" => self.get(&args).await,
            "search" => self.search(&args).await,
            "create" => self.create(&args).await,
            "update" => self.update(&args).await,
            "add_comment" => self.add_comment(&args).await,
            _ => Err(unknown_action_error("kintone_record", action, RECORD_ACTIONS)),
        }
    }

    async fn get(&self, args: &Value) -> Result<Value, ToolError> {
        let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
        let id = self.validation.ensure_id(args.get("record_id"), "record_id")?;
        let record = self.api()?.get_record(app, id).await?;
        Ok(split_system_fields(record))
    }

    async fn search(&self, args: &Value) -> Result<Value, ToolError> {
        let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
        let query = self
            .validation
            .ensure_optional_string(args.get("query"), "query", true)?;
        if query.as_ref().map(|q| q.len()).unwrap_or(0) > MAX_QUERY_LENGTH {
            return Err(ToolError::invalid_params(format!(
                "query must be at most {} bytes",
                MAX_QUERY_LENGTH
            )));
        }
        let fields = self.validation.ensure_string_list(args.get("fields"), "fields")?;
        let total_count = args
            .get("total_count")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let page = self
            .api()?
            .get_records(
                app,
                &RecordQuery {
                    query,
                    fields,
                    total_count,
                },
            )
            .await?;
        let records: Vec<Value> = page.records.into_iter().map(split_system_fields).collect();
        Ok(json!({
            "records": records,
            "total_count": page.total_count,
        }))
    }

    /// Validates and cleans the record body of a write, logging what changed.
    fn prepare_record(&self, args: &Value) -> Result<PreparedRecord, ToolError> {
        let record = self.validation.ensure_record_object(args.get("record"))?;
        let prepared = self.preparer.prepare(record);
        if self.logger.enabled(LogLevel::Debug) {
            for code in prepared.changed_fields() {
                let before = prepared
                    .original
                    .get(&code)
                    .map(|f| preview(f.value(), LOG_SUBSTRING_LENGTH));
                let after = prepared
                    .payload
                    .get(&code)
                    .map(|f| preview(f.value(), LOG_SUBSTRING_LENGTH));
                self.logger.debug(
                    "field value rewritten",
                    Some(&json!({"field": code, "before": before, "after": after})),
                );
            }
        }
        Ok(prepared)
    }

    fn write_summary(prepared: &PreparedRecord) -> Value {
        json!({
            "normalized": prepared.normalized,
            "snapped": prepared.snapped,
        })
    }

    async fn create(&self, args: &Value) -> Result<Value, ToolError> {
        let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
        let prepared = self.prepare_record(args)?;
        let created = self.api()?.create_record(app, &prepared.payload).await?;
        self.logger.info(
            "record created",
            Some(&json!({"app": app, "id": created.id, "revision": created.revision})),
        );
        let mut out = Self::write_summary(&prepared);
        out["id"] = json!(created.id);
        out["revision"] = json!(created.revision);
        Ok(out)
    }

    async fn update(&self, args: &Value) -> Result<Value, ToolError> {
        let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
        let id = self.validation.ensure_id(args.get("record_id"), "record_id")?;
        let revision = self.validation.ensure_revision(args.get("revision"))?;
        let prepared = self.prepare_record(args)?;
        let new_revision = self
            .api()?
            .update_record(app, id, &prepared.payload, revision)
            .await?;
        self.logger.info(
            "record updated",
            Some(&json!({"app": app, "id": id, "revision": new_revision})),
        );
        let mut out = Self::write_summary(&prepared);
        out["id"] = json!(id.to_string());
        out["revision"] = json!(new_revision);
        Ok(out)
    }

    async fn add_comment(&self, args: &Value) -> Result<Value, ToolError> {
        let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
        let record = self.validation.ensure_id(args.get("record_id"), "record_id")?;
        let raw = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("text must be a string"))?;
        let text = self.preparer.normalizer().normalize_text(raw);
        if text.is_empty() {
            return Err(ToolError::invalid_params(
                "text is empty after normalization",
            ));
        }
        if text.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ToolError::invalid_params(format!(
                "text must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        let mentions: Vec<Mention> = match args.get("mentions").filter(|v| !v.is_null()) {
            None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                ToolError::invalid_params(format!("mentions are invalid: {}", err))
            })?,
        };
        if mentions.len() > MAX_MENTIONS {
            return Err(ToolError::invalid_params(format!(
                "at most {} mentions are allowed",
                MAX_MENTIONS
            )));
        }
        let comment_id = self
            .api()?
            .add_record_comment(app, record, &text, &mentions)
            .await?;
        Ok(json!({
            "id": comment_id,
            "normalized": text != raw,
        }))
    }
}

#[async_trait::async_trait]
impl crate::services::tool_executor::ToolHandler for RecordManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.logger.debug("handle_action", args.get("action"));
        self.handle_action(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_fields_are_split_out() {
        let split = split_system_fields(json!({
            "$id": {"type": "__ID__", "value": "4"},
            "$revision": {"type": "__REVISION__", "value": "2"},
            "title": {"type": "SINGLE_LINE_TEXT", "value": "Trip"}
        }));
        assert_eq!(split["id"], "4");
        assert_eq!(split["revision"], "2");
        assert_eq!(
            split["record"],
            json!({"title": {"type": "SINGLE_LINE_TEXT", "value": "Trip"}})
        );
    }

    #[tokio::test]
    async fn remote_actions_fail_without_configuration() {
        let manager = RecordManager::new(
            Logger::new("test"),
            Validation::new(),
            RecordPreparer::default(),
            Err(ToolError::denied("kintone is not configured")),
        );
        let err = manager
            .handle_action(json!({"action": "get", "app_id": 1, "record_id": 2}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "kintone is not configured");
    }

    #[tokio::test]
    async fn arguments_are_checked_before_configuration() {
        let manager = RecordManager::new(
            Logger::new("test"),
            Validation::new(),
            RecordPreparer::default(),
            Err(ToolError::denied("kintone is not configured")),
        );
        let err = manager
            .handle_action(json!({"action": "create", "app_id": 0, "record": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "app_id must be a positive integer");
    }
}
