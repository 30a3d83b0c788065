use crate::constants::limits::MAX_APPS_LIMIT;
use crate::errors::ToolError;
use crate::services::kintone_client::{AppsQuery, SharedRecordApi};
use crate::services::logger::Logger;
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_action_error;
use serde_json::{json, Value};

const APP_ACTIONS: &[&str] = &["list", "fields"];
const FIELD_LANGUAGES: &[&str] = &["ja", "en", "zh", "user", "default"];

#[derive(Clone)]
pub struct AppManager {
    logger: Logger,
    validation: Validation,
    api: Result<SharedRecordApi, ToolError>,
}

impl AppManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        api: Result<SharedRecordApi, ToolError>,
    ) -> Self {
        Self {
            logger: logger.child("app"),
            validation,
            api,
        }
    }

    fn api(&self) -> Result<&SharedRecordApi, ToolError> {
        self.api.as_ref().map_err(Clone::clone)
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, ToolError> {
        let action = args.get("action");
        match action.and_then(|v| v.as_str()).unwrap_or("") {
            "list" => {
                let query = AppsQuery {
                    name: self
                        .validation
                        .ensure_optional_string(args.get("name"), "name", true)?,
                    limit: self.validation.ensure_optional_u64(
                        args.get("limit"),
                        "limit",
                        MAX_APPS_LIMIT,
                    )?,
                    offset: self.validation.ensure_optional_u64(
                        args.get("offset"),
                        "offset",
                        u64::from(u32::MAX),
                    )?,
                };
                if query.limit == Some(0) {
                    return Err(ToolError::invalid_params("limit must be at least 1"));
                }
                let apps = self.api()?.get_apps(&query).await?;
                Ok(json!({"apps": apps, "count": apps.len()}))
            }
            "fields" => {
                let app = self.validation.ensure_id(args.get("app_id"), "app_id")?;
                let lang = self
                    .validation
                    .ensure_optional_string(args.get("lang"), "lang", true)?;
                if let Some(lang) = lang.as_deref() {
                    if !FIELD_LANGUAGES.contains(&lang) {
                        return Err(ToolError::invalid_params(format!(
                            "lang must be one of {}",
                            FIELD_LANGUAGES.join(", ")
                        )));
                    }
                }
                let fields = self.api()?.get_form_fields(app, lang.as_deref()).await?;
                Ok(json!({
                    "properties": fields.get("properties").cloned().unwrap_or_else(|| json!({})),
                    "revision": fields.get("revision").cloned().unwrap_or(Value::Null),
                }))
            }
            _ => Err(unknown_action_error("kintone_app", action, APP_ACTIONS)),
        }
    }
}

#[async_trait::async_trait]
impl crate::services::tool_executor::ToolHandler for AppManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.logger.debug("handle_action", args.get("action"));
        self.handle_action(args).await
    }
}
