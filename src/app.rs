use crate::errors::ToolError;
use crate::managers;
use crate::mcp::catalog::tool_catalog;
use crate::normalize::{default_correction_table, DropdownChoices, Normalizer, RecordPreparer};
use crate::services::config::Settings;
use crate::services::kintone_client::{KintoneClient, SharedRecordApi};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

/// Tools answered by the server itself rather than a handler.
pub const BUILTIN_TOOLS: &[&str] = &["help"];

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !BUILTIN_TOOLS.contains(&tool.name.as_str()))
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json must have a handler.")
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    /// Reads the environment and connects the real kintone client. A missing
    /// or broken kintone configuration is logged and surfaces on the first
    /// remote call.
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("kintone-bridge");
        let settings = Settings::from_env();
        for warning in &settings.warnings {
            logger.warn(warning, None);
        }

        let api = settings.kintone.clone().and_then(|config| {
            let client = KintoneClient::new(&config).map_err(ToolError::from)?;
            logger.info(
                "kintone client ready",
                Some(&serde_json::json!({
                    "domain": config.domain,
                    "auth": config.auth.method(),
                    "timeout_ms": config.timeout.as_millis() as u64,
                })),
            );
            Ok(Arc::new(client) as SharedRecordApi)
        });
        if let Err(err) = &api {
            logger.warn(
                "kintone API unavailable; only local tools will work",
                Some(&serde_json::json!({"message": err.message, "hint": err.hint})),
            );
        }

        Self::build(logger, &settings, api)
    }

    /// Wires managers around the given API client.
    pub fn build(
        logger: Logger,
        settings: &Settings,
        api: Result<SharedRecordApi, ToolError>,
    ) -> Result<Self, ToolError> {
        let validation = Validation::new();
        let normalizer =
            Normalizer::new(default_correction_table()).with_depth(settings.normalize_depth);
        let choices = settings.snap_dropdowns.then(DropdownChoices::builtin);
        let preparer = RecordPreparer::new(normalizer, choices);
        logger.debug(
            "record preparation",
            Some(&serde_json::json!({
                "depth": settings.normalize_depth.as_str(),
                "snap_dropdowns": preparer.snaps_dropdowns(),
                "correction_patterns": preparer.normalizer().table().len(),
            })),
        );

        let record_manager = Arc::new(managers::record::RecordManager::new(
            logger.clone(),
            validation.clone(),
            preparer.clone(),
            api.clone(),
        ));
        let app_manager = Arc::new(managers::app::AppManager::new(
            logger.clone(),
            validation,
            api,
        ));
        let text_manager = Arc::new(managers::text::TextManager::new(logger.clone(), preparer));
        let logging_manager = Arc::new(managers::logging::LoggingManager::new(logger.clone()));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("kintone_record".to_string(), record_manager);
        handlers.insert("kintone_app".to_string(), app_manager);
        handlers.insert("kintone_text".to_string(), text_manager);
        handlers.insert("logging".to_string(), logging_manager);

        Self::validate_tool_wiring(&handlers)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        Ok(Self {
            logger,
            tool_executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiring_reports_missing_handlers() {
        let err = App::validate_tool_wiring(&HashMap::new()).unwrap_err();
        let missing = err.details.expect("details")["missing_tools"].clone();
        assert_eq!(
            missing,
            serde_json::json!(["kintone_app", "kintone_record", "kintone_text", "logging"])
        );
    }

    #[test]
    fn build_without_kintone_config_succeeds() {
        let settings = Settings::from_lookup(|_| None);
        let app = App::build(Logger::new("test"), &settings, Err(ToolError::denied("off")))
            .expect("app");
        assert!(app.tool_executor.has_tool("kintone_text"));
        assert!(!app.tool_executor.has_tool("help"));
    }
}
