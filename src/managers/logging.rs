use crate::errors::ToolError;
use crate::services::logger::{LogLevel, Logger};
use crate::utils::tool_errors::unknown_action_error;
use serde_json::{json, Value};

const LOGGING_ACTIONS: &[&str] = &["get_level", "set_level", "send_message"];

#[derive(Clone)]
pub struct LoggingManager {
    logger: Logger,
}

impl LoggingManager {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("logging"),
        }
    }

    fn parse_level(value: Option<&Value>) -> Result<LogLevel, ToolError> {
        let raw = value
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("level is required"))?;
        LogLevel::parse(raw).ok_or_else(|| {
            ToolError::invalid_params(format!("Unknown log level: {}", raw)).with_hint(format!(
                "Use one of: {}",
                LogLevel::ALL.map(LogLevel::as_str).join(", ")
            ))
        })
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, ToolError> {
        let action = args.get("action");
        match action.and_then(|v| v.as_str()).unwrap_or("") {
            "get_level" => Ok(json!({
                "level": self.logger.level().as_str(),
                "stats": self.logger.stats(),
            })),
            "set_level" => {
                let level = Self::parse_level(args.get("level"))?;
                let previous = self.logger.level();
                self.logger.set_level(level);
                self.logger.info(
                    "log level changed",
                    Some(&json!({"from": previous.as_str(), "to": level.as_str()})),
                );
                Ok(json!({"level": level.as_str(), "previous": previous.as_str()}))
            }
            "send_message" => {
                let level = Self::parse_level(args.get("level"))?;
                let message = args
                    .get("message")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        ToolError::invalid_params("message must be a non-empty string")
                    })?;
                let target = match args.get("logger").and_then(|v| v.as_str()) {
                    Some(name) if !name.trim().is_empty() => self.logger.child(name.trim()),
                    _ => self.logger.clone(),
                };
                let logged = target.enabled(level);
                target.log(level, message, None);
                Ok(json!({"logged": logged, "level": level.as_str()}))
            }
            _ => Err(unknown_action_error("logging", action, LOGGING_ACTIONS)),
        }
    }
}

#[async_trait::async_trait]
impl crate::services::tool_executor::ToolHandler for LoggingManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.handle_action(args).await
    }
}
