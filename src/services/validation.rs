use crate::constants::kintone::SKIP_REVISION_CHECK;
use crate::constants::limits::MAX_RECORD_ID;
use crate::errors::ToolError;
use serde_json::Value;

#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        value: &Value,
        label: &str,
        trim: bool,
    ) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(if trim {
            normalized.to_string()
        } else {
            text.to_string()
        })
    }

    pub fn ensure_optional_string(
        &self,
        value: Option<&Value>,
        label: &str,
        trim: bool,
    ) -> Result<Option<String>, ToolError> {
        match value {
            None => Ok(None),
            Some(val) if val.is_null() => Ok(None),
            Some(val) => self.ensure_string(val, label, trim).map(Some),
        }
    }

    /// App and record ids: a positive integer, given as a JSON number or a
    /// string of digits.
    pub fn ensure_id(&self, value: Option<&Value>, label: &str) -> Result<u64, ToolError> {
        let invalid =
            || ToolError::invalid_params(format!("{} must be a positive integer", label));
        let value = value.filter(|v| !v.is_null()).ok_or_else(|| {
            ToolError::invalid_params(format!("{} is required", label))
        })?;
        let numeric = match value {
            Value::Number(n) => n.as_u64().ok_or_else(invalid)?,
            Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        if numeric == 0 || numeric > MAX_RECORD_ID {
            return Err(invalid());
        }
        Ok(numeric)
    }

    /// `None` when absent; `-1` disables the revision check.
    pub fn ensure_revision(&self, value: Option<&Value>) -> Result<Option<i64>, ToolError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let invalid = || {
            ToolError::invalid_params(format!(
                "revision must be a positive integer or {}",
                SKIP_REVISION_CHECK
            ))
        };
        let numeric = match value {
            Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        if numeric == SKIP_REVISION_CHECK || numeric > 0 {
            Ok(Some(numeric))
        } else {
            Err(invalid())
        }
    }

    pub fn ensure_optional_u64(
        &self,
        value: Option<&Value>,
        label: &str,
        max: u64,
    ) -> Result<Option<u64>, ToolError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let numeric = value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
            .ok_or_else(|| {
                ToolError::invalid_params(format!("{} must be a non-negative integer", label))
            })?;
        if numeric > max {
            return Err(ToolError::invalid_params(format!(
                "{} must be at most {}",
                label, max
            )));
        }
        Ok(Some(numeric))
    }

    pub fn ensure_string_list(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<Vec<String>>, ToolError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let items = value.as_array().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be an array of strings", label))
        })?;
        items
            .iter()
            .map(|item| self.ensure_string(item, label, true))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn ensure_object(
        &self,
        value: &Value,
        label: &str,
    ) -> Result<serde_json::Map<String, Value>, ToolError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an object", label)))
    }

    pub fn ensure_optional_object(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<serde_json::Map<String, Value>>, ToolError> {
        match value {
            None => Ok(None),
            Some(val) if val.is_null() => Ok(None),
            Some(val) => self.ensure_object(val, label).map(Some),
        }
    }

    /// A record body must be a non-empty object keyed by field code.
    pub fn ensure_record_object(
        &self,
        value: Option<&Value>,
    ) -> Result<serde_json::Map<String, Value>, ToolError> {
        let value = value
            .filter(|v| !v.is_null())
            .ok_or_else(|| ToolError::invalid_params("record is required"))?;
        let obj = self.ensure_object(value, "record")?;
        if obj.is_empty() {
            return Err(ToolError::invalid_params("record must not be empty"));
        }
        if obj.keys().any(|code| code.trim().is_empty()) {
            return Err(ToolError::invalid_params(
                "record field codes must be non-empty strings",
            ));
        }
        Ok(obj)
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}
